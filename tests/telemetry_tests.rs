use breathline::error::SyncError;
use breathline::kernel::event::{Event, InputEvent};
use breathline::kernel::mutation::EditCommand;
use breathline::kernel::reactor::{Editor, EditorConfig};
use breathline::kernel::scheduler::SideEffect;
use breathline::kernel::segment::{DbId, PhaseType::*, Segment};
use breathline::kernel::selection::ClickMode;
use breathline::kernel::session::{TimelinePayload, TimelineSession};
use breathline::kernel::telemetry::event::TelemetryEvent;
use breathline::kernel::time::TimePoint;

fn editor() -> Editor {
    Editor::new(
        TimelineSession::new(
            DbId(1),
            TimePoint::from_units(30.0),
            vec![Segment::new(1, 0.0, 10.0, Inhalation), Segment::new(2, 11.0, 20.0, Exhalation)],
        ),
        EditorConfig::default(),
    )
}

#[tokio::test]
async fn test_settle_latency_in_ticks() {
    let mut editor = editor();
    editor.step(vec![InputEvent::click("test", 1, ClickMode::Toggle).into()]);
    let effects = editor.step(vec![InputEvent::command("test", EditCommand::Delete).into()]);
    let request_id = match &effects[..] {
        [SideEffect::Dispatch { request_id, .. }] => *request_id,
        other => panic!("expected dispatch, got {:?}", other),
    };

    // Two idle ticks while the request is out
    editor.step(vec![]);
    editor.step(vec![]);
    editor.step(vec![Event::Settled {
        request_id,
        result: Ok(TimelinePayload { events: vec![Segment::new(2, 11.0, 20.0, Inhalation)], ..Default::default() }),
    }]);

    let snapshot = editor.telemetry.snapshot();
    assert_eq!(snapshot.request_stats.issued, 1);
    assert_eq!(snapshot.request_stats.applied, 1);
    assert_eq!(snapshot.request_stats.avg_latency_ticks, 3.0, "Issued at tick 2, settled at tick 5");
    assert_eq!(snapshot.selection_changes, 1);
}

#[tokio::test]
async fn test_local_refusals_are_counted() {
    let mut editor = editor();
    editor.step(vec![
        InputEvent::command("test", EditCommand::Delete).into(),
        InputEvent::command("test", EditCommand::Merge).into(),
        InputEvent::command("test", EditCommand::Undo).into(),
        InputEvent::command("test", EditCommand::Recalculate { apnea_threshold: None, confirmed: false }).into(),
    ]);
    editor.step(vec![Event::UndoProbed(Err(SyncError::Timeout(10)))]);

    let snapshot = editor.telemetry.snapshot();
    assert_eq!(snapshot.local_stats.preconditions, 2);
    assert_eq!(snapshot.local_stats.undo_unavailable, 1);
    assert_eq!(snapshot.local_stats.confirmations_requested, 1);
    assert_eq!(snapshot.request_stats.issued, 0);
    assert_eq!(snapshot.undo_stats.failed, 1);
    assert!(editor.telemetry.transitions().is_empty(), "Nothing left Idle");

    let probes = editor
        .telemetry
        .events()
        .filter(|e| matches!(e, TelemetryEvent::UndoProbe { .. }))
        .count();
    assert_eq!(probes, 1);
}
