use breathline::kernel::event::{Event, InputEvent};
use breathline::kernel::mutation::{apply_delete, EditCommand, MutationRequest};
use breathline::kernel::reactor::{Editor, EditorConfig};
use breathline::kernel::scheduler::{Notice, SideEffect};
use breathline::kernel::segment::{DbId, PhaseType, PhaseType::*, Segment, SegmentId};
use breathline::kernel::selection::ClickMode;
use breathline::kernel::session::{TimelinePayload, TimelineSession};
use breathline::kernel::state::SyncPhase;
use breathline::kernel::time::{Contiguity, TimePoint};
use breathline::server::{FixedSegmentation, LocalTimeline};
use breathline::services::driver::EditorDriver;
use std::time::Duration;

fn editor_with(segments: Vec<Segment>) -> Editor {
    let session = TimelineSession::new(DbId(7), TimePoint::from_units(60.0), segments);
    Editor::new(session, EditorConfig::default())
}

fn click(id: u64) -> Event {
    InputEvent::click("test", id, ClickMode::Toggle).into()
}

fn range(id: u64) -> Event {
    InputEvent::click("test", id, ClickMode::Range).into()
}

fn command(cmd: EditCommand) -> Event {
    InputEvent::command("test", cmd).into()
}

fn phases(editor: &Editor) -> Vec<(u64, PhaseType)> {
    editor.state.session.store.iter().map(|s| (s.id.0, s.phase)).collect()
}

#[tokio::test]
async fn test_scenario_delete_relabels_after_apnea() {
    let segments = vec![
        Segment::new(1, 0.0, 10.0, Inhalation),
        Segment::new(2, 11.0, 20.0, Exhalation),
        Segment::new(3, 21.0, 25.0, Apnea),
        Segment::new(4, 26.0, 35.0, Inhalation),
    ];
    let mut editor = editor_with(segments.clone());

    editor.step(vec![click(2)]);
    let effects = editor.step(vec![command(EditCommand::Delete)]);

    let (request_id, request) = match &effects[..] {
        [SideEffect::Dispatch { request_id, request }] => (*request_id, request.clone()),
        other => panic!("expected a single dispatch, got {:?}", other),
    };
    assert_eq!(request, MutationRequest::Delete { db_id: DbId(7), segment_ids: vec![SegmentId(2)] });
    assert_eq!(editor.state.phase(), SyncPhase::Pending);

    // Server side of the exchange
    let events = apply_delete(&segments, &[SegmentId(2)]).unwrap();
    let effects = editor.step(vec![Event::Settled {
        request_id,
        result: Ok(TimelinePayload { events, ..Default::default() }),
    }]);

    assert_eq!(phases(&editor), vec![(1, Inhalation), (3, Apnea), (4, Exhalation)]);
    assert!(editor.state.selection().is_empty(), "Selection must clear after a confirmed edit");
    assert!(editor.state.is_idle());
    assert!(effects.contains(&SideEffect::Notify(Notice::Applied {
        op: breathline::kernel::mutation::OperationKind::Delete,
        segments: 3
    })));
    assert!(effects.contains(&SideEffect::ProbeUndo { db_id: DbId(7) }));

    println!("Scenario 1 Passed: delete relabels past apnea");
}

#[tokio::test]
async fn test_scenario_merge_gets_fresh_id() {
    let mirror = LocalTimeline::new(Contiguity::default());
    let boot = mirror
        .open_session(
            TimePoint::from_units(30.0),
            FixedSegmentation::new(vec![
                Segment::new(1, 0.0, 10.0, Inhalation),
                Segment::new(2, 11.0, 20.0, Inhalation),
            ]),
        )
        .unwrap();

    let editor = Editor::new(TimelineSession::from_bootstrap(boot), EditorConfig::default());
    let mut driver = EditorDriver::new(editor, mirror, Duration::from_secs(1));

    driver.handle(InputEvent::click("test", 1, ClickMode::Toggle)).await;
    let notices = driver.handle(InputEvent::click("test", 2, ClickMode::Toggle)).await;
    match notices.last() {
        Some(Notice::SelectionChanged { selected: 2, validity }) => {
            assert!(validity.mergeable, "Two contiguous inhalations must be mergeable");
            assert!(validity.deletable);
            assert!(!validity.splittable);
        }
        other => panic!("unexpected notice {:?}", other),
    }

    let preview = driver.editor.preview(EditCommand::Merge).unwrap().unwrap();
    assert_eq!(preview.len(), 1);

    driver.handle(InputEvent::command("test", EditCommand::Merge)).await;

    let store = &driver.editor.state.session.store;
    assert_eq!(store.len(), 1);
    let merged = store.get(0).unwrap();
    assert_eq!(merged.start, TimePoint::from_units(0.0));
    assert_eq!(merged.end, TimePoint::from_units(20.0));
    assert_eq!(merged.phase, Inhalation);
    assert!(merged.id > SegmentId(2), "Merged id must be fresh, got {}", merged.id);
    assert!(driver.editor.state.undo_available);

    println!("Scenario 2 Passed: merge collapses the run");
}

#[tokio::test]
async fn test_scenario_split_bounds() {
    let mut editor = editor_with(vec![Segment::new(1, 0.0, 10.0, Inhalation)]);
    editor.step(vec![click(1)]);

    let effects = editor.step(vec![command(EditCommand::Split { split_time: TimePoint::from_units(15.0) })]);
    assert!(
        matches!(&effects[..], [SideEffect::Notify(Notice::PreconditionFailed { .. })]),
        "Split outside the segment must be refused locally: {:?}",
        effects
    );
    assert!(editor.state.is_idle(), "No request may be issued");

    let effects = editor.step(vec![command(EditCommand::Split { split_time: TimePoint::from_units(5.0) })]);
    let request = match &effects[..] {
        [SideEffect::Dispatch { request, .. }] => request.clone(),
        other => panic!("expected dispatch, got {:?}", other),
    };
    assert_eq!(
        serde_json::to_value(&request).unwrap(),
        serde_json::json!({"db_id": 7, "segment_id": 1, "split_time": 5})
    );

    println!("Scenario 3 Passed: split validated locally");
}

#[tokio::test]
async fn test_scenario_range_click_twice_cancels() {
    let mut editor = editor_with(vec![
        Segment::new(1, 0.0, 10.0, Inhalation),
        Segment::new(2, 11.0, 20.0, Exhalation),
    ]);

    editor.step(vec![range(1)]);
    assert_eq!(editor.state.selection().range_anchor, Some(SegmentId(1)));
    assert_eq!(editor.state.selection().len(), 1);

    editor.step(vec![range(1)]);
    assert!(editor.state.selection().is_empty());
    assert_eq!(editor.state.selection().range_anchor, None);

    println!("Scenario 4 Passed: range cancel");
}

#[tokio::test]
async fn test_range_selects_inclusive_span() {
    let mut editor = editor_with(vec![
        Segment::new(1, 0.0, 10.0, Inhalation),
        Segment::new(2, 11.0, 20.0, Exhalation),
        Segment::new(3, 21.0, 25.0, Apnea),
        Segment::new(4, 26.0, 35.0, Inhalation),
    ]);

    editor.step(vec![range(4), range(2)]);
    let ids: Vec<u64> = editor.state.selection().ids().iter().map(|id| id.0).collect();
    assert_eq!(ids, vec![2, 3, 4]);
    assert_eq!(editor.state.selection().range_anchor, None);

    // Unknown ids leave the selection alone
    editor.step(vec![click(99)]);
    assert_eq!(editor.state.selection().len(), 3);

    editor.step(vec![InputEvent::clear("test").into()]);
    assert!(editor.state.selection().is_empty());
}
