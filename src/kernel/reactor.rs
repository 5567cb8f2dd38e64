use tracing::{debug, info, warn};

use super::event::{Event, InputContent, InputEvent, RequestId};
use super::mutation::{apply_delete, apply_merge, apply_split, EditCommand};
use super::segment::{Segment, SegmentId};
use super::selection::{self, check_mergeable, Validity};
use super::session::{TimelinePayload, TimelineSession};
use super::scheduler::{Notice, Scheduler, SideEffect};
use super::state::{EditorState, StateDelta};
use super::telemetry::event::{LocalRejectionKind, SettleOutcome, TelemetryEvent};
use super::telemetry::recorder::EditTelemetry;
use super::time::{Contiguity, Tick};
use crate::error::{PreconditionError, SyncError};

#[derive(Debug, Clone, Copy, Default)]
pub struct EditorConfig {
    pub contiguity: Contiguity,
}

/// The editing kernel for one timeline session.
pub struct Editor {
    pub state: EditorState,
    pub scheduler: Scheduler,
    pub telemetry: EditTelemetry,
    pub tick: Tick,
}

impl Editor {
    pub fn new(session: TimelineSession, config: EditorConfig) -> Self {
        Self {
            state: EditorState::new(session),
            scheduler: Scheduler { contiguity: config.contiguity },
            telemetry: EditTelemetry::new(),
            tick: Tick::new(),
        }
    }

    /// Pure Step: Advances State. Returns SideEffects to be executed by the driver.
    /// MUST NOT await I/O or timers.
    ///
    /// Responses are folded in before inputs, so a command arriving in the same
    /// step as the response that frees the session is scheduled against the
    /// new timeline.
    pub fn step(&mut self, events: Vec<Event>) -> Vec<SideEffect> {
        self.tick = self.tick.next();
        self.apply(StateDelta::Tick(self.tick));
        let mut effects = Vec::new();

        let mut inputs = Vec::new();
        let mut settled = Vec::new();
        let mut probes = Vec::new();

        for event in events {
            match event {
                Event::Input(inp) => inputs.push(inp),
                Event::Settled { request_id, result } => settled.push((request_id, result)),
                Event::UndoProbed(result) => probes.push(result),
            }
        }

        // === 1. SETTLE ===
        for (request_id, result) in settled {
            self.settle(request_id, result, &mut effects);
        }

        // === 2. UNDO PROBES ===
        for result in probes {
            let available = match result {
                Ok(available) => {
                    self.telemetry.record(TelemetryEvent::UndoProbe { available: Some(available) });
                    available
                }
                Err(e) => {
                    // Only the server knows; without an answer the control stays off
                    warn!("Undo availability probe failed: {}", e);
                    self.telemetry.record(TelemetryEvent::UndoProbe { available: None });
                    false
                }
            };
            self.apply(StateDelta::UndoAvailability(available));
            effects.push(SideEffect::Notify(Notice::UndoAvailability(available)));
        }

        // === 3. INPUTS ===
        for input in inputs {
            self.handle_input(input, &mut effects);
        }

        effects
    }

    fn settle(
        &mut self,
        request_id: RequestId,
        result: Result<TimelinePayload, SyncError>,
        effects: &mut Vec<SideEffect>,
    ) {
        let pending = match self.state.pending() {
            Some(p) if p.request_id == request_id => *p,
            _ => {
                info!("Discarded stale response for request {}", request_id);
                self.telemetry.record(TelemetryEvent::StaleResponse);
                return;
            }
        };
        let latency_ticks = self.tick.since(pending.issued_at);

        match result {
            Ok(payload) => {
                let count = payload.events.len();
                self.apply(StateDelta::ResponseApplied(payload));

                let violations = self.state.session.store.check_invariants(&self.scheduler.contiguity);
                if !violations.is_empty() {
                    warn!("Server timeline has {} invariant violations: {:?}", violations.len(), violations);
                }
                let outside = self.state.session.out_of_bounds().len();
                if outside > 0 {
                    warn!("{} segments reach past the recording ({})", outside, self.state.session.duration);
                }

                info!("{} applied, timeline now has {} segments", pending.op, count);
                self.telemetry.record(TelemetryEvent::RequestSettled {
                    op: pending.op,
                    outcome: SettleOutcome::Applied,
                    latency_ticks,
                });
                effects.push(SideEffect::Notify(Notice::Applied { op: pending.op, segments: count }));
            }
            Err(err) => {
                warn!("{} rejected: {}", pending.op, err);
                self.telemetry.record(TelemetryEvent::RequestSettled {
                    op: pending.op,
                    outcome: SettleOutcome::Rejected(err.cause()),
                    latency_ticks,
                });
                effects.push(SideEffect::Notify(Notice::Rejected {
                    op: pending.op,
                    cause: err.cause(),
                    message: err.user_message(),
                }));
                self.apply(StateDelta::RequestRejected(err));
            }
        }

        self.apply(StateDelta::Settled);
        effects.push(SideEffect::ProbeUndo { db_id: self.state.session.db_id });
    }

    fn handle_input(&mut self, input: InputEvent, effects: &mut Vec<SideEffect>) {
        match input.content {
            InputContent::Selection(event) => {
                let next = selection::reduce(self.state.selection(), &self.state.session.store, event);
                if &next == self.state.selection() {
                    return;
                }
                debug!("Selection from {}: {:?}", input.source, next.selected);
                let selected = next.len();
                self.apply(StateDelta::SelectionReplaced(next));
                self.telemetry.record(TelemetryEvent::SelectionChanged { size: selected });
                effects.push(SideEffect::Notify(Notice::SelectionChanged {
                    selected,
                    validity: self.validity(),
                }));
            }
            InputContent::Command(command) => {
                let (delta, effect) = self.scheduler.schedule(command, &self.state, self.tick);
                if let Some(delta) = delta {
                    self.apply(delta);
                }
                if let Some(effect) = effect {
                    self.record_schedule(&effect);
                    effects.push(effect);
                }
            }
        }
    }

    fn record_schedule(&mut self, effect: &SideEffect) {
        let event = match effect {
            SideEffect::Dispatch { request, request_id } => {
                info!("Dispatching {} ({}) for db_id {}", request.kind(), request_id, request.db_id());
                TelemetryEvent::RequestIssued { op: request.kind(), tick: self.tick }
            }
            SideEffect::Notify(Notice::PreconditionFailed { op, error }) => {
                info!("{} refused locally: {}", op, error);
                TelemetryEvent::LocalRejection { op: *op, reason: LocalRejectionKind::Precondition }
            }
            SideEffect::Notify(Notice::Busy { op }) => {
                info!("{} refused: a request is still pending", op);
                TelemetryEvent::LocalRejection { op: *op, reason: LocalRejectionKind::Busy }
            }
            SideEffect::Notify(Notice::UndoUnavailable) => TelemetryEvent::LocalRejection {
                op: super::mutation::OperationKind::Undo,
                reason: LocalRejectionKind::UndoUnavailable,
            },
            SideEffect::Notify(Notice::ConfirmationRequired { op }) => {
                TelemetryEvent::LocalRejection { op: *op, reason: LocalRejectionKind::NeedsConfirmation }
            }
            _ => return,
        };
        self.telemetry.record(event);
    }

    /// Reduces and records phase transitions.
    fn apply(&mut self, delta: StateDelta) {
        let before = self.state.phase();
        self.state.reduce(delta);
        let after = self.state.phase();
        if before != after {
            debug!("Sync phase {:?} -> {:?}", before, after);
            self.telemetry.record(TelemetryEvent::PhaseTransition { from: before, to: after, tick: self.tick });
        }
    }

    pub fn validity(&self) -> Validity {
        self.state
            .selection()
            .validity(&self.state.session.store, &self.scheduler.contiguity)
    }

    /// Locally computed outcome of `command`, for display before the server
    /// confirms. Ids of new segments are provisional. `None` for commands
    /// whose result only the server can produce (recalculate, undo).
    pub fn preview(&self, command: EditCommand) -> Result<Option<Vec<Segment>>, PreconditionError> {
        let store = &self.state.session.store;
        let selection = self.state.selection();
        let segments = store.as_slice();
        let next_id = store.max_id().map_or(1, |id| id.0 + 1);

        match command {
            EditCommand::Delete => {
                if selection.is_empty() {
                    return Err(PreconditionError::EmptySelection);
                }
                apply_delete(segments, &selection.ids()).map(Some)
            }
            EditCommand::Merge => {
                let run: Vec<SegmentId> = check_mergeable(selection, store, &self.scheduler.contiguity)?
                    .iter()
                    .map(|s| s.id)
                    .collect();
                apply_merge(segments, &run, SegmentId(next_id), &self.scheduler.contiguity).map(Some)
            }
            EditCommand::Split { split_time } => {
                if selection.len() != 1 {
                    return Err(PreconditionError::SplitNeedsSingle { selected: selection.len() });
                }
                apply_split(
                    segments,
                    selection.ids()[0],
                    split_time,
                    (SegmentId(next_id), SegmentId(next_id + 1)),
                    &self.scheduler.contiguity,
                )
                .map(Some)
            }
            EditCommand::Recalculate { .. } | EditCommand::Undo => Ok(None),
        }
    }
}
