use super::event::RequestId;
use super::mutation::OperationKind;
use super::selection::SelectionState;
use super::session::{TimelinePayload, TimelineSession};
use super::time::Tick;
use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Request lifecycle: `Idle -> Pending -> {Applied | Rejected} -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncPhase {
    Idle,
    Pending,
    Applied,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest {
    pub request_id: RequestId,
    pub op: OperationKind,
    pub issued_at: Tick,
}

/// Strict state delta. This is the ONLY way editor state mutates.
#[derive(Debug, Clone)]
pub enum StateDelta {
    SelectionReplaced(SelectionState),
    RequestIssued(PendingRequest),
    ResponseApplied(TimelinePayload),
    RequestRejected(SyncError),
    /// Applied/Rejected fall back to Idle.
    Settled,
    UndoAvailability(bool),
    Tick(Tick),
}

#[derive(Debug, Clone)]
pub struct EditorState {
    pub session: TimelineSession,
    selection: SelectionState,
    phase: SyncPhase,
    pending: Option<PendingRequest>,
    /// Last answer of the availability probe. Starts false until asked.
    pub undo_available: bool,
    pub last_error: Option<SyncError>,
    // Monotonic version, bumped on every reduction
    pub version: u64,
    pub last_tick: Tick,
}

impl EditorState {
    pub fn new(session: TimelineSession) -> Self {
        Self {
            session,
            selection: SelectionState::default(),
            phase: SyncPhase::Idle,
            pending: None,
            undo_available: false,
            last_error: None,
            version: 0,
            last_tick: Tick::new(),
        }
    }

    /// Pure reduction: State + Delta -> Mutated State
    pub fn reduce(&mut self, delta: StateDelta) {
        self.version += 1;

        match delta {
            StateDelta::Tick(t) => {
                self.last_tick = t;
            }
            StateDelta::SelectionReplaced(selection) => {
                self.selection = selection;
            }
            StateDelta::RequestIssued(request) => {
                if self.phase != SyncPhase::Idle {
                    warn!("Request {} issued while {:?}; ignored", request.request_id, self.phase);
                    return;
                }
                self.phase = SyncPhase::Pending;
                self.pending = Some(request);
                self.last_error = None;
            }
            StateDelta::ResponseApplied(payload) => {
                if self.phase != SyncPhase::Pending {
                    warn!("Response applied while {:?}; ignored", self.phase);
                    return;
                }
                self.session.replace_with(payload);
                self.selection = SelectionState::default();
                self.pending = None;
                self.phase = SyncPhase::Applied;
            }
            StateDelta::RequestRejected(err) => {
                if self.phase != SyncPhase::Pending {
                    warn!("Rejection while {:?}; ignored", self.phase);
                    return;
                }
                self.last_error = Some(err);
                self.pending = None;
                self.phase = SyncPhase::Rejected;
            }
            StateDelta::Settled => {
                if matches!(self.phase, SyncPhase::Applied | SyncPhase::Rejected) {
                    self.phase = SyncPhase::Idle;
                }
                // Stays off until the server answers the follow-up check
                self.undo_available = false;
            }
            StateDelta::UndoAvailability(available) => {
                debug!("Undo availability: {}", available);
                self.undo_available = available;
            }
        }
    }

    // Read-only accessors
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn is_idle(&self) -> bool {
        self.phase == SyncPhase::Idle
    }
}
