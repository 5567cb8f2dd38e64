use serde::{Deserialize, Serialize};
use crate::error::FailureCause;
use crate::kernel::mutation::OperationKind;
use crate::kernel::state::SyncPhase;
use crate::kernel::time::Tick;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TelemetryEvent {
    PhaseTransition {
        from: SyncPhase,
        to: SyncPhase,
        tick: Tick,
    },

    RequestIssued {
        op: OperationKind,
        tick: Tick,
    },

    RequestSettled {
        op: OperationKind,
        outcome: SettleOutcome,
        latency_ticks: u64, // Steps between dispatch and response
    },

    /// Refused before anything was sent.
    LocalRejection {
        op: OperationKind,
        reason: LocalRejectionKind,
    },

    /// `None` when the probe itself failed.
    UndoProbe {
        available: Option<bool>,
    },

    StaleResponse,

    SelectionChanged {
        size: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettleOutcome {
    Applied,
    Rejected(FailureCause),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalRejectionKind {
    Precondition,
    Busy,
    UndoUnavailable,
    NeedsConfirmation,
}
