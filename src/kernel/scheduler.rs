use super::event::RequestId;
use super::mutation::{
    plan_delete, plan_merge, plan_recalculate, plan_split, EditCommand, MutationRequest, OperationKind,
};
use super::segment::DbId;
use super::selection::Validity;
use super::state::{EditorState, PendingRequest, StateDelta, SyncPhase};
use super::time::{Contiguity, Tick};
use crate::error::{FailureCause, PreconditionError};

/// What the driver must do after a step. The kernel never performs I/O itself.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    Dispatch { request_id: RequestId, request: MutationRequest },
    ProbeUndo { db_id: DbId },
    Notify(Notice),
}

/// User-facing outcome of an interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    SelectionChanged { selected: usize, validity: Validity },
    Applied { op: OperationKind, segments: usize },
    Rejected { op: OperationKind, cause: FailureCause, message: String },
    PreconditionFailed { op: OperationKind, error: PreconditionError },
    /// Another request is still outstanding.
    Busy { op: OperationKind },
    UndoUnavailable,
    ConfirmationRequired { op: OperationKind },
    UndoAvailability(bool),
}

pub struct Scheduler {
    pub contiguity: Contiguity,
}

impl Scheduler {
    /// Pure Projection: Command + State -> (StateDelta, SideEffect)
    pub fn schedule(
        &self,
        command: EditCommand,
        state: &EditorState,
        tick: Tick,
    ) -> (Option<StateDelta>, Option<SideEffect>) {
        let op = command.kind();

        if state.phase() != SyncPhase::Idle {
            return (None, Some(SideEffect::Notify(Notice::Busy { op })));
        }

        let db_id = state.session.db_id;
        let store = &state.session.store;
        let selection = state.selection();

        let planned = match command {
            EditCommand::Delete => plan_delete(db_id, selection, store),
            EditCommand::Merge => plan_merge(db_id, selection, store, &self.contiguity),
            EditCommand::Split { split_time } => plan_split(db_id, selection, store, split_time),
            EditCommand::Recalculate { confirmed: false, .. } => {
                return (None, Some(SideEffect::Notify(Notice::ConfirmationRequired { op })));
            }
            EditCommand::Recalculate { apnea_threshold, confirmed: true } => {
                plan_recalculate(db_id, apnea_threshold)
            }
            EditCommand::Undo => {
                if !state.undo_available {
                    return (None, Some(SideEffect::Notify(Notice::UndoUnavailable)));
                }
                Ok(MutationRequest::Undo { db_id })
            }
        };

        match planned {
            Ok(request) => {
                let request_id = RequestId::new();
                let pending = PendingRequest { request_id, op, issued_at: tick };
                (
                    Some(StateDelta::RequestIssued(pending)),
                    Some(SideEffect::Dispatch { request_id, request }),
                )
            }
            Err(error) => (None, Some(SideEffect::Notify(Notice::PreconditionFailed { op, error }))),
        }
    }
}
