use std::collections::VecDeque;
use super::event::{LocalRejectionKind, SettleOutcome, TelemetryEvent};
use crate::error::FailureCause;

#[derive(Debug, Clone, Default)]
pub struct EditStats {
    pub request_stats: RequestStats,
    pub local_stats: LocalStats,
    pub undo_stats: UndoStats,
    pub stale_responses: u64,
    pub selection_changes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct RequestStats {
    pub issued: u64,
    pub applied: u64,
    pub rejected: u64,
    pub transport_failures: u64,
    pub timeouts: u64,
    pub server_failures: u64,
    pub total_latency_ticks: u64,
    pub avg_latency_ticks: f64,
}

#[derive(Debug, Clone, Default)]
pub struct LocalStats {
    pub preconditions: u64,
    pub busy: u64,
    pub undo_unavailable: u64,
    pub confirmations_requested: u64,
}

#[derive(Debug, Clone, Default)]
pub struct UndoStats {
    pub probes: u64,
    pub available: u64,
    pub unavailable: u64,
    pub failed: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> EditStats {
    let mut snap = EditStats::default();
    let mut settled = 0u64;

    for event in events {
        match event {
            TelemetryEvent::RequestIssued { .. } => snap.request_stats.issued += 1,
            TelemetryEvent::RequestSettled { outcome, latency_ticks, .. } => {
                settled += 1;
                snap.request_stats.total_latency_ticks += latency_ticks;
                match outcome {
                    SettleOutcome::Applied => snap.request_stats.applied += 1,
                    SettleOutcome::Rejected(cause) => {
                        snap.request_stats.rejected += 1;
                        match cause {
                            FailureCause::Transport => snap.request_stats.transport_failures += 1,
                            FailureCause::Timeout => snap.request_stats.timeouts += 1,
                            FailureCause::Server => snap.request_stats.server_failures += 1,
                            FailureCause::Precondition => {} // Never sent, never settled
                        }
                    }
                }
            }
            TelemetryEvent::LocalRejection { reason, .. } => match reason {
                LocalRejectionKind::Precondition => snap.local_stats.preconditions += 1,
                LocalRejectionKind::Busy => snap.local_stats.busy += 1,
                LocalRejectionKind::UndoUnavailable => snap.local_stats.undo_unavailable += 1,
                LocalRejectionKind::NeedsConfirmation => snap.local_stats.confirmations_requested += 1,
            },
            TelemetryEvent::UndoProbe { available } => {
                snap.undo_stats.probes += 1;
                match available {
                    Some(true) => snap.undo_stats.available += 1,
                    Some(false) => snap.undo_stats.unavailable += 1,
                    None => snap.undo_stats.failed += 1,
                }
            }
            TelemetryEvent::StaleResponse => snap.stale_responses += 1,
            TelemetryEvent::SelectionChanged { .. } => snap.selection_changes += 1,
            TelemetryEvent::PhaseTransition { .. } => {}
        }
    }

    if settled > 0 {
        snap.request_stats.avg_latency_ticks = snap.request_stats.total_latency_ticks as f64 / settled as f64;
    }

    snap
}
