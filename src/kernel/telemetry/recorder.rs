use std::collections::VecDeque;
use super::event::TelemetryEvent;
use super::metrics::{compute_snapshot, EditStats};
use crate::kernel::state::SyncPhase;

const MAX_EVENTS: usize = 10_000;

#[derive(Debug)]
pub struct EditTelemetry {
    buffer: VecDeque<TelemetryEvent>,
}

impl Default for EditTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl EditTelemetry {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(MAX_EVENTS),
        }
    }

    pub fn record(&mut self, event: TelemetryEvent) {
        if self.buffer.len() >= MAX_EVENTS {
            self.buffer.pop_front();
        }
        self.buffer.push_back(event);
    }

    pub fn snapshot(&self) -> EditStats {
        // Delegate to pure functional metrics module
        compute_snapshot(&self.buffer)
    }

    /// Phase transitions in the order they happened.
    pub fn transitions(&self) -> Vec<(SyncPhase, SyncPhase)> {
        self.buffer
            .iter()
            .filter_map(|e| match e {
                TelemetryEvent::PhaseTransition { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    pub fn events(&self) -> impl Iterator<Item = &TelemetryEvent> {
        self.buffer.iter()
    }
}
