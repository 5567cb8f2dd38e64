use super::segment::{Cycle, DbId, Segment};
use super::store::SegmentStore;
use super::time::TimePoint;
use serde::{Deserialize, Serialize};

/// Authoritative state returned by every confirmed operation. Replaces the
/// client copy wholesale.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimelinePayload {
    pub events: Vec<Segment>,
    #[serde(default)]
    pub cycles: Vec<Cycle>,
    #[serde(default)]
    pub table_html: Option<String>,
    /// Opaque scoring produced by the analysis pipeline.
    #[serde(default)]
    pub respiration_analysis: Option<serde_json::Value>,
}

/// Initial data the server hands over when an analysis is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBootstrap {
    pub db_id: DbId,
    pub duration: TimePoint,
    pub events: Vec<Segment>,
    #[serde(default, alias = "cycle_events")]
    pub cycles: Vec<Cycle>,
    #[serde(default)]
    pub table_html: Option<String>,
    #[serde(default)]
    pub respiration_analysis: Option<serde_json::Value>,
}

/// One analysis session as seen by the client. Lives as long as the editor
/// that owns it; nothing is persisted client-side.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSession {
    pub db_id: DbId,
    pub duration: TimePoint,
    pub store: SegmentStore,
    pub cycles: Vec<Cycle>,
    pub table_html: Option<String>,
    pub respiration_analysis: Option<serde_json::Value>,
}

impl TimelineSession {
    pub fn new(db_id: DbId, duration: TimePoint, events: Vec<Segment>) -> Self {
        Self {
            db_id,
            duration,
            store: SegmentStore::from_segments(events),
            cycles: Vec::new(),
            table_html: None,
            respiration_analysis: None,
        }
    }

    pub fn from_bootstrap(boot: SessionBootstrap) -> Self {
        Self {
            db_id: boot.db_id,
            duration: boot.duration,
            store: SegmentStore::from_segments(boot.events),
            cycles: boot.cycles,
            table_html: boot.table_html,
            respiration_analysis: boot.respiration_analysis,
        }
    }

    /// Segment list plus every derived display, taken from one response.
    pub fn replace_with(&mut self, payload: TimelinePayload) {
        self.store.replace_all(payload.events);
        self.cycles = payload.cycles;
        self.table_html = payload.table_html;
        // Scoring is optional in responses; keep the last one if absent
        if payload.respiration_analysis.is_some() {
            self.respiration_analysis = payload.respiration_analysis;
        }
    }

    /// Segments reaching past the recorded signal length.
    pub fn out_of_bounds(&self) -> Vec<&Segment> {
        self.store
            .iter()
            .filter(|s| s.start < TimePoint::ZERO || s.end > self.duration)
            .collect()
    }
}
