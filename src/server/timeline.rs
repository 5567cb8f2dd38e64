use super::analysis::{build_cycles, cycle_table_html, summarize};
use super::archive::{ArchiveError, ArchivedTimeline, TimelineArchive};
use super::segmenter::{FixedSegmentation, Segmenter};
use crate::error::{PreconditionError, SyncError};
use crate::kernel::mutation::{apply_delete, apply_merge, apply_split, MutationRequest};
use crate::kernel::segment::{DbId, Segment, SegmentId};
use crate::kernel::session::{SessionBootstrap, TimelinePayload};
use crate::kernel::time::{Contiguity, TimePoint};
use crate::services::api::TimelineApi;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

struct TimelineRecord {
    duration: TimePoint,
    events: Vec<Segment>,
    /// First output of the segmenter; reseeds recalculation after a restore.
    initial_events: Vec<Segment>,
    next_id: u64,
    /// Single level: the list as it was before the last confirmed edit.
    undo_snapshot: Option<Vec<Segment>>,
    segmenter: Box<dyn Segmenter>,
}

impl TimelineRecord {
    fn take_ids(&mut self, count: u64) -> u64 {
        let first = self.next_id;
        self.next_id += count;
        first
    }

    fn fresh_segmentation(&mut self, apnea_threshold: Option<f64>) -> Vec<Segment> {
        let mut segments = self.segmenter.segment(self.duration, apnea_threshold);
        segments.sort_by_key(|s| (s.start, s.id));
        let first = self.take_ids(segments.len() as u64);
        for (offset, seg) in segments.iter_mut().enumerate() {
            seg.id = SegmentId(first + offset as u64);
        }
        segments
    }
}

#[derive(Default)]
struct Registry {
    sessions: HashMap<DbId, TimelineRecord>,
    last_db_id: u64,
}

/// In-process authoritative timeline. Answers the same requests the analysis
/// server does, with the same validation and a one-level undo per session.
pub struct LocalTimeline {
    registry: Mutex<Registry>,
    contiguity: Contiguity,
    archive: Option<Box<dyn TimelineArchive>>,
}

impl LocalTimeline {
    pub fn new(contiguity: Contiguity) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            contiguity,
            archive: None,
        }
    }

    /// Writes every session to `archive` after each confirmed change.
    pub fn with_archive(mut self, archive: impl TimelineArchive + 'static) -> Self {
        self.archive = Some(Box::new(archive));
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Registry>, SyncError> {
        self.registry
            .lock()
            .map_err(|_| SyncError::Server("The timeline store is unavailable".to_string()))
    }

    /// Runs the segmenter over a new recording and registers the result
    /// under the next db_id.
    pub fn open_session(
        &self,
        duration: TimePoint,
        segmenter: impl Segmenter + 'static,
    ) -> Result<SessionBootstrap, SyncError> {
        let mut registry = self.lock()?;
        registry.last_db_id += 1;
        let db_id = DbId(registry.last_db_id);

        let mut record = TimelineRecord {
            duration,
            events: Vec::new(),
            initial_events: Vec::new(),
            next_id: 1,
            undo_snapshot: None,
            segmenter: Box::new(segmenter),
        };
        record.events = record.fresh_segmentation(None);
        record.initial_events = record.events.clone();
        info!("Opened session {} with {} segments", db_id, record.events.len());

        self.persist(db_id, &record);
        let bootstrap = bootstrap_for(db_id, &record);
        registry.sessions.insert(db_id, record);
        Ok(bootstrap)
    }

    /// Brings an archived session back. Recalculation reruns over the
    /// archived initial segmentation, or the current list for archives
    /// written without one.
    pub fn restore(&self, db_id: DbId) -> Result<SessionBootstrap, ArchiveError> {
        let archive = self.archive.as_ref().ok_or(ArchiveError::NotFound(db_id))?;
        let stored = archive.load(db_id)?;

        let initial = if stored.initial_events.is_empty() {
            stored.events.clone()
        } else {
            stored.initial_events
        };
        let record = TimelineRecord {
            duration: stored.duration,
            segmenter: Box::new(FixedSegmentation::new(initial.clone())),
            initial_events: initial,
            events: stored.events,
            next_id: stored.next_id,
            undo_snapshot: stored.undo_snapshot,
        };
        let bootstrap = bootstrap_for(db_id, &record);

        let mut registry = self
            .registry
            .lock()
            .map_err(|_| ArchiveError::Io(std::io::Error::other("timeline store lock poisoned")))?;
        registry.last_db_id = registry.last_db_id.max(db_id.0);
        registry.sessions.insert(db_id, record);
        info!("Restored session {} from archive", db_id);
        Ok(bootstrap)
    }

    /// Current authoritative state of a session.
    pub fn current(&self, db_id: DbId) -> Option<TimelinePayload> {
        let registry = self.lock().ok()?;
        registry.sessions.get(&db_id).map(payload_for)
    }

    fn persist(&self, db_id: DbId, record: &TimelineRecord) {
        let Some(archive) = &self.archive else {
            return;
        };
        let stored = ArchivedTimeline {
            db_id,
            duration: record.duration,
            next_id: record.next_id,
            events: record.events.clone(),
            initial_events: record.initial_events.clone(),
            undo_snapshot: record.undo_snapshot.clone(),
        };
        if let Err(e) = archive.save(&stored) {
            warn!("Failed to archive session {}: {}", db_id, e);
        }
    }

    fn apply(&self, record: &mut TimelineRecord, request: &MutationRequest) -> Result<(), SyncError> {
        let next = match request {
            MutationRequest::Delete { segment_ids, .. } => {
                apply_delete(&record.events, segment_ids).map_err(reject)?
            }
            MutationRequest::Merge { segment_ids, .. } => {
                let merged = apply_merge(
                    &record.events,
                    segment_ids,
                    SegmentId(record.next_id),
                    &self.contiguity,
                )
                .map_err(reject)?;
                record.take_ids(1);
                merged
            }
            MutationRequest::Split { segment_id, split_time, .. } => {
                let ids = (SegmentId(record.next_id), SegmentId(record.next_id + 1));
                let split = apply_split(&record.events, *segment_id, *split_time, ids, &self.contiguity)
                    .map_err(reject)?;
                record.take_ids(2);
                split
            }
            MutationRequest::Recalculate { apnea_threshold, .. } => {
                if let Some(t) = apnea_threshold {
                    if !t.is_finite() || *t <= 0.0 {
                        return Err(reject(PreconditionError::InvalidThreshold(*t)));
                    }
                }
                record.events = record.fresh_segmentation(*apnea_threshold);
                // Recalculation starts a new history
                record.undo_snapshot = None;
                return Ok(());
            }
            MutationRequest::Undo { .. } => {
                let previous = record
                    .undo_snapshot
                    .take()
                    .ok_or_else(|| SyncError::Server("Nothing to undo".to_string()))?;
                record.events = previous;
                return Ok(());
            }
        };

        record.undo_snapshot = Some(std::mem::replace(&mut record.events, next));
        Ok(())
    }
}

impl TimelineApi for LocalTimeline {
    async fn mutate(&self, request: &MutationRequest) -> Result<TimelinePayload, SyncError> {
        let db_id = request.db_id();
        let mut registry = self.lock()?;
        let record = registry
            .sessions
            .get_mut(&db_id)
            .ok_or_else(|| SyncError::Server(format!("No analysis found for db_id {}", db_id)))?;

        if let Err(e) = self.apply(record, request) {
            debug!("{} on session {} refused: {}", request.kind(), db_id, e);
            return Err(e);
        }

        self.persist(db_id, record);
        Ok(payload_for(record))
    }

    async fn undo_available(&self, db_id: DbId) -> Result<bool, SyncError> {
        let registry = self.lock()?;
        registry
            .sessions
            .get(&db_id)
            .map(|record| record.undo_snapshot.is_some())
            .ok_or_else(|| SyncError::Server(format!("No analysis found for db_id {}", db_id)))
    }
}

fn reject(err: PreconditionError) -> SyncError {
    SyncError::Server(err.to_string())
}

fn payload_for(record: &TimelineRecord) -> TimelinePayload {
    let summary = summarize(&record.events, record.duration);
    TimelinePayload {
        events: record.events.clone(),
        cycles: build_cycles(&record.events),
        table_html: Some(cycle_table_html(&record.events)),
        respiration_analysis: serde_json::to_value(summary).ok(),
    }
}

fn bootstrap_for(db_id: DbId, record: &TimelineRecord) -> SessionBootstrap {
    let payload = payload_for(record);
    SessionBootstrap {
        db_id,
        duration: record.duration,
        events: payload.events,
        cycles: payload.cycles,
        table_html: payload.table_html,
        respiration_analysis: payload.respiration_analysis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::segment::PhaseType::*;

    fn mirror() -> (LocalTimeline, DbId) {
        let timeline = LocalTimeline::new(Contiguity::default());
        let boot = timeline
            .open_session(
                TimePoint::from_units(60.0),
                FixedSegmentation::new(vec![
                    Segment::new(0, 0.0, 10.0, Inhalation),
                    Segment::new(0, 11.0, 20.0, Exhalation),
                    Segment::new(0, 21.0, 25.0, Apnea),
                    Segment::new(0, 26.0, 35.0, Inhalation),
                ]),
            )
            .unwrap();
        (timeline, boot.db_id)
    }

    #[tokio::test]
    async fn ids_are_assigned_on_open() {
        let (timeline, db_id) = mirror();
        let ids: Vec<u64> = timeline.current(db_id).unwrap().events.iter().map(|s| s.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(db_id, DbId(1));
    }

    #[tokio::test]
    async fn undo_is_single_level() {
        let (timeline, db_id) = mirror();
        assert!(!timeline.undo_available(db_id).await.unwrap());

        timeline
            .mutate(&MutationRequest::Delete { db_id, segment_ids: vec![SegmentId(2)] })
            .await
            .unwrap();
        assert!(timeline.undo_available(db_id).await.unwrap());

        let restored = timeline.mutate(&MutationRequest::Undo { db_id }).await.unwrap();
        assert_eq!(restored.events.len(), 4);
        assert!(!timeline.undo_available(db_id).await.unwrap());

        let err = timeline.mutate(&MutationRequest::Undo { db_id }).await.unwrap_err();
        assert_eq!(err, SyncError::Server("Nothing to undo".to_string()));
    }

    #[tokio::test]
    async fn unknown_session_is_server_error() {
        let (timeline, _) = mirror();
        let err = timeline.undo_available(DbId(99)).await.unwrap_err();
        assert!(matches!(err, SyncError::Server(_)));
    }
}
