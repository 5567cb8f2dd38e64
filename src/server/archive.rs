use crate::kernel::segment::{DbId, Segment};
use crate::kernel::time::TimePoint;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive io: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no archived timeline for db_id {0}")]
    NotFound(DbId),
}

/// What survives a restart of the mirror. The undo snapshot is kept so the
/// one-level undo is still answered truthfully after a reload, and the
/// initial segmentation so recalculation still discards every edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedTimeline {
    pub db_id: DbId,
    pub duration: TimePoint,
    pub next_id: u64,
    pub events: Vec<Segment>,
    #[serde(default)]
    pub initial_events: Vec<Segment>,
    #[serde(default)]
    pub undo_snapshot: Option<Vec<Segment>>,
}

pub trait TimelineArchive: Send + Sync {
    fn save(&self, timeline: &ArchivedTimeline) -> Result<(), ArchiveError>;
    fn load(&self, db_id: DbId) -> Result<ArchivedTimeline, ArchiveError>;
}

/// One pretty-printed JSON file per session: `<dir>/timeline_<db_id>.json`.
#[derive(Debug, Clone)]
pub struct FileTimelineArchive {
    dir: PathBuf,
}

impl FileTimelineArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, db_id: DbId) -> PathBuf {
        self.dir.join(format!("timeline_{}.json", db_id))
    }

    /// Every archived db_id, ascending.
    pub fn list(&self) -> Result<Vec<DbId>, ArchiveError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let id = name
                .to_str()
                .and_then(|n| n.strip_prefix("timeline_"))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<u64>().ok());
            if let Some(id) = id {
                ids.push(DbId(id));
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl TimelineArchive for FileTimelineArchive {
    fn save(&self, timeline: &ArchivedTimeline) -> Result<(), ArchiveError> {
        let json = serde_json::to_string_pretty(timeline)?;
        fs::write(self.path_for(timeline.db_id), json)?;
        Ok(())
    }

    fn load(&self, db_id: DbId) -> Result<ArchivedTimeline, ArchiveError> {
        let path = self.path_for(db_id);
        if !path.exists() {
            return Err(ArchiveError::NotFound(db_id));
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
