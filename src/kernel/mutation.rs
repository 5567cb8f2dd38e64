//! Structural edits: precondition checks, request building, and the list
//! transformations shared by the local preview and the authoritative mirror.

use super::relabel::relabel_from;
use super::segment::{DbId, Segment, SegmentId};
use super::selection::{check_mergeable, SelectionState};
use super::store::SegmentStore;
use super::time::{Contiguity, TimePoint};
use crate::error::PreconditionError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// What the analyst asked for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EditCommand {
    Delete,
    Merge,
    Split { split_time: TimePoint },
    /// Destructive; only sent once `confirmed` is set.
    Recalculate { apnea_threshold: Option<f64>, confirmed: bool },
    Undo,
}

impl EditCommand {
    pub fn kind(&self) -> OperationKind {
        match self {
            EditCommand::Delete => OperationKind::Delete,
            EditCommand::Merge => OperationKind::Merge,
            EditCommand::Split { .. } => OperationKind::Split,
            EditCommand::Recalculate { .. } => OperationKind::Recalculate,
            EditCommand::Undo => OperationKind::Undo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Delete,
    Merge,
    Split,
    Recalculate,
    Undo,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Delete => "delete",
            OperationKind::Merge => "merge",
            OperationKind::Split => "split",
            OperationKind::Recalculate => "recalculate",
            OperationKind::Undo => "undo",
        };
        f.write_str(name)
    }
}

/// State-changing request against the authoritative timeline. Serializes to
/// the exact POST body the server expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MutationRequest {
    Split {
        db_id: DbId,
        segment_id: SegmentId,
        split_time: TimePoint,
    },
    Delete {
        db_id: DbId,
        segment_ids: Vec<SegmentId>,
    },
    Merge {
        db_id: DbId,
        segment_ids: Vec<SegmentId>,
    },
    Recalculate {
        db_id: DbId,
        #[serde(skip_serializing_if = "Option::is_none")]
        apnea_threshold: Option<f64>,
    },
    Undo {
        db_id: DbId,
    },
}

impl MutationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            MutationRequest::Delete { .. } => OperationKind::Delete,
            MutationRequest::Merge { .. } => OperationKind::Merge,
            MutationRequest::Split { .. } => OperationKind::Split,
            MutationRequest::Recalculate { .. } => OperationKind::Recalculate,
            MutationRequest::Undo { .. } => OperationKind::Undo,
        }
    }

    pub fn db_id(&self) -> DbId {
        match self {
            MutationRequest::Delete { db_id, .. }
            | MutationRequest::Merge { db_id, .. }
            | MutationRequest::Split { db_id, .. }
            | MutationRequest::Recalculate { db_id, .. }
            | MutationRequest::Undo { db_id } => *db_id,
        }
    }
}

// === Request planning (client side) ===

pub fn plan_delete(
    db_id: DbId,
    selection: &SelectionState,
    store: &SegmentStore,
) -> Result<MutationRequest, PreconditionError> {
    if selection.is_empty() {
        return Err(PreconditionError::EmptySelection);
    }
    if let Some(missing) = selection.selected.iter().find(|id| !store.contains(**id)) {
        return Err(PreconditionError::UnknownSegment(*missing));
    }
    Ok(MutationRequest::Delete {
        db_id,
        segment_ids: selection.ids(),
    })
}

pub fn plan_merge(
    db_id: DbId,
    selection: &SelectionState,
    store: &SegmentStore,
    contiguity: &Contiguity,
) -> Result<MutationRequest, PreconditionError> {
    let run = check_mergeable(selection, store, contiguity)?;
    Ok(MutationRequest::Merge {
        db_id,
        segment_ids: run.iter().map(|s| s.id).collect(),
    })
}

pub fn plan_split(
    db_id: DbId,
    selection: &SelectionState,
    store: &SegmentStore,
    split_time: TimePoint,
) -> Result<MutationRequest, PreconditionError> {
    if selection.len() != 1 {
        return Err(PreconditionError::SplitNeedsSingle { selected: selection.len() });
    }
    let id = selection.ids()[0];
    let seg = store.find(id).ok_or(PreconditionError::UnknownSegment(id))?;
    if !seg.strictly_contains(split_time) {
        return Err(PreconditionError::SplitOutOfRange {
            segment_id: id,
            split_time,
            start: seg.start,
            end: seg.end,
        });
    }
    Ok(MutationRequest::Split {
        db_id,
        segment_id: id,
        split_time,
    })
}

pub fn plan_recalculate(
    db_id: DbId,
    apnea_threshold: Option<f64>,
) -> Result<MutationRequest, PreconditionError> {
    if let Some(t) = apnea_threshold {
        if !t.is_finite() || t <= 0.0 {
            return Err(PreconditionError::InvalidThreshold(t));
        }
    }
    Ok(MutationRequest::Recalculate { db_id, apnea_threshold })
}

// === List transformations (preview + authoritative mirror) ===

/// Removes `ids` and relabels from the lowest affected index.
pub fn apply_delete(segments: &[Segment], ids: &[SegmentId]) -> Result<Vec<Segment>, PreconditionError> {
    if ids.is_empty() {
        return Err(PreconditionError::EmptySelection);
    }
    let targets: HashSet<SegmentId> = ids.iter().copied().collect();
    let mut first_affected = None;
    for id in &targets {
        match segments.iter().position(|s| s.id == *id) {
            Some(i) => first_affected = Some(first_affected.map_or(i, |f: usize| f.min(i))),
            None => return Err(PreconditionError::UnknownSegment(*id)),
        }
    }

    let mut out: Vec<Segment> = segments.iter().filter(|s| !targets.contains(&s.id)).copied().collect();
    if let Some(index) = first_affected {
        relabel_from(&mut out, index);
    }
    Ok(out)
}

/// Collapses a contiguous same-type run into one segment carrying `new_id`.
pub fn apply_merge(
    segments: &[Segment],
    ids: &[SegmentId],
    new_id: SegmentId,
    contiguity: &Contiguity,
) -> Result<Vec<Segment>, PreconditionError> {
    let store = SegmentStore::from_segments(segments.to_vec());
    let selection = SelectionState {
        selected: ids.iter().copied().collect(),
        range_anchor: None,
    };
    let run = check_mergeable(&selection, &store, contiguity)?;

    let merged = Segment {
        id: new_id,
        start: run[0].start,
        end: run.iter().map(|s| s.end).max().unwrap_or(run[0].end),
        phase: run[0].phase,
    };
    let at = store.index_of(run[0].id).unwrap_or(0);

    let mut out: Vec<Segment> = store.iter().filter(|s| !selection.contains(s.id)).copied().collect();
    out.insert(at, merged);
    relabel_from(&mut out, at);
    Ok(out)
}

/// Replaces one segment by `[start, split_time]` and `[split_time + step, end]`.
pub fn apply_split(
    segments: &[Segment],
    id: SegmentId,
    split_time: TimePoint,
    new_ids: (SegmentId, SegmentId),
    contiguity: &Contiguity,
) -> Result<Vec<Segment>, PreconditionError> {
    let mut out = segments.to_vec();
    out.sort_by_key(|s| (s.start, s.id));
    let at = out
        .iter()
        .position(|s| s.id == id)
        .ok_or(PreconditionError::UnknownSegment(id))?;
    let original = out[at];

    if !original.strictly_contains(split_time) {
        return Err(PreconditionError::SplitOutOfRange {
            segment_id: id,
            split_time,
            start: original.start,
            end: original.end,
        });
    }
    let second_start = split_time + contiguity.step;
    if second_start > original.end {
        return Err(PreconditionError::SplitLeavesNoRemainder { segment_id: id, split_time });
    }

    let first = Segment { id: new_ids.0, end: split_time, ..original };
    let second = Segment { id: new_ids.1, start: second_start, ..original };
    out.splice(at..=at, [first, second]);
    // The first half keeps the label; everything after realigns to it
    relabel_from(&mut out, at + 1);
    Ok(out)
}
