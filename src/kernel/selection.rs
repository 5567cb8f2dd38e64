use super::segment::{PhaseType, Segment, SegmentId};
use super::store::SegmentStore;
use super::time::Contiguity;
use crate::error::PreconditionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a pointer click on a segment is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickMode {
    Toggle,
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionEvent {
    Click { id: SegmentId, mode: ClickMode },
    Clear,
}

/// Client-owned selection. Never sent anywhere except as request payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub selected: BTreeSet<SegmentId>,
    pub range_anchor: Option<SegmentId>,
}

/// Which operations the current selection allows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validity {
    pub deletable: bool,
    pub mergeable: bool,
    pub splittable: bool,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.selected.contains(&id)
    }

    pub fn ids(&self) -> Vec<SegmentId> {
        self.selected.iter().copied().collect()
    }

    /// Selected segments in timeline order. Ids missing from the store are skipped.
    pub fn sorted_segments<'a>(&self, store: &'a SegmentStore) -> Vec<&'a Segment> {
        store.iter().filter(|s| self.selected.contains(&s.id)).collect()
    }

    pub fn validity(&self, store: &SegmentStore, contiguity: &Contiguity) -> Validity {
        Validity {
            deletable: is_deletable(self),
            mergeable: is_mergeable(self, store, contiguity),
            splittable: is_splittable(self),
        }
    }
}

/// Pure selection reducer: `(state, event) -> state`.
pub fn reduce(state: &SelectionState, store: &SegmentStore, event: SelectionEvent) -> SelectionState {
    match event {
        SelectionEvent::Clear => SelectionState::default(),
        SelectionEvent::Click { id, .. } if !store.contains(id) => state.clone(),
        SelectionEvent::Click { id, mode: ClickMode::Toggle } => {
            let mut next = state.clone();
            if !next.selected.remove(&id) {
                next.selected.insert(id);
            }
            next
        }
        SelectionEvent::Click { id, mode: ClickMode::Range } => match state.range_anchor {
            None => SelectionState {
                selected: BTreeSet::from([id]),
                range_anchor: Some(id),
            },
            // Second click on the anchor cancels the gesture
            Some(anchor) if anchor == id => SelectionState::default(),
            Some(anchor) => {
                let selected: BTreeSet<SegmentId> = match (store.index_of(anchor), store.index_of(id)) {
                    (Some(a), Some(b)) => store
                        .as_slice()
                        .get(a.min(b)..=a.max(b))
                        .unwrap_or_default()
                        .iter()
                        .map(|s| s.id)
                        .collect(),
                    // Anchor vanished from the store: restart from the target
                    _ => BTreeSet::from([id]),
                };
                SelectionState { selected, range_anchor: None }
            }
        },
    }
}

pub fn is_deletable(state: &SelectionState) -> bool {
    !state.is_empty()
}

pub fn is_splittable(state: &SelectionState) -> bool {
    state.len() == 1
}

pub fn is_mergeable(state: &SelectionState, store: &SegmentStore, contiguity: &Contiguity) -> bool {
    check_mergeable(state, store, contiguity).is_ok()
}

/// Mergeable means: two or more, one shared type, and pairwise contiguous in
/// sorted order. Returns the run in timeline order on success.
pub fn check_mergeable<'a>(
    state: &SelectionState,
    store: &'a SegmentStore,
    contiguity: &Contiguity,
) -> Result<Vec<&'a Segment>, PreconditionError> {
    if let Some(missing) = state.selected.iter().find(|id| !store.contains(**id)) {
        return Err(PreconditionError::UnknownSegment(*missing));
    }
    if state.len() < 2 {
        return Err(PreconditionError::MergeTooFew { selected: state.len() });
    }

    let run = state.sorted_segments(store);
    let phase: PhaseType = run[0].phase;
    if let Some(other) = run.iter().find(|s| s.phase != phase) {
        return Err(PreconditionError::MergeMixedTypes { first: phase, second: other.phase });
    }
    for pair in run.windows(2) {
        if !contiguity.is_adjacent(pair[0].end, pair[1].start) {
            return Err(PreconditionError::MergeNotContiguous {
                first: pair[0].id,
                second: pair[1].id,
            });
        }
    }
    Ok(run)
}
