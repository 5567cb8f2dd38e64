use breathline::kernel::relabel::{alternates, relabel_from};
use breathline::kernel::segment::{PhaseType, Segment, SegmentId};
use breathline::kernel::selection::{is_mergeable, reduce, ClickMode, SelectionEvent, SelectionState};
use breathline::kernel::store::SegmentStore;
use breathline::kernel::time::{Contiguity, TimePoint};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn phase_of(code: u8) -> PhaseType {
    match code % 3 {
        0 => PhaseType::Inhalation,
        1 => PhaseType::Exhalation,
        _ => PhaseType::Apnea,
    }
}

/// Builds a timeline from (phase, gap) pairs. A gap of 0 keeps the next
/// segment contiguous; anything larger opens a hole.
fn build(layout: &[(u8, u8)]) -> Vec<Segment> {
    let mut t = 0.0;
    layout.iter()
        .enumerate()
        .map(|(i, (code, gap))| {
            let start = t + *gap as f64;
            let seg = Segment::new(i as u64 + 1, start, start + 5.0, phase_of(*code));
            t = start + 6.0;
            seg
        })
        .collect()
}

fn brute_force_mergeable(segments: &[Segment], selected: &BTreeSet<SegmentId>) -> bool {
    let run: Vec<&Segment> = segments.iter().filter(|s| selected.contains(&s.id)).collect();
    if run.len() < 2 || run.len() != selected.len() {
        return false;
    }
    let same_type = run.iter().all(|s| s.phase == run[0].phase);
    let contiguous = run
        .windows(2)
        .all(|w| w[1].start == w[0].end + TimePoint::from_units(1.0));
    same_type && contiguous
}

proptest! {
    #[test]
    fn relabel_restores_alternation(
        layout in prop::collection::vec((0u8..3, 0u8..1), 0..40),
        start in 0usize..45,
    ) {
        let original = build(&layout);
        let mut relabeled = original.clone();
        relabel_from(&mut relabeled, start);

        let cut = start.min(original.len());
        prop_assert_eq!(&relabeled[..cut], &original[..cut], "prefix must be untouched");

        for (before, after) in original.iter().zip(&relabeled) {
            prop_assert_eq!(before.id, after.id);
            prop_assert_eq!(before.start, after.start);
            prop_assert_eq!(before.phase.is_apnea(), after.phase.is_apnea(), "apnea keeps type and position");
        }

        // The last labeled phase before the cut plus everything after alternates
        let seed = relabeled[..cut].iter().rev().find(|s| !s.phase.is_apnea()).copied();
        let tail: Vec<Segment> = seed.into_iter().chain(relabeled[cut..].iter().copied()).collect();
        prop_assert!(alternates(&tail));

        if start == 0 {
            prop_assert!(alternates(&relabeled));
        }
    }

    #[test]
    fn merge_validity_matches_definition(
        layout in prop::collection::vec((0u8..3, 0u8..2), 1..12),
        picks in prop::collection::vec(any::<bool>(), 12),
        stray in any::<bool>(),
    ) {
        let segments = build(&layout);
        let store = SegmentStore::from_segments(segments.clone());
        let mut selected: BTreeSet<SegmentId> = segments
            .iter()
            .zip(&picks)
            .filter(|(_, pick)| **pick)
            .map(|(s, _)| s.id)
            .collect();
        if stray {
            selected.insert(SegmentId(1_000));
        }
        let state = SelectionState { selected: selected.clone(), range_anchor: None };

        prop_assert_eq!(
            is_mergeable(&state, &store, &Contiguity::default()),
            brute_force_mergeable(&segments, &selected)
        );
    }

    #[test]
    fn range_selection_is_order_independent(len in 1usize..20, a in 0usize..20, b in 0usize..20) {
        let layout: Vec<(u8, u8)> = (0..len).map(|i| (i as u8, 0)).collect();
        let store = SegmentStore::from_segments(build(&layout));
        let id_at = |i: usize| store.get(i % len).map(|s| s.id).unwrap_or(SegmentId(0));
        let (first, second) = (id_at(a), id_at(b));

        let click = |state: &SelectionState, id| {
            reduce(state, &store, SelectionEvent::Click { id, mode: ClickMode::Range })
        };
        let forward = click(&click(&SelectionState::default(), first), second);
        let backward = click(&click(&SelectionState::default(), second), first);

        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(forward.range_anchor, None);
        if first != second {
            let lo = (a % len).min(b % len);
            let hi = (a % len).max(b % len);
            prop_assert_eq!(forward.len(), hi - lo + 1);
        } else {
            prop_assert!(forward.is_empty());
        }
    }
}
