//! Displays derived from a segment list: cycles, the cycle table, and the
//! respiration summary. Recomputed from scratch after every change.

use crate::kernel::segment::{Cycle, PhaseType, Segment};
use crate::kernel::time::TimePoint;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// One inhalation and the exhalation that closes it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CycleSpan {
    inhalation: Segment,
    exhalation: Segment,
}

impl CycleSpan {
    fn total(&self) -> TimePoint {
        self.exhalation.end - self.inhalation.start
    }
}

fn cycle_spans(segments: &[Segment]) -> Vec<CycleSpan> {
    let mut spans = Vec::new();
    let mut open: Option<Segment> = None;

    for seg in segments {
        match seg.phase {
            PhaseType::Inhalation => open = Some(*seg),
            PhaseType::Exhalation => {
                if let Some(inhalation) = open.take() {
                    spans.push(CycleSpan { inhalation, exhalation: *seg });
                }
            }
            PhaseType::Apnea => {}
        }
    }
    spans
}

/// Pairs each inhalation with the next exhalation that comes before another
/// inhalation. Numbered from 1 in timeline order.
pub fn build_cycles(segments: &[Segment]) -> Vec<Cycle> {
    cycle_spans(segments)
        .iter()
        .enumerate()
        .map(|(i, span)| Cycle {
            id: i as u64 + 1,
            start: span.inhalation.start,
            label: format!("cycle {}", i + 1),
        })
        .collect()
}

pub fn cycle_table_html(segments: &[Segment]) -> String {
    let mut html = String::from(
        "<table class=\"table table-striped\">\n<thead><tr>\
         <th>Cycle</th><th>Start</th><th>Inhalation</th><th>Exhalation</th><th>Duration</th>\
         </tr></thead>\n<tbody>\n",
    );
    for (i, span) in cycle_spans(segments).iter().enumerate() {
        // Writing into a String cannot fail
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td></tr>",
            i + 1,
            span.inhalation.start.as_units(),
            span.inhalation.duration().as_units(),
            span.exhalation.duration().as_units(),
            span.total().as_units(),
        );
    }
    html.push_str("</tbody>\n</table>");
    html
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespirationSummary {
    pub cycle_count: usize,
    pub breaths_per_minute: f64,
    pub mean_inhalation: f64,
    pub mean_exhalation: f64,
    /// Mean inhalation over mean exhalation; 0 when there is no exhalation.
    pub ie_ratio: f64,
    pub apnea_count: usize,
    pub apnea_total: f64,
}

pub fn summarize(segments: &[Segment], duration: TimePoint) -> RespirationSummary {
    let spans = cycle_spans(segments);
    let mean = |values: Vec<f64>| {
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    };
    let durations = |phase: PhaseType| -> Vec<f64> {
        segments
            .iter()
            .filter(|s| s.phase == phase)
            .map(|s| s.duration().as_units())
            .collect()
    };

    let mean_inhalation = mean(durations(PhaseType::Inhalation));
    let mean_exhalation = mean(durations(PhaseType::Exhalation));
    let apneas = durations(PhaseType::Apnea);
    let minutes = duration.as_units() / 60.0;

    RespirationSummary {
        cycle_count: spans.len(),
        breaths_per_minute: if minutes > 0.0 { spans.len() as f64 / minutes } else { 0.0 },
        mean_inhalation,
        mean_exhalation,
        ie_ratio: if mean_exhalation > 0.0 { mean_inhalation / mean_exhalation } else { 0.0 },
        apnea_count: apneas.len(),
        apnea_total: apneas.iter().sum(),
    }
}
