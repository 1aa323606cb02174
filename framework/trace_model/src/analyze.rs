use crate::event::{RenderPhase, TraceEvent};
use serde::{Deserialize, Serialize};

/// Timings derived from one trace, all in microseconds.
///
/// An all-zero summary means that no interaction marker was found. Callers should treat that as
/// a degenerate trace rather than a fast one, see [TimingSummary::is_degenerate].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingSummary {
    /// Start of the interaction marker event.
    pub click_start_time: i64,
    /// Duration of the interaction marker event.
    pub click_dur: i64,
    /// Start of the latest starting composite event.
    pub final_composite_start_time: i64,
    /// Duration of the latest starting composite event.
    pub final_composite_dur: i64,
    /// How many interaction markers the trace contained. Only the last one seen is used.
    pub marker_count: usize,
    /// How many composite events the trace contained.
    pub composite_count: usize,
}

impl TimingSummary {
    /// Click to final paint: the end of the final composite minus the start of the click.
    ///
    /// Only meaningful for a trace with exactly one marker and a selected final composite. The
    /// value is not clamped, so it may be negative for a degenerate trace. Returns `None` if the
    /// timestamps are too large to combine without overflowing.
    pub fn total_duration_us(&self) -> Option<i64> {
        self.final_composite_start_time
            .checked_add(self.final_composite_dur)?
            .checked_sub(self.click_start_time)
    }

    /// [TimingSummary::total_duration_us] converted to milliseconds.
    pub fn total_duration_ms(&self) -> Option<f64> {
        self.total_duration_us().map(|us| us as f64 / 1000.0)
    }

    /// True when a composite event was selected as the final one.
    ///
    /// Composite events at `ts <= 0` are counted but can never be selected.
    pub fn has_final_composite(&self) -> bool {
        self.final_composite_start_time > 0
    }

    /// True when the trace lacks either end of the measurement.
    pub fn is_degenerate(&self) -> bool {
        self.marker_count == 0 || !self.has_final_composite()
    }
}

/// Reduce a trace to its [TimingSummary] in a single pass.
///
/// Event order is not assumed. The interaction marker is overwritten by every later marker in scan
/// order. The final composite is the one with the greatest `ts`, where only a strictly greater `ts`
/// replaces the current candidate, so ties keep the first seen. The candidate starts at `ts = 0`,
/// which means a composite event at exactly `ts = 0` is never selected.
pub fn analyze(events: &[TraceEvent]) -> TimingSummary {
    events
        .iter()
        .fold(TimingSummary::default(), |mut summary, event| {
            if event.is_interaction_marker() {
                summary.click_start_time = event.ts;
                summary.click_dur = event.dur;
                summary.marker_count += 1;
            }

            match event.phase() {
                RenderPhase::CompositeLayers => {
                    summary.composite_count += 1;
                    if event.ts > summary.final_composite_start_time {
                        summary.final_composite_start_time = event.ts;
                        summary.final_composite_dur = event.dur;
                    }
                }
                RenderPhase::Layout
                | RenderPhase::UpdateLayoutTree
                | RenderPhase::Paint
                | RenderPhase::Unclassified => {}
            }

            summary
        })
}
