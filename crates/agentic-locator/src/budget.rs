//! Search budget estimation from target and page complexity.

use std::time::Duration;

use crate::types::Segment;

/// Fixed feature slots per segment: use, identifier, sibling index, input name.
pub const FIXED_OPTIONS: usize = 4;

const SEGMENT_COMPLEXITY_RANGE: (f64, f64) = (100.0, 200.0);
const PAGE_COMPLEXITY_RANGE: (f64, f64) = (1000.0, 3000.0);
const BUDGET_FLOOR_SECS: f64 = 4.0;
const BUDGET_SPAN_SECS: f64 = 8.0;

/// Number of inclusion bits reserved for every segment.
pub fn options_per_segment(segments: &[Segment]) -> usize {
    segments.iter().map(Segment::class_count).max().unwrap_or(0) + FIXED_OPTIONS
}

/// Clamp `value` into `range` and map it linearly onto `[0, 1]`.
fn normalize(value: f64, (lo, hi): (f64, f64)) -> f64 {
    (value.clamp(lo, hi) - lo) / (hi - lo)
}

/// Search time allowance in milliseconds, between 4 000 and 12 000.
pub fn estimate_budget_ms(segments: &[Segment], total_elements: usize) -> u64 {
    let options = (segments.len() * options_per_segment(segments)) as f64;
    let segment_complexity = normalize(options, SEGMENT_COMPLEXITY_RANGE);
    let page_complexity = normalize(total_elements as f64, PAGE_COMPLEXITY_RANGE);
    let secs = (segment_complexity * page_complexity * BUDGET_SPAN_SECS + BUDGET_FLOOR_SECS).ceil();
    secs as u64 * 1000
}

/// [`estimate_budget_ms`] as a [`Duration`].
pub fn estimate_budget(segments: &[Segment], total_elements: usize) -> Duration {
    Duration::from_millis(estimate_budget_ms(segments, total_elements))
}
