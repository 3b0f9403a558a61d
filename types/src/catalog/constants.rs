/// Minimum number of segments a wheel may hold at any time.
pub const MIN_WHEEL_SEGMENTS: usize = 2;

/// Segment probabilities on one wheel must sum to this many percent.
pub const WHEEL_PROBABILITY_TOTAL: f64 = 100.0;

/// Probabilities are entered with a 0.01 step, so totals are compared in hundredths.
pub const PROBABILITY_SCALE: f64 = 100.0;

/// Label given to a freshly added instant-win prize.
pub const DEFAULT_PRIZE_LABEL: &str = "New prize";

/// Label given to a freshly added wheel segment.
pub const DEFAULT_SEGMENT_LABEL: &str = "New segment";
