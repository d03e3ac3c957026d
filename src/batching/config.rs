/// Batch-shaping parameters handed to the formation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchingConfig {
    /// Maximum span a batch may cover before it is split
    pub target_duration_secs: i64,

    /// Maximum allowed gap between consecutive captures inside one batch
    pub max_gap_secs: i64,

    /// How far back downstream card construction looks (not used by formation)
    pub card_lookback_secs: i64,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            target_duration_secs: 15 * 60,
            max_gap_secs: 5 * 60,
            card_lookback_secs: 60 * 60,
        }
    }
}
