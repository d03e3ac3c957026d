//! Analysis cadence presets.
//!
//! A preset bundles how often the orchestrator wakes up with the shape of the
//! batches it forms. Exactly one preset is active per process; it is persisted
//! by [`crate::settings::SettingsStore`].

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::batching::BatchingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CadencePreset {
    #[default]
    Relaxed,
    Frequent,
    Realtime,
}

impl CadencePreset {
    pub const ALL: [CadencePreset; 3] = [
        CadencePreset::Relaxed,
        CadencePreset::Frequent,
        CadencePreset::Realtime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CadencePreset::Relaxed => "relaxed",
            CadencePreset::Frequent => "frequent",
            CadencePreset::Realtime => "realtime",
        }
    }

    /// Parse a persisted identifier. Unknown values are `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "relaxed" => Some(CadencePreset::Relaxed),
            "frequent" => Some(CadencePreset::Frequent),
            "realtime" => Some(CadencePreset::Realtime),
            _ => None,
        }
    }

    /// Parse a persisted identifier, falling back to the default preset.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_default()
    }

    /// Time between orchestrator ticks.
    pub fn check_interval(&self) -> Duration {
        match self {
            CadencePreset::Relaxed => Duration::from_secs(60),
            CadencePreset::Frequent => Duration::from_secs(30),
            CadencePreset::Realtime => Duration::from_secs(15),
        }
    }

    pub fn batching_config(&self) -> BatchingConfig {
        match self {
            CadencePreset::Relaxed => BatchingConfig::default(),
            CadencePreset::Frequent => BatchingConfig {
                target_duration_secs: 10 * 60,
                max_gap_secs: 3 * 60,
                card_lookback_secs: 45 * 60,
            },
            CadencePreset::Realtime => BatchingConfig {
                target_duration_secs: 6 * 60,
                max_gap_secs: 2 * 60,
                card_lookback_secs: 30 * 60,
            },
        }
    }
}

impl fmt::Display for CadencePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
