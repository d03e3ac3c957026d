use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use crate::cadence::CadencePreset;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserSettings {
    /// Kept as the raw persisted identifier so unknown values survive a round trip
    /// untouched until the user picks a preset again.
    #[serde(default)]
    analysis_cadence: Option<String>,
}

/// JSON-file settings. Holds the active analysis cadence slot.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Active cadence; `Relaxed` when unset or unrecognized.
    pub fn cadence_preset(&self) -> CadencePreset {
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        CadencePreset::parse_or_default(guard.analysis_cadence.as_deref())
    }

    pub fn set_cadence_preset(&self, preset: CadencePreset) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        guard.analysis_cadence = Some(preset.as_str().to_string());
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: UserSettings = serde_json::from_str(&contents).unwrap_or_default();
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
