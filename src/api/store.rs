use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;

use crate::core::{ContributionSpec, PlanParameters};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode settings: {0}")]
    Json(#[from] serde_json::Error),
    #[error("settings store lock poisoned")]
    Poisoned,
}

/// The single participant record the service reads and writes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionSettings {
    pub user_id: String,
    #[serde(flatten)]
    pub contribution: ContributionSpec,
    #[serde(flatten)]
    pub plan: PlanParameters,
    #[serde(default)]
    pub paychecks_processed: u32,
    #[serde(default)]
    pub ytd_contributions: f64,
}

impl Default for ContributionSettings {
    fn default() -> Self {
        Self {
            user_id: "user123".to_string(),
            contribution: ContributionSpec::percentage(6.0),
            plan: PlanParameters::default(),
            paychecks_processed: 20,
            ytd_contributions: 4_800.0,
        }
    }
}

pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<ContributionSettings, StoreError>;
    fn save(&self, settings: &ContributionSettings) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: Mutex<ContributionSettings>,
}

impl MemoryStore {
    pub fn new(settings: ContributionSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<ContributionSettings, StoreError> {
        let guard = self.settings.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.clone())
    }

    fn save(&self, settings: &ContributionSettings) -> Result<(), StoreError> {
        let mut guard = self.settings.lock().map_err(|_| StoreError::Poisoned)?;
        *guard = settings.clone();
        Ok(())
    }
}

/// Keeps the record in memory and rewrites a pretty-printed JSON file on every save.
///
/// Writes are not atomic; a crash mid-write can lose the file, in which case the next start
/// falls back to defaults.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    cached: Mutex<ContributionSettings>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = read_settings(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "could not load settings, using defaults");
            ContributionSettings::default()
        });
        Self {
            path,
            cached: Mutex::new(settings),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_settings(path: &Path) -> Result<ContributionSettings, StoreError> {
    let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<ContributionSettings, StoreError> {
        let guard = self.cached.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.clone())
    }

    fn save(&self, settings: &ContributionSettings) -> Result<(), StoreError> {
        let mut guard = self.cached.lock().map_err(|_| StoreError::Poisoned)?;
        let encoded = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, encoded).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        *guard = settings.clone();
        Ok(())
    }
}
