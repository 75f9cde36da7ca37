//! params.rs — key/value settings store
//!
//! Two instances live in the context: the persistent store (toggles, prime
//! type) and the volatile one shared with other processes (toggle-update flag,
//! conditional status, map open). Values are strings; booleans are "1"/"0".

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode params: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait ParamStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: &str) -> Result<(), ParamsError>;

    fn get_bool(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| v.trim() == "1")
    }

    /// Missing or unparsable values read as 0.
    fn get_int(&self, key: &str) -> i32 {
        self.get(key).and_then(|v| v.trim().parse().ok()).unwrap_or(0)
    }

    fn put_bool(&self, key: &str, value: bool) -> Result<(), ParamsError> {
        self.put(key, if value { "1" } else { "0" })
    }
}

/// Values written on first boot, before the UI reads anything.
pub const DEFAULT_PARAMS: &[(&str, &str)] = &[
    ("IsMetric", "0"),
    ("NavSettingLeftSide", "0"),
    ("CustomTheme", "0"),
    ("CustomColors", "0"),
    ("CustomSignals", "0"),
    ("Compass", "0"),
    ("ConditionalExperimentalModeSpeed", "80"),
    ("ConditionalExperimentalModeSpeedLead", "80"),
    ("CustomRoadUI", "0"),
    ("AccelerationPath", "0"),
    ("BlindSpotPath", "0"),
    ("UnlimitedLength", "0"),
    ("DeveloperUI", "0"),
    ("LaneLinesWidth", "4"),
    ("PathEdgeWidth", "20"),
    ("PathWidth", "61"),
    ("RoadEdgesWidth", "12"),
    ("FireTheBabysitter", "0"),
    ("MuteDM", "0"),
    ("LongitudinalPersonality", "1"),
    ("RotatingWheel", "0"),
    ("ScreenBrightness", "101"),
    ("SteeringWheel", "0"),
    ("WideCameraDisable", "0"),
];

/// Fill in every missing default and mark the store as seeded.
pub fn seed_defaults(store: &dyn ParamStore) -> Result<(), ParamsError> {
    for (key, value) in DEFAULT_PARAMS {
        if store.get(key).is_none() {
            store.put(key, value)?;
        }
    }
    store.put_bool("DefaultParamsSet", true)
}

// ── In-memory store ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryParams {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(pairs: &[(&str, &str)]) -> Self {
        let values = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Self { values: Mutex::new(values) }
    }
}

impl ParamStore for MemoryParams {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn put(&self, key: &str, value: &str) -> Result<(), ParamsError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ── JSON file store ───────────────────────────────────────────────────────────

/// Whole map loaded once, rewritten on every `put`.
#[derive(Debug)]
pub struct JsonParams {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonParams {
    /// Load from disk. A missing or corrupt file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = if !path.exists() {
            info!("No {} found, starting with empty params", path.display());
            BTreeMap::new()
        } else {
            match std::fs::read_to_string(&path) {
                Ok(data) => match serde_json::from_str::<BTreeMap<String, String>>(&data) {
                    Ok(values) => {
                        info!("Loaded {} params from {}", values.len(), path.display());
                        values
                    }
                    Err(e) => {
                        warn!("Failed to parse {}: {e}, starting with empty params", path.display());
                        BTreeMap::new()
                    }
                },
                Err(e) => {
                    warn!("Failed to read {}: {e}, starting with empty params", path.display());
                    BTreeMap::new()
                }
            }
        };
        Self { path, values: Mutex::new(values) }
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), ParamsError> {
        let json = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, json).map_err(|source| ParamsError::Io { path: self.path.clone(), source })
    }
}

impl ParamStore for JsonParams {
    fn get(&self, key: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }

    fn put(&self, key: &str, value: &str) -> Result<(), ParamsError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        if values.get(key).is_some_and(|v| v == value) {
            return Ok(());
        }
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }
}
