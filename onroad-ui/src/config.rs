//! config.rs — process configuration (TOML)
//!
//! Every section and field is optional; anything missing takes the built-in
//! default. A missing file falls back to the embedded `config.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

/// Fixed tick rate of the UI loop
pub const UI_FREQ: u32 = 20;

pub const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ui: UiConfig,
    pub device: DeviceConfig,
    pub params: ParamsConfig,
    pub hardware: HardwareConfig,
    pub sim: SimConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub freq: u32,
    pub fb_w: f32,
    pub fb_h: f32,
    pub clip_margin: f32,
    /// Camera image zoom inside the onroad widget
    pub zoom: f32,
    pub wide_cam: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { freq: UI_FREQ, fb_w: 2160.0, fb_h: 1080.0, clip_margin: 500.0, zoom: 1.1, wide_cam: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Backlight percent while offroad
    pub offroad_brightness: f32,
    /// Backlight filter time constant, seconds; the step is one tick
    pub backlight_ts: f32,
    pub onroad_timeout_secs: u32,
    pub offroad_timeout_secs: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            offroad_brightness: 50.0,
            backlight_ts: 10.0,
            onroad_timeout_secs: 10,
            offroad_timeout_secs: 30,
        }
    }
}

/// `None` keeps the store in memory only.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParamsConfig {
    pub persistent: Option<PathBuf>,
    pub volatile: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareBackend {
    #[default]
    Log,
    Sysfs,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub backend: HardwareBackend,
    pub backlight_dir: PathBuf,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            backend: HardwareBackend::Log,
            backlight_dir: PathBuf::from("/sys/class/backlight/panel0-backlight"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub scenario: String,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { scenario: "default".to_string(), seed: None }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let (source, raw) = match std::fs::read_to_string(path) {
            Ok(raw) => (path.display().to_string(), raw),
            Err(e) => {
                warn!("Could not read {}: {e}, using built-in config", path.display());
                ("built-in config".to_string(), DEFAULT_CONFIG.to_string())
            }
        };
        let cfg = Self::parse(&raw).with_context(|| format!("invalid config in {source}"))?;
        info!("Config loaded from {source} ({} Hz, {}×{})", cfg.ui.freq, cfg.ui.fb_w, cfg.ui.fb_h);
        Ok(cfg)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(raw)?;
        anyhow::ensure!(cfg.ui.freq > 0, "ui.freq must be positive");
        anyhow::ensure!(cfg.device.backlight_ts > 0.0, "device.backlight_ts must be positive");
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_parses() {
        let cfg = AppConfig::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(cfg.ui.freq, UI_FREQ);
        assert_eq!(cfg.device.offroad_timeout_secs, 30);
        assert_eq!(cfg.hardware.backend, HardwareBackend::Log);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg = AppConfig::parse("[hardware]\nbackend = \"sysfs\"\n[device]\nonroad_timeout_secs = 5\n").unwrap();
        assert_eq!(cfg.hardware.backend, HardwareBackend::Sysfs);
        assert_eq!(cfg.device.onroad_timeout_secs, 5);
        assert_eq!(cfg.device.offroad_brightness, 50.0);
        assert_eq!(cfg.ui.fb_w, 2160.0);
        assert!(cfg.params.persistent.is_none());
    }

    #[test]
    fn test_zero_freq_rejected() {
        assert!(AppConfig::parse("[ui]\nfreq = 0\n").is_err());
    }

    #[test]
    fn test_missing_file_uses_embedded() {
        let cfg = AppConfig::load(Path::new("/nonexistent/onroad-ui.toml")).unwrap();
        assert_eq!(cfg.sim.scenario, "default");
    }
}
