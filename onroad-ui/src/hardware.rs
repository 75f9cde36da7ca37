//! hardware.rs — display power and backlight collaborators

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("backlight I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unreadable max_brightness {0:?}")]
    MaxBrightness(String),
}

/// Both calls may block; the device controller keeps them off the tick path
/// where it can.
pub trait Hardware: Send + Sync {
    fn set_display_power(&self, on: bool) -> Result<(), HardwareError>;
    /// `percent` in 0..=100
    fn set_brightness(&self, percent: i32) -> Result<(), HardwareError>;
}

/// No panel attached: log what would have been written.
#[derive(Debug, Default)]
pub struct LogHardware;

impl Hardware for LogHardware {
    fn set_display_power(&self, on: bool) -> Result<(), HardwareError> {
        info!("💡 Display power {}", if on { "on" } else { "off" });
        Ok(())
    }

    fn set_brightness(&self, percent: i32) -> Result<(), HardwareError> {
        debug!("Backlight → {percent}%");
        Ok(())
    }
}

/// Linux backlight class device, e.g. `/sys/class/backlight/panel0-backlight`.
#[derive(Debug, Clone)]
pub struct SysfsHardware {
    dir: PathBuf,
}

impl SysfsHardware {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    fn write(&self, file: &str, value: &str) -> Result<(), HardwareError> {
        let path = self.dir.join(file);
        std::fs::write(&path, value).map_err(|source| HardwareError::Io { path, source })
    }

    fn max_brightness(&self) -> Result<i32, HardwareError> {
        let path = self.dir.join("max_brightness");
        let raw = std::fs::read_to_string(&path).map_err(|source| HardwareError::Io { path, source })?;
        raw.trim().parse().map_err(|_| HardwareError::MaxBrightness(raw.trim().to_string()))
    }
}

impl Hardware for SysfsHardware {
    fn set_display_power(&self, on: bool) -> Result<(), HardwareError> {
        // FB_BLANK_UNBLANK = 0, FB_BLANK_POWERDOWN = 4
        self.write("bl_power", if on { "0" } else { "4" })
    }

    fn set_brightness(&self, percent: i32) -> Result<(), HardwareError> {
        let max = self.max_brightness()?;
        let value = percent.clamp(0, 100) * max / 100;
        self.write("brightness", &value.to_string())
    }
}
