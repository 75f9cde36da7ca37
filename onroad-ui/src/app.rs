//! app.rs — wires the UI state to the device controller and its collaborators

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{AppConfig, HardwareBackend};
use crate::device::Device;
use crate::events::EventTx;
use crate::hardware::{Hardware, LogHardware, SysfsHardware};
use crate::params::{seed_defaults, JsonParams, MemoryParams, ParamStore};
use crate::sub_master::MessageSource;
use crate::ui_state::UiState;

pub struct App {
    pub ui: UiState,
    pub device: Device,
}

fn open_store(path: Option<&std::path::Path>) -> Arc<dyn ParamStore> {
    match path {
        Some(path) => Arc::new(JsonParams::open(path)),
        None => Arc::new(MemoryParams::new()),
    }
}

impl App {
    pub fn new(ui: UiState, device: Device) -> Self {
        Self { ui, device }
    }

    /// Build every collaborator the config names.
    pub fn from_config(config: &AppConfig, source: Box<dyn MessageSource>, events: EventTx) -> Self {
        let params = open_store(config.params.persistent.as_deref());
        let params_memory = open_store(config.params.volatile.as_deref());
        if let Err(e) = seed_defaults(&*params) {
            warn!("Failed to seed default params: {e}");
        }

        let hw: Arc<dyn Hardware> = match config.hardware.backend {
            HardwareBackend::Log => Arc::new(LogHardware),
            HardwareBackend::Sysfs => {
                info!("Backlight at {}", config.hardware.backlight_dir.display());
                Arc::new(SysfsHardware::new(&config.hardware.backlight_dir))
            }
        };

        let ui = UiState::new(source, params, params_memory, events.clone(), &config.ui);
        let device = Device::new(config.device.clone(), config.ui.freq, hw, events);
        Self::new(ui, device)
    }

    /// One fixed-rate tick. The device pass reads what the UI pass produced.
    pub fn tick(&mut self) {
        self.ui.update();
        self.device.update(&self.ui.device_inputs());
    }
}
