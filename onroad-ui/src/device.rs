//! device.rs — display wakefulness and backlight control
//!
//! Runs once per tick after the UI state update. The only writer of
//! [`DeviceWakeState`]. Backlight writes go to the blocking pool with at most
//! one in flight; a value computed while a write is pending is dropped and
//! recomputed next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::events::{EventTx, UiEvent};
use crate::hardware::Hardware;

/// Backlight floor once the screen has been tapped with a pinned brightness
const MIN_PINNED_BRIGHTNESS: i32 = 5;

// ── Filter ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FirstOrderFilter {
    x: f32,
    k: f32,
}

impl FirstOrderFilter {
    pub fn new(x0: f32, ts: f32, dt: f32) -> Self {
        let r = dt / ts;
        Self { x: x0, k: r / (1.0 + r) }
    }

    pub fn update(&mut self, input: f32) -> f32 {
        self.x = (1.0 - self.k) * self.x + self.k * input;
        self.x
    }

    pub fn value(&self) -> f32 {
        self.x
    }
}

/// CIE 1931 lightness of a light-sensor percentage, as a backlight percent in [10, 100].
pub fn cie_brightness(light_sensor: f32) -> f32 {
    let l = if light_sensor <= 8.0 {
        light_sensor / 903.3
    } else {
        ((light_sensor + 16.0) / 116.0).powi(3)
    };
    (100.0 * l).clamp(10.0, 100.0)
}

// ── Single-flight guard ───────────────────────────────────────────────────────

/// One outstanding request at a time. The slot frees when the guard drops.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

#[derive(Debug)]
pub struct FlightGuard {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn try_begin(&self) -> Option<FlightGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard { busy: Arc::clone(&self.busy) })
    }

    pub fn in_flight(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

// ── Device ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviceWakeState {
    pub awake: bool,
    /// Ticks left before the screen may sleep
    pub interactive_timeout: u32,
    /// Last value handed to the hardware; `None` before the first write
    pub last_brightness: Option<i32>,
    pub ignition_on: bool,
}

/// What the controller reads from the UI state each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceInputs {
    pub started: bool,
    pub ignition: bool,
    pub light_sensor: f32,
    pub screen_brightness: i32,
}

pub struct Device {
    config: DeviceConfig,
    ui_freq: u32,
    wake: DeviceWakeState,
    filter: FirstOrderFilter,
    writer: SingleFlight,
    hw: Arc<dyn Hardware>,
    events: EventTx,
}

impl Device {
    /// Powers the display on and arms the offroad timeout.
    pub fn new(config: DeviceConfig, ui_freq: u32, hw: Arc<dyn Hardware>, events: EventTx) -> Self {
        let dt = 1.0 / ui_freq as f32;
        let filter = FirstOrderFilter::new(config.offroad_brightness, config.backlight_ts, dt);
        let mut device = Self {
            config,
            ui_freq,
            wake: DeviceWakeState { awake: false, interactive_timeout: 0, last_brightness: None, ignition_on: false },
            filter,
            writer: SingleFlight::default(),
            hw,
            events,
        };
        device.set_awake(true);
        device.reset_interactive_timeout(None);
        device
    }

    pub fn wake(&self) -> &DeviceWakeState {
        &self.wake
    }

    pub fn brightness_write_pending(&self) -> bool {
        self.writer.in_flight()
    }

    pub fn update(&mut self, inputs: &DeviceInputs) {
        self.update_brightness(inputs);
        self.update_wakefulness(inputs);
    }

    /// `None` picks the onroad or offroad duration from the ignition state.
    pub fn reset_interactive_timeout(&mut self, secs: Option<u32>) {
        let secs = secs.unwrap_or(if self.wake.ignition_on {
            self.config.onroad_timeout_secs
        } else {
            self.config.offroad_timeout_secs
        });
        self.wake.interactive_timeout = secs * self.ui_freq;
    }

    fn set_awake(&mut self, on: bool) {
        if on == self.wake.awake {
            return;
        }
        self.wake.awake = on;
        if let Err(e) = self.hw.set_display_power(on) {
            warn!("Display power write failed: {e}");
        }
        info!("Display power {}", if on { "on" } else { "off" });
        let _ = self.events.send(UiEvent::DisplayPowerChanged(on));
    }

    fn update_brightness(&mut self, inputs: &DeviceInputs) {
        let target = if inputs.started { cie_brightness(inputs.light_sensor) } else { self.config.offroad_brightness };
        let mut brightness = self.filter.update(target) as i32;

        if !self.wake.awake {
            brightness = 0;
        } else if (0..=100).contains(&inputs.screen_brightness) {
            brightness = inputs.screen_brightness.max(MIN_PINNED_BRIGHTNESS);
        }

        if self.wake.last_brightness != Some(brightness) {
            self.dispatch_brightness(brightness);
        }
    }

    fn dispatch_brightness(&mut self, brightness: i32) {
        let Some(guard) = self.writer.try_begin() else {
            debug!("Backlight write in flight, deferring {brightness}%");
            return;
        };
        self.wake.last_brightness = Some(brightness);

        let hw = Arc::clone(&self.hw);
        let write = move || {
            let _guard = guard;
            if let Err(e) = hw.set_brightness(brightness) {
                warn!("Backlight write failed: {e}");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(write);
            }
            // no runtime: tools and plain unit tests write inline
            Err(_) => write(),
        }
    }

    fn update_wakefulness(&mut self, inputs: &DeviceInputs) {
        let ignition_just_turned_off = !inputs.ignition && self.wake.ignition_on;
        self.wake.ignition_on = inputs.ignition;

        if ignition_just_turned_off {
            self.reset_interactive_timeout(None);
        } else if self.wake.interactive_timeout > 0 {
            self.wake.interactive_timeout -= 1;
            if self.wake.interactive_timeout == 0 {
                info!("Interactive timeout");
                let _ = self.events.send(UiEvent::InteractiveTimeout);
            }
        }

        let pending = self.wake.interactive_timeout > 0;
        let awake = if inputs.screen_brightness != 0 { inputs.ignition || pending } else { pending };
        self.set_awake(awake);
    }
}
