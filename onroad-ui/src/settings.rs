//! settings.rs — user toggle snapshot read from the param stores
//!
//! `load()` runs at startup and on every onroad/offroad edge. The toggle block
//! is read once, after the store reports `DefaultParamsSet`; later changes
//! arrive through `refresh_live()` when another process raises
//! `TogglesUpdated` in the volatile store.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::params::ParamStore;
use crate::scene::RoadStyle;
use crate::sync::VehicleState;

const METRIC_CONVERSION: f32 = 0.06;
const IMPERIAL_CONVERSION: f32 = 0.1524;

/// `ScreenBrightness` value meaning "follow the light sensor"
pub const SCREEN_BRIGHTNESS_AUTO: i32 = 101;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Settings {
    pub is_metric: bool,
    pub map_on_left: bool,
    pub default_params_set: bool,

    pub custom_theme: bool,
    pub custom_colors: i32,
    pub frog_colors: bool,
    pub custom_signals: i32,
    pub frog_signals: bool,

    pub compass: bool,
    pub conditional_speed: i32,
    pub conditional_speed_lead: i32,

    pub custom_road_ui: bool,
    pub acceleration_path: bool,
    pub blind_spot_path: bool,
    pub unlimited_road_ui_length: bool,
    pub developer_ui: i32,
    /// Meters
    pub lane_line_width: f32,
    /// Percent of the path width
    pub path_edge_width: f32,
    /// Meters
    pub path_width: f32,
    /// Meters
    pub road_edge_width: f32,

    pub mute_dm: bool,
    pub personality_profile: i32,
    pub rotating_wheel: bool,
    /// 0..=100 pins the backlight; [`SCREEN_BRIGHTNESS_AUTO`] follows the sensor
    pub screen_brightness: i32,
    pub steering_wheel: i32,
    pub wide_camera_disabled: bool,

    // volatile, read every tick
    pub conditional_status: i32,
    pub map_open: bool,

    #[serde(skip)]
    toggles_checked: bool,
    #[serde(skip)]
    live_toggles_checked: bool,
}

impl Settings {
    fn conversion(&self) -> f32 {
        if self.is_metric {
            METRIC_CONVERSION
        } else {
            IMPERIAL_CONVERSION
        }
    }

    fn read_widths(&mut self, params: &dyn ParamStore) {
        let conversion = self.conversion();
        self.lane_line_width = params.get_int("LaneLinesWidth") as f32 / 12.0 * conversion;
        self.path_edge_width = params.get_int("PathEdgeWidth") as f32;
        self.path_width =
            params.get_int("PathWidth") as f32 / 10.0 * if self.is_metric { 0.5 } else { IMPERIAL_CONVERSION };
        self.road_edge_width = params.get_int("RoadEdgesWidth") as f32 / 12.0 * conversion;
    }

    fn read_theme(&mut self, params: &dyn ParamStore) {
        self.custom_colors = if self.custom_theme { params.get_int("CustomColors") } else { 0 };
        self.frog_colors = self.custom_colors == 1;
        self.custom_signals = if self.custom_theme { params.get_int("CustomSignals") } else { 0 };
        self.frog_signals = self.custom_signals == 1;
    }

    pub fn load(&mut self, params: &dyn ParamStore) {
        self.is_metric = params.get_bool("IsMetric");
        self.map_on_left = params.get_bool("NavSettingLeftSide");

        if !self.default_params_set {
            self.default_params_set = params.get_bool("DefaultParamsSet");
        }
        if self.toggles_checked || !self.default_params_set {
            return;
        }

        self.custom_theme = params.get_bool("CustomTheme");
        self.read_theme(params);

        self.compass = params.get_bool("Compass");
        self.conditional_speed = params.get_int("ConditionalExperimentalModeSpeed");
        self.conditional_speed_lead = params.get_int("ConditionalExperimentalModeSpeedLead");
        self.custom_road_ui = params.get_bool("CustomRoadUI");
        self.acceleration_path = self.custom_road_ui && params.get_bool("AccelerationPath");
        self.blind_spot_path = self.custom_road_ui && params.get_bool("BlindSpotPath");
        self.unlimited_road_ui_length = self.custom_road_ui && params.get_bool("UnlimitedLength");
        self.developer_ui = params.get_int("DeveloperUI");
        self.read_widths(params);

        self.mute_dm = params.get_bool("FireTheBabysitter") && params.get_bool("MuteDM");
        self.personality_profile = params.get_int("LongitudinalPersonality");
        self.rotating_wheel = params.get_bool("RotatingWheel");
        self.screen_brightness = params.get_int("ScreenBrightness");
        self.steering_wheel = params.get_int("SteeringWheel");
        self.wide_camera_disabled = params.get_bool("WideCameraDisable");

        self.toggles_checked = true;
        info!(
            "Toggles loaded (metric: {}, custom road UI: {}, developer UI: {}, brightness: {})",
            self.is_metric, self.custom_road_ui, self.developer_ui, self.screen_brightness
        );
    }

    /// Per-tick refresh of the live-tunable subset plus the volatile flags.
    pub fn refresh_live(&mut self, params: &dyn ParamStore, memory: &dyn ParamStore, vehicle: &VehicleState) {
        if memory.get_bool("TogglesUpdated") {
            debug!("TogglesUpdated raised, re-reading live toggles");
            if vehicle.conditional_experimental {
                self.conditional_speed = params.get_int("ConditionalExperimentalModeSpeed");
                self.conditional_speed_lead = params.get_int("ConditionalExperimentalModeSpeedLead");
            }
            if self.custom_theme {
                self.read_theme(params);
            }
            if self.custom_road_ui {
                self.read_widths(params);
            }
            self.developer_ui = params.get_int("DeveloperUI");
            if vehicle.driving_personalities_ui_wheel && !vehicle.toyota_car {
                self.personality_profile = params.get_int("LongitudinalPersonality");
            }
            self.screen_brightness = params.get_int("ScreenBrightness");
            self.steering_wheel = params.get_int("SteeringWheel");

            // acknowledged on every second sighting, and only while engaged
            if self.live_toggles_checked && vehicle.enabled {
                if let Err(e) = memory.put_bool("TogglesUpdated", false) {
                    warn!("Failed to acknowledge TogglesUpdated: {e}");
                }
            }
            self.live_toggles_checked = !self.live_toggles_checked;
        }

        if vehicle.conditional_experimental {
            self.conditional_status = memory.get_int("ConditionalStatus");
        }
        self.map_open = memory.get_bool("MapOpen");
    }

    pub fn developer_overlay(&self) -> bool {
        self.developer_ui != 0
    }

    /// Band widths for the scene rebuild.
    pub fn road_style(&self, vehicle: &VehicleState) -> RoadStyle {
        RoadStyle {
            custom_road_ui: self.custom_road_ui,
            unlimited_length: self.unlimited_road_ui_length,
            lane_line_width: self.lane_line_width,
            road_edge_width: self.road_edge_width,
            path_width: self.path_width,
            path_edge_width: self.path_edge_width,
            adjacent_lanes: self.blind_spot_path || self.developer_overlay(),
            lane_width_left: vehicle.lane_width_left,
            lane_width_right: vehicle.lane_width_right,
        }
    }
}

// ── Subscription tier ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub enum PrimeType {
    #[default]
    Unknown = -1,
    None = 0,
    Magenta = 1,
    Lite = 2,
    Blue = 3,
    MagentaNew = 4,
    Purple = 5,
}

impl PrimeType {
    pub fn from_i32(v: i32) -> Self {
        match v {
            0 => PrimeType::None,
            1 => PrimeType::Magenta,
            2 => PrimeType::Lite,
            3 => PrimeType::Blue,
            4 => PrimeType::MagentaNew,
            5 => PrimeType::Purple,
            _ => PrimeType::Unknown,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn has_prime(self) -> bool {
        self > PrimeType::None
    }

    /// Stored value, or `Unknown` when absent.
    pub fn read(params: &dyn ParamStore) -> Self {
        match params.get("PrimeType") {
            Some(v) => Self::from_i32(v.trim().parse().unwrap_or(-1)),
            None => PrimeType::Unknown,
        }
    }
}
