//! # telemetry-types
//!
//! Typed snapshots of the telemetry topics consumed by the onroad UI state engine.
//!
//! These types are used by:
//! - `onroad-ui`: per-topic subscription map, state sync, scene geometry
//! - `packages/telemetry-sim`: synthetic drive generator (demo mode, integration tests)
//!
//! ## Coordinate Conventions
//!
//! - **Calibrated car frame**: X = forward, Y = right, Z = down (meters)
//! - **Device frame**: X = forward, Y = right, Z = down
//! - **View frame**: X = right, Y = down, Z = forward (camera optical axis)
//!
//! Snapshots are last-value-wins: a newer message on a topic fully replaces the
//! previous one. Nothing here is validated; consumers treat every field as
//! possibly stale or short.

use serde::{Deserialize, Serialize};

/// Number of samples in every model/plan trajectory.
pub const TRAJECTORY_SIZE: usize = 33;

// ── Topic identifiers ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    ModelV2,
    ControlsState,
    LiveCalibration,
    RadarState,
    DeviceState,
    PandaStates,
    CarParams,
    DriverMonitoringState,
    CarState,
    DriverStateV2,
    WideRoadCameraState,
    UiPlan,
    CarControl,
    GpsLocationExternal,
    LateralPlan,
    LongitudinalPlan,
}

impl Topic {
    /// Every topic the UI subscribes to.
    pub const ALL: [Topic; 16] = [
        Topic::ModelV2,
        Topic::ControlsState,
        Topic::LiveCalibration,
        Topic::RadarState,
        Topic::DeviceState,
        Topic::PandaStates,
        Topic::CarParams,
        Topic::DriverMonitoringState,
        Topic::CarState,
        Topic::DriverStateV2,
        Topic::WideRoadCameraState,
        Topic::UiPlan,
        Topic::CarControl,
        Topic::GpsLocationExternal,
        Topic::LateralPlan,
        Topic::LongitudinalPlan,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Topic::ModelV2 => "modelV2",
            Topic::ControlsState => "controlsState",
            Topic::LiveCalibration => "liveCalibration",
            Topic::RadarState => "radarState",
            Topic::DeviceState => "deviceState",
            Topic::PandaStates => "pandaStates",
            Topic::CarParams => "carParams",
            Topic::DriverMonitoringState => "driverMonitoringState",
            Topic::CarState => "carState",
            Topic::DriverStateV2 => "driverStateV2",
            Topic::WideRoadCameraState => "wideRoadCameraState",
            Topic::UiPlan => "uiPlan",
            Topic::CarControl => "carControl",
            Topic::GpsLocationExternal => "gpsLocationExternal",
            Topic::LateralPlan => "lateralPlan",
            Topic::LongitudinalPlan => "longitudinalPlan",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Trajectory ────────────────────────────────────────────────────────────────

/// Sampled 3D curve in the calibrated car frame (path, lane line, road edge).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
}

impl Trajectory {
    /// Number of complete (x, y, z) samples.
    pub fn len(&self) -> usize {
        self.x.len().min(self.y.len()).min(self.z.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Straight-ahead curve with `n` samples from `x0` spaced by `step`.
    pub fn straight(n: usize, x0: f32, step: f32, y: f32, z: f32) -> Self {
        Self {
            x: (0..n).map(|i| x0 + i as f32 * step).collect(),
            y: vec![y; n],
            z: vec![z; n],
        }
    }
}

// ── Calibration ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CalStatus {
    #[default]
    Uncalibrated,
    Calibrated,
    Invalid,
    Recalibrating,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveCalibration {
    /// Device-from-calibrated Euler angles (roll, pitch, yaw), radians.
    /// Anything other than exactly 3 entries is malformed.
    pub rpy_calib: Vec<f32>,
    /// Wide-camera-from-device Euler angles; empty when unknown.
    pub wide_from_device_euler: Vec<f32>,
    pub cal_status: CalStatus,
}

// ── Hardware link ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PandaType {
    #[default]
    Unknown,
    WhitePanda,
    GreyPanda,
    BlackPanda,
    Pedal,
    Uno,
    Dos,
    RedPanda,
    RedPandaV2,
    Tres,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PandaState {
    pub panda_type: PandaType,
    pub ignition_line: bool,
    pub ignition_can: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PandaStates {
    pub pandas: Vec<PandaState>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub started: bool,
}

// ── Vehicle ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarControl {
    /// Lateral control requested while longitudinal is disengaged.
    pub always_on_lateral: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarParams {
    pub always_on_lateral: bool,
    pub openpilot_longitudinal_control: bool,
    pub conditional_experimental_mode: bool,
    pub driving_personalities_ui_wheel: bool,
    pub experimental_mode_via_wheel: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarState {
    pub left_blindspot: bool,
    pub right_blindspot: bool,
    pub left_blinker: bool,
    pub right_blinker: bool,
    pub steering_angle_deg: f32,
    pub toyota_car: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpenpilotState {
    #[default]
    Disabled,
    PreEnabled,
    Enabled,
    SoftDisabling,
    Overriding,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlsState {
    pub enabled: bool,
    pub experimental_mode: bool,
    pub state: OpenpilotState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsLocationExternal {
    pub bearing_deg: f32,
}

// ── Planning ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LateralPlan {
    pub lane_width_left: f32,
    pub lane_width_right: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongitudinalPlan {
    pub desired_follow_distance: f32,
    pub safe_obstacle_distance: f32,
    pub safe_obstacle_distance_stock: f32,
    pub stopped_equivalence_factor: f32,
    pub stopped_equivalence_factor_stock: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiPlan {
    /// May be shorter than [`TRAJECTORY_SIZE`] while the planner warms up.
    pub position: Trajectory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelV2 {
    pub position: Trajectory,
    pub lane_lines: Vec<Trajectory>,
    pub lane_line_probs: Vec<f32>,
    pub road_edges: Vec<Trajectory>,
    pub road_edge_stds: Vec<f32>,
}

// ── Radar ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadData {
    /// Forward distance to the lead, meters
    pub d_rel: f32,
    /// Lateral offset (positive = left of ego), meters
    pub y_rel: f32,
    pub v_rel: f32,
    /// Tracker reports a valid lead
    pub status: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarState {
    pub lead_one: LeadData,
    pub lead_two: LeadData,
}

// ── Driver monitoring ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverData {
    /// Face orientation (pitch, yaw, roll), radians
    pub face_orientation: Vec<f32>,
    pub face_prob: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverStateV2 {
    pub left_driver_data: DriverData,
    pub right_driver_data: DriverData,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverMonitoringState {
    #[serde(rename = "isRHD")]
    pub is_rhd: bool,
    pub is_active_mode: bool,
}

// ── Camera ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageSensor {
    #[default]
    Unknown,
    Ar0231,
    Ox03c10,
    Os04c10,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WideRoadCameraState {
    pub sensor: ImageSensor,
    pub exposure_val_percent: f32,
}

// ── Message envelope ──────────────────────────────────────────────────────────

/// One telemetry message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "data", rename_all = "camelCase")]
pub enum Message {
    ModelV2(ModelV2),
    ControlsState(ControlsState),
    LiveCalibration(LiveCalibration),
    RadarState(RadarState),
    DeviceState(DeviceState),
    PandaStates(PandaStates),
    CarParams(CarParams),
    DriverMonitoringState(DriverMonitoringState),
    CarState(CarState),
    DriverStateV2(DriverStateV2),
    WideRoadCameraState(WideRoadCameraState),
    UiPlan(UiPlan),
    CarControl(CarControl),
    GpsLocationExternal(GpsLocationExternal),
    LateralPlan(LateralPlan),
    LongitudinalPlan(LongitudinalPlan),
}

impl Message {
    pub fn topic(&self) -> Topic {
        match self {
            Message::ModelV2(_) => Topic::ModelV2,
            Message::ControlsState(_) => Topic::ControlsState,
            Message::LiveCalibration(_) => Topic::LiveCalibration,
            Message::RadarState(_) => Topic::RadarState,
            Message::DeviceState(_) => Topic::DeviceState,
            Message::PandaStates(_) => Topic::PandaStates,
            Message::CarParams(_) => Topic::CarParams,
            Message::DriverMonitoringState(_) => Topic::DriverMonitoringState,
            Message::CarState(_) => Topic::CarState,
            Message::DriverStateV2(_) => Topic::DriverStateV2,
            Message::WideRoadCameraState(_) => Topic::WideRoadCameraState,
            Message::UiPlan(_) => Topic::UiPlan,
            Message::CarControl(_) => Topic::CarControl,
            Message::GpsLocationExternal(_) => Topic::GpsLocationExternal,
            Message::LateralPlan(_) => Topic::LateralPlan,
            Message::LongitudinalPlan(_) => Topic::LongitudinalPlan,
        }
    }
}
