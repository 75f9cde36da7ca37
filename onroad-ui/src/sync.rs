//! sync.rs — selective per-topic refresh of vehicle-derived UI state
//!
//! Only topics flagged fresh by the subscription map touch their fields.
//! Several fields are further gated on the overlay that displays them, so a
//! hidden feature costs nothing.

use serde::Serialize;
use telemetry_types::{
    CarControl, CarParams, CarState, ControlsState, DriverMonitoringState, GpsLocationExternal, ImageSensor,
    LateralPlan, LongitudinalPlan, Message, PandaStates, PandaType, Topic, WideRoadCameraState,
};
use tracing::{debug, warn};

use crate::calibration::CalibrationFrame;
use crate::settings::Settings;
use crate::sub_master::SubMaster;

/// Seconds without a hardware-link report before the panda type reverts to unknown
const PANDA_STALE_SECS: u64 = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleState {
    // hardware link
    pub panda_type: PandaType,
    pub ignition: bool,
    /// Device reports started and ignition is on
    pub started: bool,

    // controls
    pub enabled: bool,
    pub experimental_mode: bool,
    pub always_on_lateral: bool,
    pub always_on_lateral_active: bool,

    // car params
    pub longitudinal_control: bool,
    pub conditional_experimental: bool,
    pub driving_personalities_ui_wheel: bool,
    pub experimental_mode_via_wheel: bool,

    // car state
    pub blind_spot_left: bool,
    pub blind_spot_right: bool,
    pub turn_signal_left: bool,
    pub turn_signal_right: bool,
    pub steering_angle_deg: f32,
    pub toyota_car: bool,

    pub bearing_deg: f32,

    // plans
    pub lane_width_left: f32,
    pub lane_width_right: f32,
    pub desired_follow: f32,
    pub obstacle_distance: f32,
    pub obstacle_distance_stock: f32,
    pub stopped_equivalence: f32,
    pub stopped_equivalence_stock: f32,

    /// Ambient light estimate, percent
    pub light_sensor: f32,

    // driver monitoring
    pub is_rhd: bool,
    pub dm_active: bool,
}

impl VehicleState {
    /// Absorb every fresh topic, then re-derive `started`.
    ///
    /// Topics are visited in `Topic` order, so `controlsState` lands before
    /// `carControl` and the lateral-active flag sees this tick's `enabled`.
    pub fn sync(&mut self, sm: &SubMaster, calibration: &mut CalibrationFrame, settings: &Settings, ui_freq: u32) {
        for (_, msg) in sm.fresh() {
            match msg {
                Message::LiveCalibration(c) => calibration.apply(c),
                Message::PandaStates(p) => self.apply_panda_states(p),
                Message::CarControl(c) => self.apply_car_control(c),
                Message::CarParams(p) => self.apply_car_params(p),
                Message::CarState(c) => self.apply_car_state(c, settings),
                Message::ControlsState(c) => self.apply_controls_state(c),
                Message::GpsLocationExternal(g) => self.apply_gps(g, settings),
                Message::LateralPlan(p) => self.apply_lateral_plan(p, settings),
                Message::LongitudinalPlan(p) => self.apply_longitudinal_plan(p, settings),
                Message::WideRoadCameraState(c) => self.apply_camera_state(c),
                Message::DriverMonitoringState(d) => self.apply_driver_monitoring(d),
                // geometry and pose inputs are read straight from the map
                _ => {}
            }
        }

        if !sm.updated(Topic::PandaStates) {
            let silent = sm.frame.saturating_sub(sm.rcv_frame(Topic::PandaStates));
            if silent > PANDA_STALE_SECS * u64::from(ui_freq) && self.panda_type != PandaType::Unknown {
                warn!("pandaStates silent for {silent} frames, hardware type unknown");
                self.panda_type = PandaType::Unknown;
            }
        }

        self.started = sm.device_state().is_some_and(|d| d.started) && self.ignition;
    }

    fn apply_panda_states(&mut self, msg: &PandaStates) {
        let Some(first) = msg.pandas.first() else {
            return;
        };
        self.panda_type = first.panda_type;
        if self.panda_type != PandaType::Unknown {
            let ignition = msg.pandas.iter().any(|p| p.ignition_line || p.ignition_can);
            if ignition != self.ignition {
                debug!("Ignition {} → {ignition}", self.ignition);
            }
            self.ignition = ignition;
        }
    }

    fn apply_car_control(&mut self, msg: &CarControl) {
        if self.always_on_lateral {
            self.always_on_lateral_active = !self.enabled && msg.always_on_lateral;
        }
    }

    fn apply_car_params(&mut self, msg: &CarParams) {
        self.always_on_lateral = msg.always_on_lateral;
        self.longitudinal_control = msg.openpilot_longitudinal_control;
        if self.longitudinal_control {
            self.conditional_experimental = msg.conditional_experimental_mode;
            self.driving_personalities_ui_wheel = msg.driving_personalities_ui_wheel;
            self.experimental_mode_via_wheel = msg.experimental_mode_via_wheel;
        }
    }

    fn apply_car_state(&mut self, msg: &CarState, settings: &Settings) {
        let developer = settings.developer_overlay();
        if settings.blind_spot_path || settings.frog_signals {
            self.blind_spot_left = msg.left_blindspot;
            self.blind_spot_right = msg.right_blindspot;
        }
        if developer || settings.frog_signals {
            self.turn_signal_left = msg.left_blinker;
            self.turn_signal_right = msg.right_blinker;
        }
        if settings.blind_spot_path || developer || settings.rotating_wheel {
            self.steering_angle_deg = msg.steering_angle_deg;
        }
        if self.started {
            self.toyota_car = msg.toyota_car;
        }
    }

    fn apply_controls_state(&mut self, msg: &ControlsState) {
        self.enabled = msg.enabled;
        self.experimental_mode = msg.experimental_mode;
    }

    fn apply_gps(&mut self, msg: &GpsLocationExternal, settings: &Settings) {
        if settings.compass {
            self.bearing_deg = msg.bearing_deg;
        }
    }

    fn apply_lateral_plan(&mut self, msg: &LateralPlan, settings: &Settings) {
        if settings.blind_spot_path || settings.developer_overlay() {
            self.lane_width_left = msg.lane_width_left;
            self.lane_width_right = msg.lane_width_right;
        }
    }

    fn apply_longitudinal_plan(&mut self, msg: &LongitudinalPlan, settings: &Settings) {
        if settings.developer_overlay() {
            self.desired_follow = msg.desired_follow_distance;
            self.obstacle_distance = msg.safe_obstacle_distance;
            self.obstacle_distance_stock = msg.safe_obstacle_distance_stock;
            self.stopped_equivalence = msg.stopped_equivalence_factor;
            self.stopped_equivalence_stock = msg.stopped_equivalence_factor_stock;
        }
    }

    fn apply_camera_state(&mut self, msg: &WideRoadCameraState) {
        let scale = if msg.sensor == ImageSensor::Ar0231 { 6.0 } else { 1.0 };
        self.light_sensor = (100.0 - scale * msg.exposure_val_percent).max(0.0);
    }

    fn apply_driver_monitoring(&mut self, msg: &DriverMonitoringState) {
        self.is_rhd = msg.is_rhd;
        self.dm_active = msg.is_active_mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sub_master::NullSource;
    use telemetry_types::{DeviceState, PandaState};

    const FREQ: u32 = 20;

    struct Rig {
        sm: SubMaster,
        vehicle: VehicleState,
        calibration: CalibrationFrame,
        settings: Settings,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                sm: SubMaster::new(Box::new(NullSource)),
                vehicle: VehicleState::default(),
                calibration: CalibrationFrame::default(),
                settings: Settings::default(),
            }
        }

        fn tick(&mut self, msgs: Vec<Message>) {
            for m in msgs {
                self.sm.push(m);
            }
            self.sm.update();
            self.vehicle.sync(&self.sm, &mut self.calibration, &self.settings, FREQ);
        }
    }

    fn panda(panda_type: PandaType, line: bool, can: bool) -> PandaState {
        PandaState { panda_type, ignition_line: line, ignition_can: can }
    }

    #[test]
    fn test_ignition_is_or_across_units() {
        let mut rig = Rig::new();
        rig.tick(vec![Message::PandaStates(PandaStates {
            pandas: vec![panda(PandaType::Tres, false, false), panda(PandaType::Dos, false, true)],
        })]);
        assert!(rig.vehicle.ignition);
        assert_eq!(rig.vehicle.panda_type, PandaType::Tres);
    }

    #[test]
    fn test_unknown_panda_leaves_ignition() {
        let mut rig = Rig::new();
        rig.vehicle.ignition = true;
        rig.tick(vec![Message::PandaStates(PandaStates { pandas: vec![panda(PandaType::Unknown, false, false)] })]);
        assert!(rig.vehicle.ignition);

        rig.tick(vec![Message::PandaStates(PandaStates::default())]);
        assert!(rig.vehicle.ignition);
    }

    #[test]
    fn test_stale_panda_reverts_to_unknown() {
        let mut rig = Rig::new();
        rig.tick(vec![Message::PandaStates(PandaStates { pandas: vec![panda(PandaType::Tres, true, false)] })]);
        for _ in 0..(5 * FREQ) {
            rig.tick(vec![]);
        }
        // exactly 5·freq frames of silence is still tolerated
        assert_eq!(rig.vehicle.panda_type, PandaType::Tres);
        rig.tick(vec![]);
        assert_eq!(rig.vehicle.panda_type, PandaType::Unknown);
        // ignition is not cleared by staleness
        assert!(rig.vehicle.ignition);
    }

    #[test]
    fn test_started_needs_device_and_ignition() {
        let mut rig = Rig::new();
        rig.tick(vec![Message::DeviceState(DeviceState { started: true })]);
        assert!(!rig.vehicle.started);

        rig.tick(vec![Message::PandaStates(PandaStates { pandas: vec![panda(PandaType::Tres, true, false)] })]);
        assert!(rig.vehicle.started);

        rig.tick(vec![Message::DeviceState(DeviceState { started: false })]);
        assert!(!rig.vehicle.started);
    }

    #[test]
    fn test_lateral_active_only_with_capability() {
        let mut rig = Rig::new();
        rig.tick(vec![Message::CarControl(CarControl { always_on_lateral: true })]);
        assert!(!rig.vehicle.always_on_lateral_active);

        rig.tick(vec![
            Message::CarParams(CarParams { always_on_lateral: true, ..CarParams::default() }),
            Message::CarControl(CarControl { always_on_lateral: true }),
        ]);
        assert!(rig.vehicle.always_on_lateral_active);

        // fully engaged in the same tick: controlsState is applied first
        rig.tick(vec![
            Message::ControlsState(ControlsState { enabled: true, ..ControlsState::default() }),
            Message::CarControl(CarControl { always_on_lateral: true }),
        ]);
        assert!(!rig.vehicle.always_on_lateral_active);
    }

    #[test]
    fn test_personalization_needs_longitudinal_control() {
        let mut rig = Rig::new();
        let params = CarParams { conditional_experimental_mode: true, ..CarParams::default() };
        rig.tick(vec![Message::CarParams(params)]);
        assert!(!rig.vehicle.conditional_experimental);

        rig.tick(vec![Message::CarParams(CarParams { openpilot_longitudinal_control: true, ..params })]);
        assert!(rig.vehicle.conditional_experimental);
    }

    #[test]
    fn test_car_state_fields_gated_by_overlays() {
        let mut rig = Rig::new();
        let cs = CarState {
            left_blindspot: true,
            left_blinker: true,
            steering_angle_deg: 12.0,
            toyota_car: true,
            ..CarState::default()
        };
        rig.tick(vec![Message::CarState(cs)]);
        assert_eq!(rig.vehicle, VehicleState::default());

        rig.settings.rotating_wheel = true;
        rig.tick(vec![Message::CarState(cs)]);
        assert_eq!(rig.vehicle.steering_angle_deg, 12.0);
        assert!(!rig.vehicle.blind_spot_left && !rig.vehicle.turn_signal_left);

        rig.settings.frog_signals = true;
        rig.tick(vec![Message::CarState(cs)]);
        assert!(rig.vehicle.blind_spot_left && rig.vehicle.turn_signal_left);
        assert!(!rig.vehicle.toyota_car);
    }

    #[test]
    fn test_light_sensor_scale_by_sensor() {
        let mut rig = Rig::new();
        rig.tick(vec![Message::WideRoadCameraState(WideRoadCameraState {
            sensor: ImageSensor::Ar0231,
            exposure_val_percent: 10.0,
        })]);
        assert_eq!(rig.vehicle.light_sensor, 40.0);

        rig.tick(vec![Message::WideRoadCameraState(WideRoadCameraState {
            sensor: ImageSensor::Ar0231,
            exposure_val_percent: 30.0,
        })]);
        assert_eq!(rig.vehicle.light_sensor, 0.0);

        rig.tick(vec![Message::WideRoadCameraState(WideRoadCameraState {
            sensor: ImageSensor::Ox03c10,
            exposure_val_percent: 30.0,
        })]);
        assert_eq!(rig.vehicle.light_sensor, 70.0);
    }

    #[test]
    fn test_plan_fields_gated() {
        let mut rig = Rig::new();
        let lat = LateralPlan { lane_width_left: 3.5, lane_width_right: 3.2 };
        rig.tick(vec![Message::LateralPlan(lat)]);
        assert_eq!(rig.vehicle.lane_width_left, 0.0);

        rig.settings.developer_ui = 1;
        rig.tick(vec![
            Message::LateralPlan(lat),
            Message::LongitudinalPlan(LongitudinalPlan { desired_follow_distance: 25.0, ..LongitudinalPlan::default() }),
        ]);
        assert_eq!(rig.vehicle.lane_width_left, 3.5);
        assert_eq!(rig.vehicle.desired_follow, 25.0);
    }

    #[test]
    fn test_stale_topic_fields_untouched() {
        let mut rig = Rig::new();
        rig.tick(vec![Message::ControlsState(ControlsState { enabled: true, ..ControlsState::default() })]);
        rig.vehicle.enabled = false;
        rig.tick(vec![]);
        // controlsState not fresh, so the local value stands
        assert!(!rig.vehicle.enabled);
    }
}
