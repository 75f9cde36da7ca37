//! drive_sim.rs — synthetic drive producing independently-timed telemetry
//!
//! One ego car on a gently curving three-lane road. Each topic has its own
//! publish period, so ticks on the consumer side see an uneven mix of fresh
//! and stale topics, like the real bus. Noise is Gaussian and seedable.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::{debug, info};

use telemetry_types::{
    CalStatus, CarControl, CarParams, CarState, ControlsState, DeviceState, DriverData, DriverMonitoringState,
    DriverStateV2, GpsLocationExternal, ImageSensor, LateralPlan, LeadData, LiveCalibration, LongitudinalPlan,
    Message, ModelV2, OpenpilotState, PandaState, PandaStates, PandaType, RadarState, Topic, Trajectory, UiPlan,
    WideRoadCameraState, TRAJECTORY_SIZE,
};

use crate::scenarios::{ScenarioConfig, ScenarioType};

/// Camera height above the road surface, meters
const CAMERA_HEIGHT_M: f32 = 1.22;
const LANE_WIDTH_M: f32 = 3.6;
const CRUISE_SPEED_MPS: f32 = 25.0;
/// PreEnabled lasts this long before controls report Enabled
const PRE_ENABLE_S: f64 = 0.5;
/// Horizon of the model trajectory, seconds
const MODEL_HORIZON_S: f32 = 10.0;

/// Publish period per topic, seconds
fn period(topic: Topic) -> f64 {
    match topic {
        Topic::ModelV2
        | Topic::UiPlan
        | Topic::RadarState
        | Topic::ControlsState
        | Topic::CarState
        | Topic::CarControl
        | Topic::LateralPlan
        | Topic::LongitudinalPlan
        | Topic::DriverStateV2
        | Topic::DriverMonitoringState
        | Topic::WideRoadCameraState => 0.05,
        Topic::PandaStates => 0.1,
        Topic::LiveCalibration => 0.25,
        Topic::DeviceState => 0.5,
        Topic::CarParams | Topic::GpsLocationExternal => 1.0,
    }
}

/// Topics published only while the car is started
fn onroad_only(topic: Topic) -> bool {
    !matches!(
        topic,
        Topic::DeviceState | Topic::PandaStates | Topic::LiveCalibration | Topic::CarParams | Topic::GpsLocationExternal
    )
}

struct Schedule {
    topic: Topic,
    next_s: f64,
}

pub struct DriveSim {
    pub t_elapsed: f64,
    pub speed_mps: f32,
    scenario: ScenarioConfig,
    rng: StdRng,
    schedule: Vec<Schedule>,
    started_at: Option<f64>,
}

impl DriveSim {
    pub fn new(scenario: ScenarioConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let schedule = Topic::ALL.iter().map(|&topic| Schedule { topic, next_s: 0.0 }).collect();
        info!("🚗 Drive sim ready (scenarios: {:?})", scenario.active);
        Self { t_elapsed: 0.0, speed_mps: 0.0, scenario, rng, schedule, started_at: None }
    }

    fn noise(&mut self, sigma: f32) -> f32 {
        let n: f32 = self.rng.sample(StandardNormal);
        n * sigma
    }

    pub fn ignition(&self) -> bool {
        self.scenario.ignition_at(self.t_elapsed)
    }

    fn engage_time(&self) -> Option<f64> {
        if self.scenario.has(ScenarioType::AlwaysOnLateral) {
            return None;
        }
        self.started_at.map(|t| t + self.scenario.engage_after_s)
    }

    fn controls(&self) -> ControlsState {
        let state = match self.engage_time() {
            Some(t) if self.t_elapsed >= t + PRE_ENABLE_S => OpenpilotState::Enabled,
            Some(t) if self.t_elapsed >= t => OpenpilotState::PreEnabled,
            _ => OpenpilotState::Disabled,
        };
        let enabled = state != OpenpilotState::Disabled;
        ControlsState { enabled, experimental_mode: false, state }
    }

    /// Advance by `dt` seconds and return every message due in that span.
    pub fn step(&mut self, dt: f64) -> Vec<Message> {
        self.t_elapsed += dt;
        let ignition = self.ignition();
        match (ignition, self.started_at) {
            (true, None) => {
                info!("Ignition on at t={:.1}s", self.t_elapsed);
                self.started_at = Some(self.t_elapsed);
            }
            (false, Some(_)) => {
                info!("Ignition off at t={:.1}s", self.t_elapsed);
                self.started_at = None;
            }
            _ => {}
        }

        let target = if self.controls().enabled { CRUISE_SPEED_MPS } else { 0.0 };
        self.speed_mps += (target - self.speed_mps) * (dt as f32 * 0.3).min(1.0);

        let t = self.t_elapsed;
        let mut due = Vec::new();
        for slot in &mut self.schedule {
            if t >= slot.next_s {
                slot.next_s = t + period(slot.topic);
                due.push(slot.topic);
            }
        }

        let mut out = Vec::with_capacity(due.len());
        for topic in due {
            if onroad_only(topic) && !ignition {
                continue;
            }
            if topic == Topic::PandaStates && self.scenario.panda_silent_at(t) {
                debug!("pandaStates suppressed at t={t:.2}");
                continue;
            }
            out.push(self.message(topic));
        }
        out
    }

    fn message(&mut self, topic: Topic) -> Message {
        match topic {
            Topic::ModelV2 => Message::ModelV2(self.model()),
            Topic::UiPlan => Message::UiPlan(self.ui_plan()),
            Topic::ControlsState => Message::ControlsState(self.controls()),
            Topic::LiveCalibration => Message::LiveCalibration(self.calibration()),
            Topic::RadarState => Message::RadarState(self.radar()),
            Topic::DeviceState => Message::DeviceState(DeviceState { started: self.ignition() }),
            Topic::PandaStates => Message::PandaStates(self.pandas()),
            Topic::CarParams => Message::CarParams(self.car_params()),
            Topic::DriverMonitoringState => Message::DriverMonitoringState(DriverMonitoringState {
                is_rhd: self.scenario.has(ScenarioType::RightHandDrive),
                is_active_mode: true,
            }),
            Topic::CarState => Message::CarState(self.car_state()),
            Topic::DriverStateV2 => Message::DriverStateV2(self.driver_state()),
            Topic::WideRoadCameraState => Message::WideRoadCameraState(self.camera()),
            Topic::CarControl => Message::CarControl(CarControl {
                always_on_lateral: self.scenario.has(ScenarioType::AlwaysOnLateral),
            }),
            Topic::GpsLocationExternal => Message::GpsLocationExternal(GpsLocationExternal {
                bearing_deg: ((self.t_elapsed * 2.0) % 360.0) as f32,
            }),
            Topic::LateralPlan => Message::LateralPlan(LateralPlan {
                lane_width_left: LANE_WIDTH_M + self.noise(0.05),
                lane_width_right: LANE_WIDTH_M - 0.2 + self.noise(0.05),
            }),
            Topic::LongitudinalPlan => Message::LongitudinalPlan(self.longitudinal_plan()),
        }
    }

    // ── Geometry ──────────────────────────────────────────────────────────────

    /// Forward sample distances: quadratic in time, like the model's own grid.
    fn sample_x(&self) -> Vec<f32> {
        let v = self.speed_mps.max(3.0);
        (0..TRAJECTORY_SIZE)
            .map(|i| {
                let s = i as f32 / (TRAJECTORY_SIZE - 1) as f32;
                v * MODEL_HORIZON_S * s * s
            })
            .collect()
    }

    /// Road height below the camera-level plane at distance `x` (Z down).
    fn road_z(&self, x: f32) -> f32 {
        if !self.scenario.has(ScenarioType::HillCrest) {
            return 0.0;
        }
        let crest = self.scenario.crest_distance_m;
        if x < crest {
            -0.05 * x
        } else {
            -0.05 * crest + 0.4 * (x - crest)
        }
    }

    fn curve(&self, xs: &[f32], y_offset: f32, z_offset: f32) -> Trajectory {
        let curvature = 0.0008 * (self.t_elapsed * 0.1).sin() as f32;
        Trajectory {
            x: xs.to_vec(),
            y: xs.iter().map(|x| curvature * x * x + y_offset).collect(),
            z: xs.iter().map(|&x| self.road_z(x) + z_offset).collect(),
        }
    }

    fn model(&mut self) -> ModelV2 {
        let xs = self.sample_x();
        let lane_line = |sim: &Self, y: f32| sim.curve(&xs, y, CAMERA_HEIGHT_M);
        let half = LANE_WIDTH_M / 2.0;
        let near = (0.9 + self.noise(0.03)).clamp(0.0, 1.0);
        let far = (0.3 + self.noise(0.05)).clamp(0.0, 1.0);
        ModelV2 {
            position: self.curve(&xs, 0.0, 0.0),
            lane_lines: vec![
                lane_line(self, -3.0 * half),
                lane_line(self, -half),
                lane_line(self, half),
                lane_line(self, 3.0 * half),
                lane_line(self, -LANE_WIDTH_M),
                lane_line(self, LANE_WIDTH_M),
            ],
            lane_line_probs: vec![far, near, near, far],
            road_edges: vec![lane_line(self, -3.0 * half - 0.5), lane_line(self, 3.0 * half + 0.5)],
            road_edge_stds: vec![0.2 + self.noise(0.02).abs(), 0.2 + self.noise(0.02).abs()],
        }
    }

    /// Empty until the planner has a speed to plan with.
    fn ui_plan(&self) -> UiPlan {
        if self.speed_mps < 1.0 {
            return UiPlan::default();
        }
        UiPlan { position: self.curve(&self.sample_x(), 0.0, 0.0) }
    }

    fn calibration(&mut self) -> LiveCalibration {
        let cal_status =
            if self.scenario.has(ScenarioType::Uncalibrated) { CalStatus::Uncalibrated } else { CalStatus::Calibrated };
        LiveCalibration {
            rpy_calib: vec![0.0, 0.02 + self.noise(0.0005), 0.01 + self.noise(0.0005)],
            wide_from_device_euler: vec![0.0, 0.0, 0.03],
            cal_status,
        }
    }

    fn radar(&mut self) -> RadarState {
        let since_start = self.started_at.map_or(0.0, |s| self.t_elapsed - s);
        let d_rel = if self.scenario.has(ScenarioType::CloseLead) {
            16.0 + 9.0 * (since_start * 0.5).sin() as f32
        } else {
            45.0 + self.noise(0.5)
        };
        RadarState {
            lead_one: LeadData {
                d_rel,
                y_rel: self.noise(0.1),
                v_rel: self.noise(0.3),
                status: since_start > 2.0,
            },
            lead_two: LeadData::default(),
        }
    }

    fn pandas(&self) -> PandaStates {
        PandaStates {
            pandas: vec![PandaState { panda_type: PandaType::Tres, ignition_line: self.ignition(), ignition_can: false }],
        }
    }

    fn car_params(&self) -> CarParams {
        CarParams {
            always_on_lateral: self.scenario.has(ScenarioType::AlwaysOnLateral),
            openpilot_longitudinal_control: true,
            conditional_experimental_mode: false,
            driving_personalities_ui_wheel: true,
            experimental_mode_via_wheel: false,
        }
    }

    fn car_state(&mut self) -> CarState {
        let blink = (self.t_elapsed % 30.0) < 3.0;
        CarState {
            left_blindspot: (self.t_elapsed % 20.0) < 2.0,
            right_blindspot: false,
            left_blinker: blink,
            right_blinker: false,
            steering_angle_deg: 4.0 * (self.t_elapsed * 0.2).sin() as f32 + self.noise(0.1),
            toyota_car: false,
        }
    }

    fn driver_state(&mut self) -> DriverStateV2 {
        let mut face = || DriverData {
            face_orientation: vec![0.05 + self.noise(0.03), -0.1 + self.noise(0.03), self.noise(0.02)],
            face_prob: 0.98,
        };
        let left_driver_data = face();
        let right_driver_data = face();
        DriverStateV2 { left_driver_data, right_driver_data }
    }

    fn camera(&mut self) -> WideRoadCameraState {
        let exposure = if self.scenario.has(ScenarioType::Night) { 16.0 } else { 6.0 };
        WideRoadCameraState {
            sensor: ImageSensor::Ar0231,
            exposure_val_percent: (exposure + self.noise(0.3)).max(0.0),
        }
    }

    fn longitudinal_plan(&mut self) -> LongitudinalPlan {
        let follow = 4.0 + self.speed_mps * 1.45;
        LongitudinalPlan {
            desired_follow_distance: follow,
            safe_obstacle_distance: follow + 6.0 + self.noise(0.2),
            safe_obstacle_distance_stock: follow + 6.0,
            stopped_equivalence_factor: 6.0 + self.noise(0.2),
            stopped_equivalence_factor_stock: 6.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::{self, ScenarioConfig};

    const DT: f64 = 0.05;

    fn run(sim: &mut DriveSim, secs: f64) -> Vec<Message> {
        let mut out = Vec::new();
        for _ in 0..(secs / DT).round() as usize {
            out.extend(sim.step(DT));
        }
        out
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let mut a = DriveSim::new(ScenarioConfig::default(), Some(7));
        let mut b = DriveSim::new(ScenarioConfig::default(), Some(7));
        assert_eq!(run(&mut a, 6.0), run(&mut b, 6.0));
    }

    #[test]
    fn test_nothing_onroad_before_ignition() {
        let mut sim = DriveSim::new(ScenarioConfig::default(), Some(1));
        let msgs = run(&mut sim, 0.5);
        assert!(!msgs.is_empty());
        assert!(msgs.iter().all(|m| !onroad_only(m.topic())));
    }

    #[test]
    fn test_topics_publish_at_their_own_rates() {
        let mut sim = DriveSim::new(ScenarioConfig::default(), Some(2));
        run(&mut sim, 2.0);
        let msgs = run(&mut sim, 2.0);
        let count = |t: Topic| msgs.iter().filter(|m| m.topic() == t).count();
        assert!(count(Topic::ModelV2) >= 38);
        assert!((3..=5).contains(&count(Topic::DeviceState)));
        assert!(count(Topic::CarParams) <= 3);
    }

    #[test]
    fn test_engagement_sequence() {
        let mut sim = DriveSim::new(ScenarioConfig::default(), Some(3));
        let msgs = run(&mut sim, 8.0);
        let states: Vec<OpenpilotState> = msgs
            .iter()
            .filter_map(|m| match m {
                Message::ControlsState(c) => Some(c.state),
                _ => None,
            })
            .collect();
        let first_pre = states.iter().position(|s| *s == OpenpilotState::PreEnabled).unwrap();
        let first_on = states.iter().position(|s| *s == OpenpilotState::Enabled).unwrap();
        assert!(first_pre < first_on);
        assert_eq!(states[0], OpenpilotState::Disabled);
    }

    #[test]
    fn test_panda_dropout_silences_link() {
        let mut sim = DriveSim::new(scenarios::preset_panda_dropout(), Some(4));
        run(&mut sim, 9.0);
        let silent = run(&mut sim, 5.0);
        assert!(silent.iter().all(|m| m.topic() != Topic::PandaStates));
        let back = run(&mut sim, 3.0);
        assert!(back.iter().any(|m| m.topic() == Topic::PandaStates));
    }

    #[test]
    fn test_model_geometry_conventions() {
        let mut sim = DriveSim::new(ScenarioConfig::default(), Some(5));
        run(&mut sim, 10.0);
        let model = sim.model();
        assert_eq!(model.position.len(), TRAJECTORY_SIZE);
        assert_eq!(model.lane_lines.len(), 6);
        // lane lines sit on the road, the path at camera height
        assert!((model.lane_lines[1].z[0] - CAMERA_HEIGHT_M).abs() < 1e-6);
        assert_eq!(model.position.z[0], 0.0);
        assert!(model.position.x.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_ui_plan_short_until_moving() {
        let mut sim = DriveSim::new(ScenarioConfig::default(), Some(6));
        run(&mut sim, 2.0);
        assert!(sim.ui_plan().position.is_empty());
        run(&mut sim, 20.0);
        assert_eq!(sim.ui_plan().position.len(), TRAJECTORY_SIZE);
    }

    #[test]
    fn test_close_lead_stays_close() {
        let mut sim = DriveSim::new(scenarios::preset_close_lead(), Some(8));
        for m in run(&mut sim, 20.0) {
            if let Message::RadarState(r) = m {
                assert!((7.0..=25.0).contains(&r.lead_one.d_rel));
            }
        }
    }
}
