//! Whole-tick runs of the UI state engine against the synthetic drive.

use std::sync::Arc;

use onroad_ui::app::App;
use onroad_ui::config::{DeviceConfig, UiConfig, UI_FREQ};
use onroad_ui::device::Device;
use onroad_ui::events::{self, UiEvent};
use onroad_ui::hardware::LogHardware;
use onroad_ui::params::{seed_defaults, MemoryParams, ParamStore};
use onroad_ui::status::SceneStatus;
use onroad_ui::sub_master::{ChannelSource, MessageSource, NullSource};
use onroad_ui::ui_state::UiState;
use telemetry_sim::{scenarios, DriveSim, ScenarioConfig};
use telemetry_types::{
    ControlsState, DeviceState, Message, OpenpilotState, PandaState, PandaStates, PandaType,
};
use tokio::sync::broadcast;

const DT: f64 = 1.0 / UI_FREQ as f64;

struct Harness {
    app: App,
    rx: broadcast::Receiver<UiEvent>,
    sim: DriveSim,
    /// Every notification except per-tick scene updates, in order
    events: Vec<UiEvent>,
}

fn build(source: Box<dyn MessageSource>, scenario: ScenarioConfig) -> Harness {
    let params = Arc::new(MemoryParams::new());
    seed_defaults(&*params).unwrap();
    let (tx, rx) = events::channel(64);
    let ui = UiState::new(source, params, Arc::new(MemoryParams::new()), tx.clone(), &UiConfig::default());
    let device = Device::new(DeviceConfig::default(), UI_FREQ, Arc::new(LogHardware), tx);
    Harness { app: App::new(ui, device), rx, sim: DriveSim::new(scenario, Some(11)), events: Vec::new() }
}

fn harness(scenario: ScenarioConfig) -> Harness {
    build(Box::new(NullSource), scenario)
}

impl Harness {
    fn drain(&mut self) {
        while let Ok(ev) = self.rx.try_recv() {
            if !matches!(ev, UiEvent::SceneUpdated(_)) {
                self.events.push(ev);
            }
        }
    }

    fn run_secs(&mut self, secs: f64) {
        for _ in 0..(secs / DT).round() as usize {
            for msg in self.sim.step(DT) {
                self.app.ui.sm.push(msg);
            }
            self.app.tick();
            self.drain();
        }
    }

    fn tick_with(&mut self, msgs: Vec<Message>) {
        for msg in msgs {
            self.app.ui.sm.push(msg);
        }
        self.app.tick();
        self.drain();
    }

    fn offroad_edges(&self) -> Vec<bool> {
        self.events
            .iter()
            .filter_map(|e| match e {
                UiEvent::OffroadTransition { offroad } => Some(*offroad),
                _ => None,
            })
            .collect()
    }
}

#[test]
fn status_follows_start_then_controls_updates() {
    let mut h = harness(ScenarioConfig::default());
    let ignition = Message::PandaStates(PandaStates {
        pandas: vec![PandaState { panda_type: PandaType::Tres, ignition_line: true, ignition_can: false }],
    });
    let controls = |enabled, state| Message::ControlsState(ControlsState { enabled, experimental_mode: false, state });

    h.tick_with(vec![Message::DeviceState(DeviceState { started: false })]);
    h.tick_with(vec![ignition, Message::DeviceState(DeviceState { started: true })]);
    assert!(h.app.ui.vehicle.started);
    assert_eq!(h.app.ui.status.status, SceneStatus::Disengaged);
    assert_eq!(h.app.ui.status.started_frame, 2);

    h.tick_with(vec![controls(true, OpenpilotState::PreEnabled)]);
    assert_eq!(h.app.ui.status.status, SceneStatus::Override);

    h.tick_with(vec![controls(true, OpenpilotState::Enabled)]);
    assert_eq!(h.app.ui.status.status, SceneStatus::Engaged);

    h.tick_with(vec![controls(false, OpenpilotState::Disabled)]);
    assert_eq!(h.app.ui.status.status, SceneStatus::Disengaged);

    assert_eq!(h.offroad_edges(), vec![true, false]);
}

#[test]
fn default_drive_engages_and_draws_the_road() {
    let mut h = harness(ScenarioConfig::default());
    h.run_secs(12.0);

    let ui = &h.app.ui;
    assert!(ui.vehicle.started);
    assert!(ui.calibration.calibration_valid);
    assert!(ui.calibration.calibration_wide_valid);
    assert_eq!(ui.status.status, SceneStatus::Engaged);
    assert!(!ui.scene.track_vertices.is_empty());
    assert!(ui.scene.lane_line_vertices.iter().all(|p| !p.is_empty()));
    assert!(ui.scene.lead_vertices[0].is_some());
    assert!(ui.scene.lead_vertices[1].is_none());
    assert!(ui.driver_pose.fade_state < 0.5);
    assert!(ui.vehicle.light_sensor > 50.0);
    assert_eq!(h.offroad_edges(), vec![true, false]);
}

#[test]
fn ignition_cycle_sleeps_display_once() {
    let mut h = harness(scenarios::preset_ignition_cycle());
    h.run_secs(50.0);

    assert_eq!(h.offroad_edges(), vec![true, false, true]);
    let timeouts: Vec<usize> = h
        .events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, UiEvent::InteractiveTimeout))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(timeouts.len(), 1);

    // the timeout lands after going offroad, and the panel powers down with it
    let offroad_at = h
        .events
        .iter()
        .rposition(|e| matches!(e, UiEvent::OffroadTransition { offroad: true }))
        .unwrap();
    assert!(timeouts[0] > offroad_at);
    assert!(matches!(h.events.last(), Some(UiEvent::DisplayPowerChanged(false))));
    assert!(!h.app.device.wake().awake);
    assert_eq!(h.app.device.wake().interactive_timeout, 0);
}

#[test]
fn silent_hardware_link_degrades_to_unknown_and_recovers() {
    let mut h = harness(scenarios::preset_panda_dropout());
    h.run_secs(7.5);
    assert_eq!(h.app.ui.vehicle.panda_type, PandaType::Tres);

    // 8 s dropout start + 5 s tolerance
    h.run_secs(6.0);
    assert_eq!(h.app.ui.vehicle.panda_type, PandaType::Unknown);
    // ignition is latched from the last report
    assert!(h.app.ui.vehicle.ignition);

    h.run_secs(3.0);
    assert_eq!(h.app.ui.vehicle.panda_type, PandaType::Tres);
}

#[test]
fn hill_crest_path_never_folds_back() {
    let mut h = harness(scenarios::preset_hill_crest());
    h.run_secs(15.0);
    let path = &h.app.ui.scene.track_vertices.points;
    assert!(!path.is_empty());
    let left = &path[..path.len() / 2];
    assert!(left.windows(2).all(|w| w[1].y <= w[0].y));
}

#[test]
fn close_lead_foreshortens_path() {
    let mut h = harness(scenarios::preset_close_lead());
    for _ in 0..10 {
        h.run_secs(1.5);
        let radar = h.app.ui.sm.radar_state().copied().unwrap();
        if radar.lead_one.status {
            assert!(h.app.ui.scene.max_distance <= 2.0 * radar.lead_one.d_rel);
        }
    }
}

#[test]
fn lateral_only_drive_reports_lateral_active() {
    let mut h = harness(scenarios::from_name("always-on-lateral").unwrap());
    h.run_secs(10.0);
    assert!(h.app.ui.vehicle.always_on_lateral_active);
    assert_eq!(h.app.ui.status.status, SceneStatus::LateralActive);
}

#[test]
fn live_toggle_update_reaches_backlight() {
    let params = Arc::new(MemoryParams::new());
    seed_defaults(&*params).unwrap();
    let memory = Arc::new(MemoryParams::new());
    let (tx, _rx) = events::channel(1024);
    let ui = UiState::new(Box::new(NullSource), params.clone(), memory.clone(), tx.clone(), &UiConfig::default());
    let device = Device::new(DeviceConfig::default(), UI_FREQ, Arc::new(LogHardware), tx);
    let mut app = App::new(ui, device);

    app.tick();
    assert_eq!(app.ui.settings.screen_brightness, 101);

    params.put("ScreenBrightness", "35").unwrap();
    memory.put_bool("TogglesUpdated", true).unwrap();
    app.tick();
    assert_eq!(app.ui.settings.screen_brightness, 35);
    assert_eq!(app.device.wake().last_brightness, Some(35));
}

#[tokio::test]
async fn channel_fed_engine_matches_direct_push() {
    let (tx, source) = ChannelSource::new();
    let mut h = build(Box::new(source), ScenarioConfig::default());
    for _ in 0..(8.0 / DT) as usize {
        for msg in h.sim.step(DT) {
            tx.send(msg).unwrap();
        }
        h.app.tick();
        h.drain();
    }
    assert!(h.app.ui.vehicle.started);
    assert!(!h.app.ui.scene.track_vertices.is_empty());
    assert_eq!(h.offroad_edges(), vec![true, false]);
}
