//! ui_state.rs — the per-process UI context and its fixed-rate update
//!
//! Constructed once and passed by reference to whatever needs it. Each
//! entity has one writer: the sync pass owns [`VehicleState`] and the
//! calibration, the scene updater owns the geometry, the status machine owns
//! the status, and settings own themselves.

use std::sync::Arc;

use telemetry_types::{Topic, UiPlan};
use tracing::{debug, info, warn};

use crate::calibration::{CalibrationFrame, FrameSpace, SceneView};
use crate::config::UiConfig;
use crate::device::DeviceInputs;
use crate::driver_pose::DriverPoseState;
use crate::events::{EventTx, SceneSnapshot, UiEvent};
use crate::geometry::{self, ScreenTransform};
use crate::params::ParamStore;
use crate::scene::SceneGeometry;
use crate::settings::{PrimeType, Settings};
use crate::status::StatusMachine;
use crate::sub_master::{MessageSource, SubMaster};
use crate::sync::VehicleState;

pub struct UiState {
    pub sm: SubMaster,
    pub calibration: CalibrationFrame,
    pub frame_space: FrameSpace,
    pub vehicle: VehicleState,
    pub scene: SceneGeometry,
    pub driver_pose: DriverPoseState,
    pub status: StatusMachine,
    pub settings: Settings,
    prime_type: PrimeType,
    params: Arc<dyn ParamStore>,
    params_memory: Arc<dyn ParamStore>,
    events: EventTx,
    ui_freq: u32,
    zoom: f32,
    /// Configured camera; the user toggle can still veto the wide one
    wide_cam_requested: bool,
}

impl UiState {
    pub fn new(
        source: Box<dyn MessageSource>,
        params: Arc<dyn ParamStore>,
        params_memory: Arc<dyn ParamStore>,
        events: EventTx,
        config: &UiConfig,
    ) -> Self {
        let frame_space = FrameSpace {
            fb_w: config.fb_w,
            fb_h: config.fb_h,
            clip_margin: config.clip_margin,
            car_space_transform: ScreenTransform::centered(
                config.fb_w,
                config.fb_h,
                config.zoom,
                geometry::intrinsics(false),
            ),
            wide_cam: false,
        };

        let mut settings = Settings::default();
        settings.load(&*params);
        let prime_type = PrimeType::read(&*params);
        info!("UI state ready ({} Hz, prime type {prime_type:?})", config.freq);

        let mut state = Self {
            sm: SubMaster::new(source),
            calibration: CalibrationFrame::default(),
            frame_space,
            vehicle: VehicleState::default(),
            scene: SceneGeometry::default(),
            driver_pose: DriverPoseState::default(),
            status: StatusMachine::default(),
            settings,
            prime_type,
            params,
            params_memory,
            events,
            ui_freq: config.freq,
            zoom: config.zoom,
            wide_cam_requested: config.wide_cam,
        };
        state.apply_camera_choice();
        state
    }

    /// One tick: ingest, sync, derive status, rebuild geometry, notify.
    ///
    /// Status runs first so a drive that starts this tick already owns
    /// `started_frame` when the lead gate reads it.
    pub fn update(&mut self) {
        self.sm.update();
        self.vehicle.sync(&self.sm, &mut self.calibration, &self.settings, self.ui_freq);
        self.update_status();
        self.update_scene();
        self.update_driver_pose();
        self.settings.refresh_live(&*self.params, &*self.params_memory, &self.vehicle);

        if self.sm.frame % u64::from(self.ui_freq) == 0 {
            debug!(
                "frame {} status {:?} started {} calibrated {}",
                self.sm.frame, self.status.status, self.vehicle.started, self.calibration.calibration_valid
            );
        }
        let _ = self.events.send(UiEvent::SceneUpdated(Arc::new(self.snapshot())));
    }

    /// Reprojected every tick: calibration, frame space and road style can
    /// all change without a new model. Radar counts only once received
    /// after the current drive started.
    fn update_scene(&mut self) {
        let Some(model) = self.sm.model_v2() else {
            return;
        };
        let view = SceneView::new(&self.calibration, &self.frame_space);
        let style = self.settings.road_style(&self.vehicle);
        let no_plan = UiPlan::default();
        let plan = self.sm.ui_plan().unwrap_or(&no_plan);
        let radar_this_drive = self.sm.rcv_frame(Topic::RadarState) > self.status.started_frame;
        let radar = self.sm.radar_state().filter(|_| radar_this_drive);

        self.scene.update_model(&view, model, plan, radar, &style);
        match radar {
            Some(radar) => self.scene.update_leads(&view, radar, &model.position),
            None => self.scene.lead_vertices = [None, None],
        }
    }

    /// Wide camera only when configured and not disabled by the user.
    fn apply_camera_choice(&mut self) {
        let wide = self.wide_cam_requested && !self.settings.wide_camera_disabled;
        if wide == self.frame_space.wide_cam {
            return;
        }
        self.frame_space.wide_cam = wide;
        self.frame_space.car_space_transform = ScreenTransform::centered(
            self.frame_space.fb_w,
            self.frame_space.fb_h,
            self.zoom,
            geometry::intrinsics(wide),
        );
        info!("Wide camera {}", if wide { "on" } else { "off" });
    }

    fn update_driver_pose(&mut self) {
        self.driver_pose.update_fade(self.vehicle.dm_active);
        if let Some(ds) = self.sm.driver_state_v2() {
            let data = if self.vehicle.is_rhd { &ds.right_driver_data } else { &ds.left_driver_data };
            self.driver_pose.update(&data.face_orientation);
        }
    }

    fn update_status(&mut self) {
        let controls = if self.sm.updated(Topic::ControlsState) { self.sm.controls_state() } else { None };
        let transition = self.status.update(
            self.sm.frame,
            self.vehicle.started,
            controls,
            self.vehicle.always_on_lateral_active,
        );
        if let Some(t) = transition {
            self.settings.load(&*self.params);
            self.apply_camera_choice();
            let _ = self.events.send(UiEvent::OffroadTransition { offroad: t.offroad });
        }
    }

    pub fn prime_type(&self) -> PrimeType {
        self.prime_type
    }

    /// Persist a new tier; `PrimeChanged` only fires when `has_prime` flips.
    pub fn set_prime_type(&mut self, prime_type: PrimeType) {
        if prime_type == self.prime_type {
            return;
        }
        let had_prime = self.prime_type.has_prime();
        self.prime_type = prime_type;
        if let Err(e) = self.params.put("PrimeType", &prime_type.as_i32().to_string()) {
            warn!("Failed to persist PrimeType: {e}");
        }
        info!("Prime type → {prime_type:?}");
        let _ = self.events.send(UiEvent::PrimeTypeChanged(prime_type));

        let has_prime = prime_type.has_prime();
        if had_prime != has_prime {
            let _ = self.events.send(UiEvent::PrimeChanged(has_prime));
        }
    }

    pub fn device_inputs(&self) -> DeviceInputs {
        DeviceInputs {
            started: self.vehicle.started,
            ignition: self.vehicle.ignition,
            light_sensor: self.vehicle.light_sensor,
            screen_brightness: self.settings.screen_brightness,
        }
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            frame: self.sm.frame,
            status: self.status.status,
            started: self.vehicle.started,
            started_frame: self.status.started_frame,
            calibration_valid: self.calibration.calibration_valid,
            calibration_wide_valid: self.calibration.calibration_wide_valid,
            wide_cam: self.frame_space.wide_cam,
            geometry: self.scene.clone(),
            driver_pose: self.driver_pose.clone(),
            vehicle: self.vehicle.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;
    use crate::params::{seed_defaults, MemoryParams};
    use crate::sub_master::NullSource;
    use telemetry_types::{
        DeviceState, DriverData, DriverMonitoringState, DriverStateV2, LeadData, Message, ModelV2, PandaState,
        PandaStates, PandaType, RadarState, Trajectory, TRAJECTORY_SIZE,
    };

    fn ui() -> (UiState, tokio::sync::broadcast::Receiver<UiEvent>, Arc<MemoryParams>) {
        let params = Arc::new(MemoryParams::new());
        seed_defaults(&*params).unwrap();
        let (tx, rx) = events::channel(256);
        let config = UiConfig { fb_w: 1928.0, fb_h: 1208.0, zoom: 1.0, ..UiConfig::default() };
        let state = UiState::new(Box::new(NullSource), params.clone(), Arc::new(MemoryParams::new()), tx, &config);
        (state, rx, params)
    }

    fn model() -> ModelV2 {
        let line = |y: f32| Trajectory::straight(TRAJECTORY_SIZE, 0.0, 3.0, y, 1.2);
        ModelV2 {
            position: Trajectory::straight(TRAJECTORY_SIZE, 0.0, 3.0, 0.0, 0.0),
            lane_lines: vec![line(-5.4), line(-1.8), line(1.8), line(5.4), line(-3.6), line(3.6)],
            lane_line_probs: vec![0.5; 4],
            road_edges: vec![line(-7.0), line(7.0)],
            road_edge_stds: vec![0.2; 2],
        }
    }

    fn lead_at(d_rel: f32) -> Message {
        Message::RadarState(RadarState {
            lead_one: LeadData { d_rel, y_rel: 0.0, v_rel: 0.0, status: true },
            ..RadarState::default()
        })
    }

    fn onroad(started: bool) -> Vec<Message> {
        vec![
            Message::PandaStates(PandaStates {
                pandas: vec![PandaState { panda_type: PandaType::Tres, ignition_line: true, ignition_can: false }],
            }),
            Message::DeviceState(DeviceState { started }),
        ]
    }

    fn tick(ui: &mut UiState, msgs: Vec<Message>) {
        for msg in msgs {
            ui.sm.push(msg);
        }
        ui.update();
    }

    #[test]
    fn test_scene_reprojected_without_new_messages() {
        let (mut ui, _rx, _) = ui();
        ui.update();
        assert!(ui.scene.track_vertices.is_empty());

        tick(&mut ui, vec![Message::ModelV2(model())]);
        let before = ui.scene.track_vertices.points.clone();
        assert!(!before.is_empty());

        ui.frame_space.car_space_transform.dx += 20.0;
        ui.update();
        let after = &ui.scene.track_vertices.points;
        assert_eq!(after.len(), before.len());
        assert!(after.iter().zip(&before).all(|(a, b)| (a.x - b.x - 20.0).abs() < 1e-3 && a.y == b.y));
    }

    #[test]
    fn test_radar_from_previous_drive_ignored() {
        let (mut ui, _rx, _) = ui();
        ui.update();

        // drive 1: radar on the start tick itself does not count yet
        let mut msgs = onroad(true);
        msgs.extend([Message::ModelV2(model()), lead_at(20.0)]);
        tick(&mut ui, msgs);
        assert_eq!(ui.status.started_frame, 2);
        assert!(ui.scene.lead_vertices[0].is_none());

        tick(&mut ui, vec![lead_at(20.0)]);
        assert!(ui.scene.lead_vertices[0].is_some());
        assert_eq!(ui.scene.max_distance, 30.0);

        // offroad, then drive 2 with only a model so far
        tick(&mut ui, onroad(false));
        let mut msgs = onroad(true);
        msgs.push(Message::ModelV2(model()));
        tick(&mut ui, msgs);
        assert_eq!(ui.status.started_frame, 5);
        assert!(ui.scene.lead_vertices.iter().all(Option::is_none));
        assert!(ui.scene.max_distance > 30.0);

        tick(&mut ui, vec![lead_at(20.0)]);
        assert!(ui.scene.lead_vertices[0].is_some());
    }

    #[test]
    fn test_wide_camera_toggle_vetoes_config() {
        let build = |disabled: bool| {
            let params = Arc::new(MemoryParams::new());
            seed_defaults(&*params).unwrap();
            params.put_bool("WideCameraDisable", disabled).unwrap();
            let (tx, _rx) = events::channel(16);
            let config = UiConfig { wide_cam: true, ..UiConfig::default() };
            UiState::new(Box::new(NullSource), params, Arc::new(MemoryParams::new()), tx, &config)
        };
        let wide = build(false);
        assert!(wide.frame_space.wide_cam);
        let narrow = build(true);
        assert!(!narrow.frame_space.wide_cam);
        assert_ne!(wide.frame_space.car_space_transform, narrow.frame_space.car_space_transform);
    }

    #[test]
    fn test_first_tick_announces_offroad() {
        let (mut ui, mut rx, _) = ui();
        ui.update();
        let mut offroad = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if let UiEvent::OffroadTransition { offroad: o } = ev {
                offroad.push(o);
            }
        }
        assert_eq!(offroad, vec![true]);
    }

    #[test]
    fn test_driver_pose_follows_rhd_side() {
        let (mut ui, _rx, _) = ui();
        ui.sm.push(Message::DriverMonitoringState(DriverMonitoringState { is_rhd: true, is_active_mode: true }));
        ui.sm.push(Message::DriverStateV2(DriverStateV2 {
            left_driver_data: DriverData { face_orientation: vec![0.0, 0.0, 0.0], face_prob: 1.0 },
            right_driver_data: DriverData { face_orientation: vec![0.0, 0.5, 0.0], face_prob: 1.0 },
        }));
        ui.update();
        assert!((ui.driver_pose.vals[1] - 0.8 * 0.2).abs() < 1e-6);
        assert!((ui.driver_pose.fade_state - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_prime_changed_only_on_predicate_flip() {
        let (mut ui, mut rx, params) = ui();
        ui.set_prime_type(PrimeType::None);
        ui.set_prime_type(PrimeType::Magenta);
        ui.set_prime_type(PrimeType::Purple);
        ui.set_prime_type(PrimeType::Purple);

        let mut tiers = Vec::new();
        let mut flips = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            match ev {
                UiEvent::PrimeTypeChanged(t) => tiers.push(t),
                UiEvent::PrimeChanged(p) => flips.push(p),
                _ => {}
            }
        }
        assert_eq!(tiers, vec![PrimeType::None, PrimeType::Magenta, PrimeType::Purple]);
        assert_eq!(flips, vec![true]);
        assert_eq!(params.get_int("PrimeType"), 5);
    }

    #[test]
    fn test_device_inputs_reflect_settings() {
        let (ui, _rx, _) = ui();
        assert_eq!(ui.device_inputs().screen_brightness, 101);
        assert!(!ui.device_inputs().started);
    }
}
