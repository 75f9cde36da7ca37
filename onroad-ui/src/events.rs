//! events.rs — outbound notifications fanned out to renderers and observers

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::driver_pose::DriverPoseState;
use crate::scene::SceneGeometry;
use crate::settings::PrimeType;
use crate::status::SceneStatus;
use crate::sync::VehicleState;

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct SceneSnapshot {
    pub frame: u64,
    pub status: SceneStatus,
    pub started: bool,
    pub started_frame: u64,
    pub calibration_valid: bool,
    pub calibration_wide_valid: bool,
    pub wide_cam: bool,
    pub geometry: SceneGeometry,
    pub driver_pose: DriverPoseState,
    pub vehicle: VehicleState,
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    OffroadTransition { offroad: bool },
    SceneUpdated(Arc<SceneSnapshot>),
    InteractiveTimeout,
    DisplayPowerChanged(bool),
    PrimeTypeChanged(PrimeType),
    PrimeChanged(bool),
}

pub type EventTx = broadcast::Sender<UiEvent>;

pub fn channel(capacity: usize) -> (EventTx, broadcast::Receiver<UiEvent>) {
    broadcast::channel(capacity)
}
