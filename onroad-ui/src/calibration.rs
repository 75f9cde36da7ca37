//! calibration.rs — view transforms for the road and wide cameras
//!
//! Rebuilt only when a `liveCalibration` message arrives; every projection in
//! between reads the stored matrices.

use serde::Serialize;
use telemetry_types::{CalStatus, LiveCalibration};
use tracing::{info, warn};

use crate::geometry::{self, rotation_from_euler, ClipRegion, Mat3, ScreenPoint, ScreenTransform, Vec3};

/// Device frame (X fwd, Y right, Z down) → camera view frame (X right, Y down, Z fwd).
pub const VIEW_FROM_DEVICE: Mat3 = Mat3([[0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]]);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationFrame {
    pub view_from_calib: Mat3,
    pub view_from_wide_calib: Mat3,
    pub calibration_valid: bool,
    pub calibration_wide_valid: bool,
}

impl Default for CalibrationFrame {
    fn default() -> Self {
        Self {
            view_from_calib: VIEW_FROM_DEVICE,
            view_from_wide_calib: VIEW_FROM_DEVICE,
            calibration_valid: false,
            calibration_wide_valid: false,
        }
    }
}

fn euler3(v: &[f32]) -> Option<Mat3> {
    match v {
        [roll, pitch, yaw] => Some(rotation_from_euler(*roll, *pitch, *yaw)),
        _ => None,
    }
}

impl CalibrationFrame {
    /// Rebuild both view transforms from a calibration message.
    ///
    /// A malformed `rpy_calib` leaves both transforms as they were and marks
    /// the calibration invalid. A malformed wide Euler vector leaves only the
    /// wide transform as it was and clears `calibration_wide_valid`.
    pub fn apply(&mut self, msg: &LiveCalibration) {
        let was_valid = self.calibration_valid;
        let wide_from_device = euler3(&msg.wide_from_device_euler);

        match euler3(&msg.rpy_calib) {
            Some(device_from_calib) => {
                self.view_from_calib = VIEW_FROM_DEVICE.mul(&device_from_calib);
                if let Some(wide_from_device) = wide_from_device {
                    self.view_from_wide_calib =
                        VIEW_FROM_DEVICE.mul(&wide_from_device).mul(&device_from_calib);
                }
                self.calibration_valid = msg.cal_status == CalStatus::Calibrated;
            }
            None => {
                warn!("liveCalibration: rpyCalib has {} entries, expected 3", msg.rpy_calib.len());
                self.calibration_valid = false;
            }
        }
        self.calibration_wide_valid = wide_from_device.is_some();

        if was_valid != self.calibration_valid {
            info!("Calibration valid: {was_valid} → {}", self.calibration_valid);
        }
    }

    pub fn view(&self, wide_cam: bool) -> &Mat3 {
        if wide_cam {
            &self.view_from_wide_calib
        } else {
            &self.view_from_calib
        }
    }
}

// ── Scene view ────────────────────────────────────────────────────────────────

/// Anything that can map a car-frame point into display space.
pub trait Project {
    /// `None` means out of frame.
    fn project(&self, pt: Vec3) -> Option<ScreenPoint>;
}

/// Framebuffer size and renderer transform, owned by the UI state and set by
/// whoever paints the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameSpace {
    pub fb_w: f32,
    pub fb_h: f32,
    pub clip_margin: f32,
    pub car_space_transform: ScreenTransform,
    pub wide_cam: bool,
}

impl Default for FrameSpace {
    fn default() -> Self {
        Self {
            fb_w: 2160.0,
            fb_h: 1080.0,
            clip_margin: geometry::CLIP_MARGIN,
            car_space_transform: ScreenTransform::IDENTITY,
            wide_cam: false,
        }
    }
}

/// Calibration + frame space borrowed for one scene rebuild.
pub struct SceneView<'a> {
    calibration: &'a CalibrationFrame,
    frame: &'a FrameSpace,
    clip: ClipRegion,
}

impl<'a> SceneView<'a> {
    pub fn new(calibration: &'a CalibrationFrame, frame: &'a FrameSpace) -> Self {
        let clip = ClipRegion::around_frame(frame.fb_w, frame.fb_h, frame.clip_margin);
        Self { calibration, frame, clip }
    }
}

impl Project for SceneView<'_> {
    fn project(&self, pt: Vec3) -> Option<ScreenPoint> {
        let wide = self.frame.wide_cam;
        geometry::project(
            self.calibration.view(wide),
            geometry::intrinsics(wide),
            &self.frame.car_space_transform,
            &self.clip,
            pt,
        )
    }
}
