//! driver_pose.rs — smoothed driver head pose for the monitoring overlay
//!
//! Each tick the raw face orientation is scaled per axis, low-passed, turned
//! into a rotation and applied to a fixed face outline. As the fade state goes
//! to 1 the rotation relaxes to identity and the outline sinks to the backdrop
//! depth.

use serde::Serialize;

use crate::geometry::{Mat3, Vec3};

/// Weight of the new target in the exponential blend
const POSE_BLEND: f32 = 0.8;
/// Depth the outline fades back to
const BACKDROP_DEPTH: f32 = 8.0;

/// Face outline in the overlay's own frame
pub const DEFAULT_FACE_KPTS_3D: [Vec3; 30] = [
    Vec3::new(-5.98, -51.20, 8.00), Vec3::new(-17.64, -49.14, 8.00), Vec3::new(-23.81, -46.40, 8.00),
    Vec3::new(-29.98, -40.91, 8.00), Vec3::new(-32.04, -37.49, 8.00), Vec3::new(-34.10, -32.00, 8.00),
    Vec3::new(-36.16, -21.03, 8.00), Vec3::new(-36.16, 6.40, 8.00), Vec3::new(-35.47, 10.51, 8.00),
    Vec3::new(-32.73, 19.43, 8.00), Vec3::new(-29.30, 26.29, 8.00), Vec3::new(-24.50, 33.83, 8.00),
    Vec3::new(-19.01, 39.31, 8.00), Vec3::new(-11.80, 42.74, 8.00), Vec3::new(-5.98, 43.43, 8.00),
    Vec3::new(5.98, 43.43, 8.00), Vec3::new(11.80, 42.74, 8.00), Vec3::new(19.01, 39.31, 8.00),
    Vec3::new(24.50, 33.83, 8.00), Vec3::new(29.30, 26.29, 8.00), Vec3::new(32.73, 19.43, 8.00),
    Vec3::new(35.47, 10.51, 8.00), Vec3::new(36.16, 6.40, 8.00), Vec3::new(36.16, -21.03, 8.00),
    Vec3::new(34.10, -32.00, 8.00), Vec3::new(32.04, -37.49, 8.00), Vec3::new(29.98, -40.91, 8.00),
    Vec3::new(23.81, -46.40, 8.00), Vec3::new(17.64, -49.14, 8.00), Vec3::new(5.98, -51.20, 8.00),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverPoseState {
    pub vals: [f32; 3],
    /// |previous filtered value − new target| per axis
    pub diff: [f32; 3],
    pub sins: [f32; 3],
    pub coss: [f32; 3],
    pub face_kpts_draw: [Vec3; 30],
    /// 0 = overlay fully shown, 1 = faded out
    pub fade_state: f32,
}

impl Default for DriverPoseState {
    fn default() -> Self {
        Self {
            vals: [0.0; 3],
            diff: [0.0; 3],
            sins: [0.0; 3],
            coss: [1.0; 3],
            face_kpts_draw: DEFAULT_FACE_KPTS_3D,
            fade_state: 1.0,
        }
    }
}

/// Axis 0 (pitch) is damped harder looking down than up; the rest share 0.4.
fn axis_gain(axis: usize, raw: f32) -> f32 {
    match axis {
        0 if raw < 0.0 => 0.7,
        0 => 0.9,
        _ => 0.4,
    }
}

impl DriverPoseState {
    /// Advance the fade toward shown while monitoring is active, hidden otherwise.
    pub fn update_fade(&mut self, active: bool) {
        let target = if active { 1.0 } else { 0.0 };
        self.fade_state = (self.fade_state + 0.2 * (0.5 - target)).clamp(0.0, 1.0);
    }

    /// One filter step. `orientation` shorter than 3 leaves the filtered
    /// angles untouched; the outline is still rebuilt for the current fade.
    pub fn update(&mut self, orientation: &[f32]) {
        if let [a, b, c, ..] = *orientation {
            for (i, raw) in [a, b, c].into_iter().enumerate() {
                let target = axis_gain(i, raw) * raw;
                self.diff[i] = (self.vals[i] - target).abs();
                self.vals[i] = POSE_BLEND * target + (1.0 - POSE_BLEND) * self.vals[i];
            }
        }

        let keep = 1.0 - self.fade_state;
        for i in 0..3 {
            let (s, c) = (self.vals[i] * keep).sin_cos();
            self.sins[i] = s;
            self.coss[i] = c;
        }

        let r = self.rotation();
        for (draw, kpt) in self.face_kpts_draw.iter_mut().zip(DEFAULT_FACE_KPTS_3D.iter()) {
            let k = r.mul_vec(*kpt);
            *draw = Vec3::new(k.x, k.y, k.z * keep + BACKDROP_DEPTH * self.fade_state);
        }
    }

    fn rotation(&self) -> Mat3 {
        let (s, c) = (&self.sins, &self.coss);
        Mat3([
            [c[1] * c[2], c[1] * s[2], -s[1]],
            [
                -s[0] * s[1] * c[2] - c[0] * s[2],
                -s[0] * s[1] * s[2] + c[0] * c[2],
                -s[0] * c[1],
            ],
            [
                c[0] * s[1] * c[2] - s[0] * s[2],
                c[0] * s[1] * s[2] + s[0] * c[2],
                c[0] * c[1],
            ],
        ])
    }
}
