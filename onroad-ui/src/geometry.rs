//! geometry.rs — 3×3 matrix kernel and perspective projection
//!
//! Pure math, no state. Everything the scene builder draws goes through
//! [`project`]: car-frame point → view frame (calibration rotation) →
//! camera intrinsics → perspective divide → car-space screen transform →
//! clip-region test.

use serde::Serialize;

// ── Types ─────────────────────────────────────────────────────────────────────

/// 3D vector (meters in the car frame, pixels·depth after intrinsics)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Row-major 3×3 matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Mat3(pub [[f32; 3]; 3]);

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    pub fn mul(&self, rhs: &Mat3) -> Mat3 {
        let (a, b) = (&self.0, &rhs.0);
        let mut out = [[0.0f32; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
            }
        }
        Mat3(out)
    }

    pub fn mul_vec(&self, v: Vec3) -> Vec3 {
        let m = &self.0;
        Vec3 {
            x: m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            y: m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            z: m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        }
    }
}

impl Default for Mat3 {
    fn default() -> Self {
        Mat3::IDENTITY
    }
}

/// Point in display space (pixels)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

// ── Rotations ─────────────────────────────────────────────────────────────────

/// Rotation from (roll, pitch, yaw) in radians: R = Rz(yaw) · Ry(pitch) · Rx(roll).
pub fn rotation_from_euler(roll: f32, pitch: f32, yaw: f32) -> Mat3 {
    let (sr, cr) = roll.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let (sy, cy) = yaw.sin_cos();

    let rx = Mat3([[1.0, 0.0, 0.0], [0.0, cr, -sr], [0.0, sr, cr]]);
    let ry = Mat3([[cp, 0.0, sp], [0.0, 1.0, 0.0], [-sp, 0.0, cp]]);
    let rz = Mat3([[cy, -sy, 0.0], [sy, cy, 0.0], [0.0, 0.0, 1.0]]);
    rz.mul(&ry).mul(&rx)
}

// ── Camera intrinsics ─────────────────────────────────────────────────────────

const FRAME_WIDTH_PX: f32 = 1928.0;
const FRAME_HEIGHT_PX: f32 = 1208.0;

/// Road (narrow) camera intrinsics
pub const FCAM_INTRINSIC_MATRIX: Mat3 = Mat3([
    [2648.0, 0.0, FRAME_WIDTH_PX / 2.0],
    [0.0, 2648.0, FRAME_HEIGHT_PX / 2.0],
    [0.0, 0.0, 1.0],
]);

/// Wide road camera intrinsics
pub const ECAM_INTRINSIC_MATRIX: Mat3 = Mat3([
    [567.0, 0.0, FRAME_WIDTH_PX / 2.0],
    [0.0, 567.0, FRAME_HEIGHT_PX / 2.0],
    [0.0, 0.0, 1.0],
]);

pub fn intrinsics(wide_cam: bool) -> &'static Mat3 {
    if wide_cam {
        &ECAM_INTRINSIC_MATRIX
    } else {
        &FCAM_INTRINSIC_MATRIX
    }
}

// ── Screen space ──────────────────────────────────────────────────────────────

/// Axis-aligned scale + translate applied after the perspective divide.
/// Supplied by the renderer (zoom and pan of the camera image in the widget).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenTransform {
    pub scale_x: f32,
    pub scale_y: f32,
    pub dx: f32,
    pub dy: f32,
}

impl ScreenTransform {
    pub const IDENTITY: ScreenTransform = ScreenTransform { scale_x: 1.0, scale_y: 1.0, dx: 0.0, dy: 0.0 };

    /// Centre the camera principal point in an `fb_w × fb_h` widget at `zoom`.
    pub fn centered(fb_w: f32, fb_h: f32, zoom: f32, intrinsics: &Mat3) -> Self {
        let (cx, cy) = (intrinsics.0[0][2], intrinsics.0[1][2]);
        Self {
            scale_x: zoom,
            scale_y: zoom,
            dx: fb_w / 2.0 - zoom * cx,
            dy: fb_h / 2.0 - zoom * cy,
        }
    }

    pub fn map(&self, x: f32, y: f32) -> ScreenPoint {
        ScreenPoint { x: self.scale_x * x + self.dx, y: self.scale_y * y + self.dy }
    }
}

impl Default for ScreenTransform {
    fn default() -> Self {
        ScreenTransform::IDENTITY
    }
}

/// Default margin (pixels) the clip region extends beyond the framebuffer.
pub const CLIP_MARGIN: f32 = 500.0;

/// Framebuffer bounds expanded by a margin on every side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClipRegion {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl ClipRegion {
    pub fn around_frame(fb_w: f32, fb_h: f32, margin: f32) -> Self {
        Self { left: -margin, top: -margin, right: fb_w + margin, bottom: fb_h + margin }
    }

    /// NaN and infinite coordinates are never contained.
    pub fn contains(&self, p: ScreenPoint) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }
}

// ── Projection ────────────────────────────────────────────────────────────────

/// Project a car-frame point to display space.
///
/// Returns `None` when the point lands outside `clip` (out of frame). A depth
/// near zero is not guarded: the resulting huge or non-finite coordinates are
/// rejected by the clip test.
pub fn project(
    view_from_calib: &Mat3,
    intrinsics: &Mat3,
    transform: &ScreenTransform,
    clip: &ClipRegion,
    pt: Vec3,
) -> Option<ScreenPoint> {
    let ep = view_from_calib.mul_vec(pt);
    let kep = intrinsics.mul_vec(ep);
    let point = transform.map(kep.x / kep.z, kep.y / kep.z);
    clip.contains(point).then_some(point)
}
