//! band.rs — trajectory → closed screen-space band
//!
//! A band is the trajectory offset by ±`y_off` laterally and `z_off`
//! vertically, projected sample by sample. Left boundary runs forward, right
//! boundary runs back, so the point list is a closed polygon.

use serde::Serialize;
use telemetry_types::{Trajectory, TRAJECTORY_SIZE};

use crate::calibration::Project;
use crate::geometry::{ScreenPoint, Vec3};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScreenPolygon {
    pub points: Vec<ScreenPoint>,
}

impl ScreenPolygon {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Largest index `i ≥ 1` with every `x[1..=i] ≤ max_distance`; 0 if none.
pub fn path_length_idx(line: &Trajectory, max_distance: f32) -> usize {
    let n = line.x.len().min(TRAJECTORY_SIZE);
    let mut max_idx = 0;
    for i in 1..n {
        if line.x[i] > max_distance {
            break;
        }
        max_idx = i;
    }
    max_idx
}

/// Build the band polygon for samples `0..=max_idx`.
///
/// Samples behind the camera (`x < 0`) are skipped, as is any sample whose
/// left or right edge falls out of frame. With `allow_invert == false` a
/// sample whose left edge would sit lower on screen than the previous
/// accepted one is dropped, so wide bands don't fold over a hill crest.
pub fn build_band<P: Project>(
    view: &P,
    line: &Trajectory,
    y_off: f32,
    z_off: f32,
    max_idx: usize,
    allow_invert: bool,
) -> ScreenPolygon {
    let end = (max_idx + 1).min(line.len());
    let mut left_points: Vec<ScreenPoint> = Vec::with_capacity(end);
    let mut right_points: Vec<ScreenPoint> = Vec::with_capacity(end);

    for i in 0..end {
        let (x, y, z) = (line.x[i], line.y[i], line.z[i]);
        // highly negative x lands above the frame and flickers
        if x < 0.0 {
            continue;
        }
        let left = view.project(Vec3::new(x, y - y_off, z + z_off));
        let right = view.project(Vec3::new(x, y + y_off, z + z_off));
        let (Some(left), Some(right)) = (left, right) else {
            continue;
        };
        if !allow_invert {
            if let Some(prev) = left_points.last() {
                if left.y > prev.y {
                    continue;
                }
            }
        }
        left_points.push(left);
        right_points.push(right);
    }

    right_points.reverse();
    left_points.extend(right_points);
    ScreenPolygon { points: left_points }
}
