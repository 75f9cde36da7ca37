//! scene.rs — per-tick rebuild of the drawable road scene
//!
//! Lane lines, road edges, the driving path and its edge, the adjacent-lane
//! bands and the lead markers, all in display space.

use serde::Serialize;
use telemetry_types::{ModelV2, RadarState, Trajectory, UiPlan, TRAJECTORY_SIZE};

use crate::band::{build_band, path_length_idx, ScreenPolygon};
use crate::calibration::Project;
use crate::geometry::{ScreenPoint, Vec3};

pub const LANE_LINE_COUNT: usize = 4;
pub const ROAD_EDGE_COUNT: usize = 2;

/// Closest / farthest the path is drawn unless unlimited length is on (meters)
pub const MIN_DRAW_DISTANCE: f32 = 10.0;
pub const MAX_DRAW_DISTANCE: f32 = 100.0;

/// Camera height above the road, used to drop the path onto the road surface
pub const PATH_Z_OFFSET: f32 = 1.22;

const DEFAULT_LINE_WIDTH: f32 = 0.025;
const DEFAULT_PATH_HALF_WIDTH: f32 = 0.9;

/// Band widths and overlay toggles for one rebuild. Built from the settings
/// snapshot plus the latest lateral-plan lane widths.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RoadStyle {
    pub custom_road_ui: bool,
    pub unlimited_length: bool,
    pub lane_line_width: f32,
    pub road_edge_width: f32,
    pub path_width: f32,
    /// Percent of `path_width` taken by the path edge
    pub path_edge_width: f32,
    pub adjacent_lanes: bool,
    pub lane_width_left: f32,
    pub lane_width_right: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SceneGeometry {
    pub lane_line_vertices: [ScreenPolygon; LANE_LINE_COUNT],
    pub lane_line_probs: [f32; LANE_LINE_COUNT],
    pub road_edge_vertices: [ScreenPolygon; ROAD_EDGE_COUNT],
    pub road_edge_stds: [f32; ROAD_EDGE_COUNT],
    pub track_vertices: ScreenPolygon,
    pub track_edge_vertices: ScreenPolygon,
    pub track_left_adjacent_lane_vertices: ScreenPolygon,
    pub track_right_adjacent_lane_vertices: ScreenPolygon,
    /// Lead one and lead two; `None` unless tracked and in frame
    pub lead_vertices: [Option<ScreenPoint>; 2],
    /// Forward distance the path was drawn to on the last rebuild (meters)
    pub max_distance: f32,
}

static NO_LINE: Trajectory = Trajectory { x: Vec::new(), y: Vec::new(), z: Vec::new() };

fn line_or_empty(lines: &[Trajectory], i: usize) -> &Trajectory {
    lines.get(i).unwrap_or(&NO_LINE)
}

/// Plan trajectory when it covers the full horizon, else the model's own.
fn choose_path<'a>(model: &'a ModelV2, plan: &'a UiPlan) -> &'a Trajectory {
    if plan.position.len() < TRAJECTORY_SIZE {
        &model.position
    } else {
        &plan.position
    }
}

/// Shorten the draw distance near a close lead so the path stops before it.
pub fn lead_clamped_distance(d_rel: f32, max_distance: f32) -> f32 {
    let lead_d = d_rel * 2.0;
    (lead_d - (lead_d * 0.35).min(10.0)).clamp(0.0, max_distance.max(0.0))
}

impl SceneGeometry {
    /// Rebuild every band from the latest model, plan and radar snapshots.
    pub fn update_model<P: Project>(
        &mut self,
        view: &P,
        model: &ModelV2,
        plan: &UiPlan,
        radar: Option<&RadarState>,
        style: &RoadStyle,
    ) {
        let path = choose_path(model, plan);
        let terminal_x = path.x.get(TRAJECTORY_SIZE - 1).or(path.x.last()).copied().unwrap_or(0.0);
        let mut max_distance = if style.unlimited_length {
            terminal_x
        } else {
            terminal_x.clamp(MIN_DRAW_DISTANCE, MAX_DRAW_DISTANCE)
        };

        // lane lines
        let lane_line = |i: usize| line_or_empty(&model.lane_lines, i);
        let max_idx = path_length_idx(lane_line(0), max_distance);
        for i in 0..LANE_LINE_COUNT {
            let prob = model.lane_line_probs.get(i).copied().unwrap_or(0.0);
            self.lane_line_probs[i] = prob;
            let width = if style.custom_road_ui { style.lane_line_width * prob } else { DEFAULT_LINE_WIDTH * prob };
            self.lane_line_vertices[i] = build_band(view, lane_line(i), width, 0.0, max_idx, true);
        }

        // road edges
        for i in 0..ROAD_EDGE_COUNT {
            self.road_edge_stds[i] = model.road_edge_stds.get(i).copied().unwrap_or(0.0);
            let edge = line_or_empty(&model.road_edges, i);
            let width = if style.custom_road_ui { style.road_edge_width } else { DEFAULT_LINE_WIDTH };
            self.road_edge_vertices[i] = build_band(view, edge, width, 0.0, max_idx, true);
        }

        // path
        if let Some(lead_one) = radar.map(|r| &r.lead_one).filter(|l| l.status) {
            max_distance = lead_clamped_distance(lead_one.d_rel, max_distance);
        }
        self.max_distance = max_distance;
        let max_idx = path_length_idx(path, max_distance);
        let path_half_width = if style.custom_road_ui {
            style.path_width * (1.0 - style.path_edge_width / 100.0)
        } else {
            DEFAULT_PATH_HALF_WIDTH
        };
        self.track_vertices = build_band(view, path, path_half_width, PATH_Z_OFFSET, max_idx, false);

        // path edges
        let edge_width = if style.custom_road_ui { style.path_width } else { 0.0 };
        self.track_edge_vertices = build_band(view, path, edge_width, PATH_Z_OFFSET, max_idx, false);

        // adjacent lanes
        let (left_w, right_w) = if style.adjacent_lanes {
            (style.lane_width_left / 2.0, style.lane_width_right / 2.0)
        } else {
            (0.0, 0.0)
        };
        self.track_left_adjacent_lane_vertices = build_band(view, lane_line(4), left_w, 0.0, max_idx, true);
        self.track_right_adjacent_lane_vertices = build_band(view, lane_line(5), right_w, 0.0, max_idx, true);
    }

    /// Place a marker under each tracked lead, at the road height the model
    /// predicts at the lead's distance.
    pub fn update_leads<P: Project>(&mut self, view: &P, radar: &RadarState, line: &Trajectory) {
        for (i, lead) in [&radar.lead_one, &radar.lead_two].into_iter().enumerate() {
            self.lead_vertices[i] = if lead.status {
                let idx = path_length_idx(line, lead.d_rel);
                let z = line.z.get(idx).copied().unwrap_or(0.0);
                view.project(Vec3::new(lead.d_rel, -lead.y_rel, z + PATH_Z_OFFSET))
            } else {
                None
            };
        }
    }
}
