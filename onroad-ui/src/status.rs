//! status.rs — engagement status shown by the border colour
//!
//! `update()` runs once per tick and reports the one edge callers must act on.

use serde::Serialize;
use telemetry_types::{ControlsState, OpenpilotState};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SceneStatus {
    #[default]
    Disengaged,
    Engaged,
    Override,
    LateralActive,
}

/// Emitted by [`StatusMachine::update`] on a start/stop edge or the first tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffroadTransition {
    pub offroad: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusMachine {
    pub status: SceneStatus,
    /// Frame at which the current drive started
    pub started_frame: u64,
    started_prev: bool,
}

impl StatusMachine {
    /// `controls` is `Some` only when controlsState is fresh this frame.
    pub fn update(
        &mut self,
        frame: u64,
        started: bool,
        controls: Option<&ControlsState>,
        always_on_lateral_active: bool,
    ) -> Option<OffroadTransition> {
        if started {
            if let Some(cs) = controls {
                self.status = match cs.state {
                    OpenpilotState::PreEnabled | OpenpilotState::Overriding => SceneStatus::Override,
                    _ if always_on_lateral_active => SceneStatus::LateralActive,
                    _ if cs.enabled => SceneStatus::Engaged,
                    _ => SceneStatus::Disengaged,
                };
            }
        }

        if started == self.started_prev && frame != 1 {
            return None;
        }
        self.status = SceneStatus::Disengaged;
        if started {
            self.started_frame = frame;
        }
        self.started_prev = started;
        info!("{} at frame {frame}", if started { "Onroad" } else { "Offroad" });
        Some(OffroadTransition { offroad: !started })
    }
}
