//! scenarios.rs — injectable drive scenarios for the synthetic telemetry
//!
//! Each scenario exercises one behaviour of the UI state engine: an ignition
//! cycle for the wakefulness countdown, a close lead for path foreshortening,
//! a hill crest for band inversion, a silent hardware link for staleness.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioType {
    /// Ignition turns off mid-drive and stays off
    IgnitionCycle,
    /// Lead car oscillating between a few meters and a few car lengths
    CloseLead,
    /// Road climbs to a crest then drops away
    HillCrest,
    /// Calibration never converges
    Uncalibrated,
    /// Hardware link goes silent for a while
    PandaDropout,
    /// Lateral-only control: never fully engages
    AlwaysOnLateral,
    /// Driver sits on the right
    RightHandDrive,
    /// Dark cabin: light sensor near zero
    Night,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub active: Vec<ScenarioType>,
    /// Seconds after start that ignition comes on
    pub ignition_on_s: f64,
    /// Seconds after start that ignition goes off (IgnitionCycle)
    pub ignition_off_s: f64,
    /// Seconds after ignition that the driver engages
    pub engage_after_s: f64,
    /// Distance to the crest (HillCrest), meters
    pub crest_distance_m: f32,
    pub dropout_start_s: f64,
    pub dropout_duration_s: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            active: vec![],
            ignition_on_s: 1.0,
            ignition_off_s: 20.0,
            engage_after_s: 3.0,
            crest_distance_m: 40.0,
            dropout_start_s: 8.0,
            dropout_duration_s: 7.0,
        }
    }
}

impl ScenarioConfig {
    pub fn has(&self, s: ScenarioType) -> bool {
        self.active.contains(&s)
    }

    pub fn ignition_at(&self, t: f64) -> bool {
        t >= self.ignition_on_s && !(self.has(ScenarioType::IgnitionCycle) && t >= self.ignition_off_s)
    }

    pub fn panda_silent_at(&self, t: f64) -> bool {
        self.has(ScenarioType::PandaDropout)
            && t >= self.dropout_start_s
            && t < self.dropout_start_s + self.dropout_duration_s
    }
}

fn preset(active: Vec<ScenarioType>) -> ScenarioConfig {
    ScenarioConfig { active, ..Default::default() }
}

pub fn preset_ignition_cycle() -> ScenarioConfig {
    ScenarioConfig { ignition_off_s: 15.0, ..preset(vec![ScenarioType::IgnitionCycle]) }
}

pub fn preset_close_lead() -> ScenarioConfig {
    preset(vec![ScenarioType::CloseLead])
}

pub fn preset_hill_crest() -> ScenarioConfig {
    preset(vec![ScenarioType::HillCrest])
}

pub fn preset_panda_dropout() -> ScenarioConfig {
    preset(vec![ScenarioType::PandaDropout])
}

pub fn preset_night_rhd() -> ScenarioConfig {
    preset(vec![ScenarioType::Night, ScenarioType::RightHandDrive])
}

/// Scenario by CLI/config name; `None` for unknown names.
pub fn from_name(name: &str) -> Option<ScenarioConfig> {
    let cfg = match name {
        "default" => ScenarioConfig::default(),
        "ignition-cycle" => preset_ignition_cycle(),
        "close-lead" => preset_close_lead(),
        "hill-crest" => preset_hill_crest(),
        "uncalibrated" => preset(vec![ScenarioType::Uncalibrated]),
        "panda-dropout" => preset_panda_dropout(),
        "always-on-lateral" => preset(vec![ScenarioType::AlwaysOnLateral]),
        "night-rhd" => preset_night_rhd(),
        _ => return None,
    };
    Some(cfg)
}

pub const SCENARIO_NAMES: &[&str] = &[
    "default",
    "ignition-cycle",
    "close-lead",
    "hill-crest",
    "uncalibrated",
    "panda-dropout",
    "always-on-lateral",
    "night-rhd",
];
