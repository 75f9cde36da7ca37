//! # onroad-ui
//!
//! State engine behind the onroad driving view: projects the model's road
//! geometry into display space, tracks engagement status, and drives display
//! wakefulness and backlight.
//!
//! One [`app::App`] is built per process and ticked at a fixed rate:
//!
//! 1. [`sub_master`] absorbs whatever telemetry arrived since the last tick
//! 2. [`sync`] refreshes the fields of each fresh topic (and the calibration)
//! 3. [`scene`] rebuilds the road polygons and lead markers via [`band`]
//! 4. [`driver_pose`] filters the driver's head pose
//! 5. [`status`] derives the engagement status and onroad/offroad edges
//! 6. [`device`] updates wakefulness and the backlight
//!
//! Notifications go out on a broadcast channel ([`events`]).

pub mod app;
pub mod band;
pub mod calibration;
pub mod config;
pub mod device;
pub mod driver_pose;
pub mod events;
pub mod geometry;
pub mod hardware;
pub mod params;
pub mod scene;
pub mod settings;
pub mod status;
pub mod sub_master;
pub mod sync;
pub mod ui_state;
