//! main.rs — onroad UI state engine entry point
//!
//! Runs up to three concurrent tasks:
//!   1. Tick loop: one `App::tick()` per UI frame
//!   2. Event logger: drains the notification channel
//!   3. Demo feed (`--demo`): steps the synthetic drive into the telemetry channel

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info, warn};

use onroad_ui::app::App;
use onroad_ui::config::AppConfig;
use onroad_ui::events::{self, UiEvent};
use onroad_ui::sub_master::ChannelSource;
use telemetry_sim::{scenarios, DriveSim};
use telemetry_types::Message;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "onroad-ui", about = "Onroad UI state engine")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
    /// Feed the engine from the synthetic drive
    #[arg(long)]
    demo: bool,
    /// Demo scenario (overrides [sim].scenario)
    #[arg(long)]
    scenario: Option<String>,
    /// Stop after this many ticks; 0 runs until Ctrl-C
    #[arg(long, default_value = "0")]
    ticks: u64,
}

// ── Tasks ─────────────────────────────────────────────────────────────────────

async fn demo_feed(mut sim: DriveSim, tx: mpsc::UnboundedSender<Message>, freq: u32) {
    let dt = 1.0 / f64::from(freq);
    let mut ticker = interval(Duration::from_secs_f64(dt));
    loop {
        ticker.tick().await;
        for msg in sim.step(dt) {
            if tx.send(msg).is_err() {
                debug!("Telemetry channel closed, demo feed stopping");
                return;
            }
        }
    }
}

async fn log_events(mut rx: broadcast::Receiver<UiEvent>) {
    loop {
        match rx.recv().await {
            Ok(UiEvent::SceneUpdated(snapshot)) => {
                debug!(
                    "scene frame {} status {:?} path {} pts lead {:?}",
                    snapshot.frame,
                    snapshot.status,
                    snapshot.geometry.track_vertices.len(),
                    snapshot.geometry.lead_vertices[0]
                );
            }
            Ok(UiEvent::OffroadTransition { offroad }) => info!("🛣  {}", if offroad { "Offroad" } else { "Onroad" }),
            Ok(UiEvent::InteractiveTimeout) => info!("⏲  Interactive timeout"),
            Ok(UiEvent::DisplayPowerChanged(on)) => info!("💡 Display {}", if on { "on" } else { "off" }),
            Ok(UiEvent::PrimeTypeChanged(t)) => info!("Prime type {t:?}"),
            Ok(UiEvent::PrimeChanged(p)) => info!("Prime {p}"),
            Err(broadcast::error::RecvError::Lagged(n)) => warn!("Event logger lagged by {n} events"),
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

async fn run_ticks(mut app: App, freq: u32, max_ticks: u64) {
    let mut ticker = interval(Duration::from_secs_f64(1.0 / f64::from(freq)));
    let mut ticks = 0u64;
    loop {
        ticker.tick().await;
        app.tick();
        ticks += 1;
        if max_ticks > 0 && ticks >= max_ticks {
            info!("Reached {max_ticks} ticks, stopping");
            return;
        }
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "onroad_ui=info,telemetry_sim=info".into()),
        )
        .init();

    let args = Args::parse();
    let cfg = AppConfig::load(&args.config)?;
    info!("🚦 Onroad UI starting");

    let (telemetry_tx, source) = ChannelSource::new();
    let (events_tx, events_rx) = events::channel(64);

    if args.demo {
        let name = args.scenario.as_deref().unwrap_or(&cfg.sim.scenario);
        let Some(scenario) = scenarios::from_name(name) else {
            bail!("unknown scenario {name:?} (known: {})", scenarios::SCENARIO_NAMES.join(", "));
        };
        info!("Demo drive, scenario {name}");
        tokio::spawn(demo_feed(DriveSim::new(scenario, cfg.sim.seed), telemetry_tx, cfg.ui.freq));
    } else {
        // no producer: every topic stays stale and the engine idles offroad
        drop(telemetry_tx);
    }

    tokio::spawn(log_events(events_rx));

    let app = App::from_config(&cfg, Box::new(source), events_tx);
    tokio::select! {
        _ = run_ticks(app, cfg.ui.freq, args.ticks) => {}
        _ = tokio::signal::ctrl_c() => info!("Ctrl-C, shutting down"),
    }
    Ok(())
}
