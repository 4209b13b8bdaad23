//! SimVox demo - Main Entry Point
//!
//! Runs the dispatch runtime against the mock simulator and prints every
//! announcement and display refresh to stdout.
//!
//! ```text
//! simvox [catalog.json] [seconds]
//! ```

use anyhow::Context;
use simvox::{
    config::{self, AppConfig},
    dispatch::{CompositeGroup, CompositeProfile},
    runtime::{BridgeRuntime, RuntimeMessage},
    sim::{demo_variables, MockSimulator},
    types::format_value,
    ui::{ChannelAnnouncer, HeadlessSurface},
    StaticRegistry, UpdateDispatcher, VariableRegistry,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEMO_CATALOG: &str = include_str!("../assets/a32nx_demo.json");
const DEFAULT_DEMO_SECS: u64 = 60;
const SIMULATOR_RATE_HZ: u32 = 60;

fn init_logging(config: &AppConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));

    let (file_layer, guard) = if config.logging.log_to_file {
        let dir = config::ensure_app_data_dir()?.join(config::LOG_DIR);
        let appender = tracing_appender::rolling::daily(dir, "simvox.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

fn demo_profile() -> CompositeProfile {
    CompositeProfile::new("A32NX").with_group(CompositeGroup::new(
        "wind",
        ["AMBIENT_WIND_DIRECTION", "AMBIENT_WIND_VELOCITY"],
        |v| format!("Wind {} at {} knots", format_value(v[0]), format_value(v[1])),
    ))
}

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_or_default();
    let _log_guard = init_logging(&config)?;

    tracing::info!("Starting SimVox demo");

    let mut args = std::env::args().skip(1);
    let registry = match args.next() {
        Some(path) => StaticRegistry::load(&path)
            .with_context(|| format!("Failed to load catalog {}", path))?,
        None => StaticRegistry::from_json_str(DEMO_CATALOG)?,
    };
    let run_for = args
        .next()
        .map(|s| s.parse::<u64>())
        .transpose()
        .context("Run time must be a number of seconds")?
        .map_or(Duration::from_secs(DEFAULT_DEMO_SECS), Duration::from_secs);

    let registry: Arc<dyn VariableRegistry> = Arc::new(registry);
    let first_panel = registry.panels().into_iter().next();

    let (announcer, speech) = ChannelAnnouncer::new();
    let dispatcher = UpdateDispatcher::new(
        &config,
        registry,
        Box::new(announcer),
        Box::new(HeadlessSurface),
    )
    .with_profile(Box::new(demo_profile()));

    let (runtime, bridge) = BridgeRuntime::new(config, dispatcher);
    let (simulator, requester) = MockSimulator::new(runtime.sink(), SIMULATOR_RATE_HZ);
    let simulator = simulator.with_variables(demo_variables());
    let simulator_stop = simulator.stop_handle();
    let runtime = runtime.with_requester(Box::new(requester));

    let runtime_handle = std::thread::Builder::new()
        .name("simvox-runtime".into())
        .spawn(move || runtime.run())?;
    let simulator_handle = std::thread::Builder::new()
        .name("mock-simulator".into())
        .spawn(move || simulator.run())?;

    bridge.connect();
    if let Some(panel) = first_panel {
        bridge.select_panel(panel.clone(), panel.clone());
        bridge.refresh_display(panel);
    }

    let deadline = Instant::now() + run_for;
    'demo: while Instant::now() < deadline {
        for announcement in speech.drain() {
            println!("[{:?}] {}", announcement.mode, announcement.text);
        }
        for msg in bridge.drain() {
            match msg {
                RuntimeMessage::DisplayText { panel, text, .. } => {
                    println!("--- {} ---\n{}", panel, text);
                }
                RuntimeMessage::Health(health) => {
                    tracing::info!(
                        "Queue {}/{} ({} dropped, {} batches){}",
                        health.queue.queued_count,
                        health.queue.capacity,
                        health.queue.dropped_count,
                        health.queue.processed_batches,
                        if health.underrun { " underrun" } else { "" }
                    );
                }
                RuntimeMessage::ConnectionStatus(status) => tracing::info!("{}", status),
                RuntimeMessage::PanelRebuilt(panel) => tracing::debug!("Panel {} ready", panel),
                RuntimeMessage::Shutdown => break 'demo,
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    tracing::info!("Shutting down...");
    simulator_stop.store(false, Ordering::SeqCst);
    bridge.disconnect();
    bridge.shutdown();

    simulator_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Mock simulator thread panicked"))?;
    runtime_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Runtime thread panicked"))?;

    Ok(())
}
