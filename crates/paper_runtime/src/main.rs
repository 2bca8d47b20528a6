//! Paper Engine Runtime
//!
//! Boots a scene from a settings file, loads its JavaScript game logic and
//! ticks the scripts for a fixed number of steps.
//!
//! Usage: `paper [settings.json]`

mod settings;

use anyhow::{Context, Result};
use paper_core::time::SimulationTime;
use paper_script::components::register_builtin_components;
use paper_script::runtime::ScriptRuntime;
use settings::Settings;
use std::path::PathBuf;
use std::rc::Rc;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Paper Engine v{}", paper_core::VERSION);

    let settings = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => Settings::load(&path)?,
        None => {
            tracing::info!("No settings file given, using defaults");
            Settings::default()
        }
    };

    register_builtin_components();
    settings.register_components()?;

    let mut engine = settings.build_engine()?;
    let runtime = Rc::new(ScriptRuntime::new()?);
    runtime.bind_host(engine.host().clone())?;

    if let Some(path) = &settings.script_file {
        runtime
            .execute_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
    }
    for class in settings.script_classes() {
        engine.register_class(runtime.script_class(class)?)?;
    }

    engine.on_runtime_start()?;

    let mut time = SimulationTime::with_rate(settings.simulation.tick_rate_hz);
    for _ in 0..settings.simulation.ticks {
        let dt = time.advance_tick();
        engine.on_update(dt);
    }

    engine.on_runtime_stop();
    tracing::info!(
        ticks = time.tick_count(),
        simulated = ?time.total_time(),
        "Simulation finished"
    );

    Ok(())
}
