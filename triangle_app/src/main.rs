//! Triangle demo application
//!
//! Draws the classic RGB triangle until the window is closed, exercising the
//! full engine stack: device bring-up, runtime shader compilation, swapchain
//! recreation on resize, and the single-in-flight frame loop.

use render_engine::config::EngineConfig;
use render_engine::render::RenderEngine;

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::load_or_default("engine.toml");

    log::info!("Creating render engine...");
    let mut engine = RenderEngine::new(&config)?;

    engine.run(|vertices| {
        vertices.vertex(0.0, -0.5, 0.0, 1.0, 0.0, 0.0, 1.0);
        vertices.vertex(0.5, 0.5, 0.0, 0.0, 1.0, 0.0, 1.0);
        vertices.vertex(-0.5, 0.5, 0.0, 0.0, 0.0, 1.0, 1.0);
    })?;

    Ok(())
}

fn main() {
    render_engine::foundation::logging::init();

    if let Err(e) = run() {
        log::error!("Fatal: {}", e);
        std::process::exit(1);
    }
}
