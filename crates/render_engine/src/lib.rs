//! # Render Engine
//!
//! A minimal real-time renderer built directly on Vulkan. The engine brings
//! up the instance, picks a physical device, creates the logical device and
//! queues, builds a swapchain with its render-target set, compiles shaders,
//! constructs one fixed graphics pipeline, and drives a per-frame
//! acquire/record/submit/present loop with single-in-flight CPU-GPU
//! synchronization.
//!
//! The interesting parts are the swapchain lifecycle and the frame-loop
//! state machine: presentable images are recreated wholesale whenever the
//! window resizes or the presentation engine reports the surface out of
//! date, and a fence/semaphore triple keeps a frame's commands from touching
//! anything a prior frame or the presentation engine still uses.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use render_engine::config::EngineConfig;
//! use render_engine::render::RenderEngine;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     render_engine::foundation::logging::init();
//!     let config = EngineConfig::load_or_default("engine.toml");
//!     let mut engine = RenderEngine::new(&config)?;
//!     engine.run(|vertices| {
//!         vertices.vertex(0.0, -0.5, 0.0, 1.0, 0.0, 0.0, 1.0);
//!         vertices.vertex(0.5, 0.5, 0.0, 0.0, 1.0, 0.0, 1.0);
//!         vertices.vertex(-0.5, 0.5, 0.0, 0.0, 0.0, 1.0, 1.0);
//!     })?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Asset and resource loading
pub mod assets;
/// Engine configuration
pub mod config;
/// Shared utilities
pub mod foundation;
/// The rendering subsystem
pub mod render;

pub use config::EngineConfig;
pub use render::RenderEngine;
pub use render::vulkan::{VulkanError, VulkanResult};
