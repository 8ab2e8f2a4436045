//! Rendering subsystem
//!
//! - [`window`]: GLFW window and the Vulkan presentation surface
//! - [`vulkan`]: low-level Vulkan wrappers
//! - [`frame`]: the frame-loop synchronization state machine
//! - [`engine`]: the [`engine::RenderEngine`] context tying it all together

/// Render engine context and loop
pub mod engine;
/// Frame-loop state machine
pub mod frame;
/// Vulkan backend
pub mod vulkan;
/// Window and surface management
pub mod window;

pub use engine::RenderEngine;
pub use frame::{AcquireOutcome, FrameDriver, FrameOutcome, PresentOutcome};
pub use window::{Surface, Window, WindowError};
