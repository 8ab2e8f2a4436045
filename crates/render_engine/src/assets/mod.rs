//! Asset and resource loading

pub mod resources;

pub use resources::{ResourceError, ResourceLoader};
