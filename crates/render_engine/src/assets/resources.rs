//! Resource resolution by logical name
//!
//! Applications refer to shaders and other data files by logical name
//! ("triangle.vert"); the loader resolves the name against an ordered list of
//! search roots. This keeps the engine agnostic of the working directory it
//! is launched from, which varies between `cargo run`, packaged builds and
//! IDE launch configurations.

use std::path::PathBuf;
use thiserror::Error;

/// Resource loading errors
#[derive(Error, Debug)]
pub enum ResourceError {
    /// No search root contained the requested resource
    #[error("Resource not found: {name}")]
    NotFound {
        /// The logical name that failed to resolve
        name: String,
    },

    /// The resource exists but could not be read
    #[error("Failed to read resource {name}: {source}")]
    Io {
        /// The logical name of the unreadable resource
        name: String,
        /// The underlying I/O error
        source: std::io::Error,
    },
}

/// Result type for resource operations
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Resolves logical resource names to raw bytes
pub struct ResourceLoader {
    roots: Vec<PathBuf>,
}

impl ResourceLoader {
    /// Create a loader with an explicit list of search roots
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Create a loader with the conventional search roots
    ///
    /// Tries common locations relative to the working directory, useful for
    /// applications that might be run from different directories.
    pub fn with_default_roots() -> Self {
        Self::new(
            [
                "resources",
                "shaders",
                "triangle_app/shaders",
                ".",
            ]
            .iter()
            .map(PathBuf::from)
            .collect(),
        )
    }

    /// Resolve a logical name to the first existing path, if any
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.roots
            .iter()
            .map(|root| root.join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Load a resource's raw bytes
    pub fn load(&self, name: &str) -> ResourceResult<Vec<u8>> {
        let path = self.resolve(name).ok_or_else(|| ResourceError::NotFound {
            name: name.to_string(),
        })?;
        std::fs::read(&path).map_err(|source| ResourceError::Io {
            name: name.to_string(),
            source,
        })
    }

    /// Load a resource as UTF-8 text
    pub fn load_text(&self, name: &str) -> ResourceResult<String> {
        let bytes = self.load(name)?;
        String::from_utf8(bytes).map_err(|e| ResourceError::Io {
            name: name.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })
    }

    /// The search roots, in resolution order
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_resource_reports_not_found() {
        let loader = ResourceLoader::new(vec![PathBuf::from("no/such/root")]);
        let err = loader.load("ghost.vert").unwrap_err();
        assert!(matches!(err, ResourceError::NotFound { name } if name == "ghost.vert"));
    }

    #[test]
    fn test_resolution_order_prefers_earlier_roots() {
        let dir = std::env::temp_dir().join("render_engine_resource_test");
        let first = dir.join("first");
        let second = dir.join("second");
        std::fs::create_dir_all(&first).unwrap();
        std::fs::create_dir_all(&second).unwrap();
        std::fs::write(first.join("data.txt"), b"one").unwrap();
        std::fs::write(second.join("data.txt"), b"two").unwrap();

        let loader = ResourceLoader::new(vec![first.clone(), second.clone()]);
        assert_eq!(loader.load("data.txt").unwrap(), b"one");

        let loader = ResourceLoader::new(vec![second, first]);
        assert_eq!(loader.load("data.txt").unwrap(), b"two");
    }
}
