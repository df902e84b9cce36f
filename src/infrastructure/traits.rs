//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use crate::application::filters::FilterConfig;
use crate::application::ApplicationResult;
use crate::domain::{EntityId, Entry, Grouping, Title};
use crate::infrastructure::CatalogError;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// Read access to the canonical catalog.
///
/// Implementations own the entities; the tree provider only mirrors them.
pub trait CatalogSource: Send + Sync {
    fn list_titles(&self) -> Result<Vec<Title>, CatalogError>;

    fn list_groupings(&self, title: EntityId) -> Result<Vec<Grouping>, CatalogError>;

    fn list_entries(&self, grouping: EntityId) -> Result<Vec<Entry>, CatalogError>;
}

/// Persistence of active filter configurations across sessions.
pub trait FilterStateStore: Send + Sync {
    /// Load `{filter id → config}`; a missing store yields an empty map.
    fn load(&self) -> ApplicationResult<BTreeMap<String, FilterConfig>>;

    /// Replace the stored state.
    fn save(&self, state: &BTreeMap<String, FilterConfig>) -> ApplicationResult<()>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}
