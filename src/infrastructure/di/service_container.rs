//! Service container for dependency injection
//!
//! Wires a browser session from settings, a filesystem and a catalog source.

use std::sync::Arc;

use crate::application::services::{CatalogBrowser, FilterChain};
use crate::config::Settings;
use crate::infrastructure::traits::{CatalogSource, FileSystem, RealFileSystem};
use crate::infrastructure::TomlFilterStore;

/// Container holding shared dependencies.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            settings: Arc::new(settings),
            fs,
        }
    }

    /// Filter chain with the built-in filters, honoring `search_metadata`.
    pub fn filter_chain(&self) -> FilterChain {
        FilterChain::with_builtin_filters(self.settings.search_metadata)
    }

    /// Browser over `source`. Filter persistence is wired when `store_filters` is set.
    pub fn browser(&self, source: Arc<dyn CatalogSource>) -> CatalogBrowser {
        let browser = CatalogBrowser::new(
            source,
            self.filter_chain(),
            self.settings.auto_select_first,
        );
        if self.settings.store_filters {
            let store = TomlFilterStore::new(
                self.settings.filter_state_file.clone(),
                Arc::clone(&self.fs),
            );
            browser.with_filter_store(Arc::new(store))
        } else {
            browser
        }
    }
}
