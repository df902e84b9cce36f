//! TOML-backed filter state
//!
//! ```toml
//! [filters.text]
//! kind = "text"
//! value = "office"
//!
//! [filters.year]
//! kind = "range"
//! value = { min = 2000, max = 2010 }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::error_ext::PathContextExt;
use crate::application::filters::FilterConfig;
use crate::application::ApplicationResult;
use crate::infrastructure::traits::{FileSystem, FilterStateStore};

#[derive(Debug, Default, Serialize, Deserialize)]
struct FilterStateFile {
    #[serde(default)]
    filters: BTreeMap<String, FilterConfig>,
}

pub struct TomlFilterStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl TomlFilterStore {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FilterStateStore for TomlFilterStore {
    fn load(&self) -> ApplicationResult<BTreeMap<String, FilterConfig>> {
        if !self.fs.exists(&self.path) {
            debug!("load: no filter state at {}", self.path.display());
            return Ok(BTreeMap::new());
        }
        let content = self
            .fs
            .read_to_string(&self.path)
            .with_path_context("read filter state", &self.path)?;
        let file: FilterStateFile =
            toml::from_str(&content).with_path_context("parse filter state", &self.path)?;
        debug!("load: {} filters from {}", file.filters.len(), self.path.display());
        Ok(file.filters)
    }

    fn save(&self, state: &BTreeMap<String, FilterConfig>) -> ApplicationResult<()> {
        let file = FilterStateFile {
            filters: state.clone(),
        };
        let content =
            toml::to_string_pretty(&file).with_path_context("serialize filter state", &self.path)?;
        self.fs
            .ensure_parent(&self.path)
            .with_path_context("create filter state dir", &self.path)?;
        self.fs
            .write(&self.path, &content)
            .with_path_context("write filter state", &self.path)?;
        debug!("save: {} filters to {}", state.len(), self.path.display());
        Ok(())
    }
}
