//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (CatalogSource, FilterStateStore)
//! but are themselves concrete structs, not traits.

mod browser;
mod filter_chain;
mod filtering;
mod selection;
mod tree_provider;

pub use browser::{CatalogBrowser, PumpReport};
pub use filter_chain::FilterChain;
pub use filtering::{FilteringEngine, ProjectionStats, TierCounts};
pub use selection::{Selection, SelectionCoordinator};
pub use tree_provider::{BuildReport, Removal, TreeDataProvider};
