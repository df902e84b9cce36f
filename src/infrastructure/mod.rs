//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements I/O boundary traits and wires up services.

pub mod catalog;
pub mod di;
pub mod error;
pub mod filter_store;
pub mod traits;

pub use catalog::{CatalogFile, GroupingRecord, InMemoryCatalog, TitleRecord};
pub use error::{CatalogError, InfraError, InfraResult};
pub use filter_store::TomlFilterStore;
