//! Application layer: services and use cases
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod error;
pub mod error_ext;
pub mod events;
pub mod filters;
pub mod projection;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::PathContextExt;
pub use events::{BrowserObserver, SelectionChanged};
pub use filters::{FilterConfig, FilterError, FilterPredicate};
pub use projection::{DiffOp, ProjectedNode, Projection, ProjectionDiff};
