//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::{EntityId, NodeId, Tier};

/// Domain errors represent tree-structure and filter-chain violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown catalog entity: {0}")]
    UnknownEntity(EntityId),

    #[error("unknown tree node: {0}")]
    UnknownNode(NodeId),

    #[error("unknown parent entity: {0}")]
    UnknownParent(EntityId),

    #[error("entity {entity} ({tier}) cannot be placed under {parent:?}")]
    InvalidParent {
        entity: EntityId,
        tier: Tier,
        parent: Option<Tier>,
    },

    #[error("entity {entity} is a {found}, expected a {expected}")]
    TierMismatch {
        entity: EntityId,
        expected: Tier,
        found: Tier,
    },

    #[error("duplicate catalog entity: {0}")]
    DuplicateEntity(EntityId),

    #[error("entity {entity} is mirrored under {mirrored:?}, not {announced:?}")]
    ParentMismatch {
        entity: EntityId,
        mirrored: Option<EntityId>,
        announced: Option<EntityId>,
    },

    #[error("filter already registered: {0}")]
    DuplicateFilter(String),

    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("invalid configuration for filter {id}: {message}")]
    InvalidFilterConfig { id: String, message: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
