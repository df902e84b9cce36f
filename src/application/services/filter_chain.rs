//! Filter chain
//!
//! Ordered set of independently toggleable predicates combined with logical AND.
//! A filter only votes on nodes of the tiers it declares; on every other tier it
//! is vacuously true.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::application::filters::{
    FilterConfig, FilterPredicate, GenreFilter, TextFilter, WatchedFilter, YearRangeFilter,
    GENRE_FILTER, TEXT_FILTER, WATCHED_FILTER, YEAR_FILTER,
};
use crate::domain::{DomainError, DomainResult, TierSet, TreeNode};

struct FilterSlot {
    id: String,
    predicate: Box<dyn FilterPredicate>,
    tiers: TierSet,
    active: bool,
    config: FilterConfig,
}

/// Registered filters in registration order.
#[derive(Default)]
pub struct FilterChain {
    slots: Vec<FilterSlot>,
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.slots
                    .iter()
                    .map(|s| format!("{}[{}]={}", s.id, if s.active { "on" } else { "off" }, s.config)),
            )
            .finish()
    }
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain with the built-in filters registered, all inactive.
    pub fn with_builtin_filters(search_metadata: bool) -> Self {
        let mut chain = Self::new();
        let builtins: [(&str, Box<dyn FilterPredicate>, TierSet, FilterConfig); 4] = [
            (
                TEXT_FILTER,
                Box::new(TextFilter { search_metadata }),
                TextFilter::tiers(),
                FilterConfig::text(""),
            ),
            (
                WATCHED_FILTER,
                Box::new(WatchedFilter),
                WatchedFilter::tiers(),
                FilterConfig::Flag(false),
            ),
            (
                YEAR_FILTER,
                Box::new(YearRangeFilter),
                YearRangeFilter::tiers(),
                FilterConfig::range(None, None),
            ),
            (
                GENRE_FILTER,
                Box::new(GenreFilter),
                GenreFilter::tiers(),
                FilterConfig::text(""),
            ),
        ];
        for (id, predicate, tiers, config) in builtins {
            chain.slots.push(FilterSlot {
                id: id.to_string(),
                predicate,
                tiers,
                active: false,
                config,
            });
        }
        chain
    }

    /// Register a filter. New filters start inactive.
    pub fn add_filter(
        &mut self,
        id: impl Into<String>,
        predicate: Box<dyn FilterPredicate>,
        tiers: TierSet,
        config: FilterConfig,
    ) -> DomainResult<()> {
        let id = id.into();
        if self.slot(&id).is_some() {
            return Err(DomainError::DuplicateFilter(id));
        }
        if !predicate.accepts(&config) {
            return Err(DomainError::InvalidFilterConfig {
                id,
                message: format!("unsupported {} config", config.kind()),
            });
        }
        debug!("add_filter: {} tiers={:?}", id, tiers.iter().collect::<Vec<_>>());
        self.slots.push(FilterSlot {
            id,
            predicate,
            tiers,
            active: false,
            config,
        });
        Ok(())
    }

    pub fn remove_filter(&mut self, id: &str) -> DomainResult<()> {
        let pos = self
            .slots
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| DomainError::UnknownFilter(id.to_string()))?;
        self.slots.remove(pos);
        debug!("remove_filter: {}", id);
        Ok(())
    }

    /// Toggle a filter. Returns true when the flag actually changed.
    pub fn set_active(&mut self, id: &str, active: bool) -> DomainResult<bool> {
        let slot = self.slot_mut(id)?;
        let changed = slot.active != active;
        slot.active = active;
        debug!("set_active: {}={} (changed={})", id, active, changed);
        Ok(changed)
    }

    /// Replace a filter's configuration. Returns true when the value changed.
    pub fn set_config(&mut self, id: &str, config: FilterConfig) -> DomainResult<bool> {
        let slot = self.slot_mut(id)?;
        if !slot.predicate.accepts(&config) {
            return Err(DomainError::InvalidFilterConfig {
                id: id.to_string(),
                message: format!("unsupported {} config", config.kind()),
            });
        }
        let changed = slot.config != config;
        slot.config = config;
        Ok(changed)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.slot(id).is_some_and(|s| s.active)
    }

    pub fn config(&self, id: &str) -> Option<&FilterConfig> {
        self.slot(id).map(|s| &s.config)
    }

    pub fn tiers(&self, id: &str) -> Option<TierSet> {
        self.slot(id).map(|s| s.tiers)
    }

    pub fn has_active_filters(&self) -> bool {
        self.slots.iter().any(|s| s.active)
    }

    /// Filter ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// AND over every active filter applicable to the node's tier.
    ///
    /// A predicate error counts as a non-match for that node only.
    pub fn evaluate(&self, node: &TreeNode) -> bool {
        let tier = node.tier();
        for slot in self.slots.iter().filter(|s| s.active && s.tiers.contains(tier)) {
            match slot.predicate.evaluate(node, &slot.config) {
                Ok(true) => {}
                Ok(false) => return false,
                Err(e) => {
                    warn!(
                        "filter {} failed on {} {}: {}",
                        slot.id,
                        tier,
                        node.entity_id(),
                        e
                    );
                    return false;
                }
            }
        }
        true
    }

    /// Configurations of the active filters, for persistence.
    pub fn active_state(&self) -> BTreeMap<String, FilterConfig> {
        self.slots
            .iter()
            .filter(|s| s.active)
            .map(|s| (s.id.clone(), s.config.clone()))
            .collect()
    }

    /// Apply persisted configurations and activate those filters.
    ///
    /// Filters that are not registered, or whose stored value does not fit the
    /// predicate, are skipped and returned.
    pub fn restore_state(&mut self, state: &BTreeMap<String, FilterConfig>) -> Vec<String> {
        let mut skipped = Vec::new();
        for (id, config) in state {
            let applied = self
                .set_config(id, config.clone())
                .and_then(|_| self.set_active(id, true));
            if let Err(e) = applied {
                warn!("restore_state: skipping filter {}: {}", id, e);
                skipped.push(id.clone());
            }
        }
        skipped
    }

    fn slot(&self, id: &str) -> Option<&FilterSlot> {
        self.slots.iter().find(|s| s.id == id)
    }

    fn slot_mut(&mut self, id: &str) -> DomainResult<&mut FilterSlot> {
        self.slots
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| DomainError::UnknownFilter(id.to_string()))
    }
}
