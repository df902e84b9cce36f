//! Filter predicates and their configuration values
//!
//! A predicate evaluates one tree node against the current configuration of its
//! filter. Built-in predicates cover free text, the watched flag, a year range
//! and genre membership; callers may register any closure with the same shape.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{TierSet, Tier, TreeNode};

pub const TEXT_FILTER: &str = "text";
pub const WATCHED_FILTER: &str = "watched";
pub const YEAR_FILTER: &str = "year";
pub const GENRE_FILTER: &str = "genre";

/// Configuration value of a filter, persisted as `{kind, value}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FilterConfig {
    None,
    Text(String),
    Flag(bool),
    Range {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i32>,
    },
}

impl FilterConfig {
    pub fn text(s: impl Into<String>) -> Self {
        FilterConfig::Text(s.into())
    }

    pub fn range(min: Option<i32>, max: Option<i32>) -> Self {
        FilterConfig::Range { min, max }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FilterConfig::None => "none",
            FilterConfig::Text(_) => "text",
            FilterConfig::Flag(_) => "flag",
            FilterConfig::Range { .. } => "range",
        }
    }
}

impl fmt::Display for FilterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterConfig::None => write!(f, "-"),
            FilterConfig::Text(s) => write!(f, "{s:?}"),
            FilterConfig::Flag(b) => write!(f, "{b}"),
            FilterConfig::Range { min, max } => {
                let bound = |b: &Option<i32>| b.map(|v| v.to_string()).unwrap_or_default();
                write!(f, "{}..={}", bound(min), bound(max))
            }
        }
    }
}

/// Failure while evaluating a predicate on a node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("expected {expected} config, got {found}")]
    ConfigMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0}")]
    Failed(String),
}

/// Evaluation function of a filter.
pub trait FilterPredicate {
    fn evaluate(&self, node: &TreeNode, config: &FilterConfig) -> Result<bool, FilterError>;

    /// Whether `config` has the shape this predicate understands.
    fn accepts(&self, _config: &FilterConfig) -> bool {
        true
    }
}

impl<F> FilterPredicate for F
where
    F: Fn(&TreeNode, &FilterConfig) -> Result<bool, FilterError>,
{
    fn evaluate(&self, node: &TreeNode, config: &FilterConfig) -> Result<bool, FilterError> {
        self(node, config)
    }
}

fn mismatch(expected: &'static str, found: &FilterConfig) -> FilterError {
    FilterError::ConfigMismatch {
        expected,
        found: found.kind(),
    }
}

/// Case-insensitive substring match on the display name, and optionally on
/// metadata fields (original name, plot, genres).
#[derive(Debug, Clone, Default)]
pub struct TextFilter {
    pub search_metadata: bool,
}

impl TextFilter {
    pub fn tiers() -> TierSet {
        TierSet::all()
    }
}

impl FilterPredicate for TextFilter {
    fn evaluate(&self, node: &TreeNode, config: &FilterConfig) -> Result<bool, FilterError> {
        let FilterConfig::Text(text) = config else {
            return Err(mismatch("text", config));
        };
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(true);
        }
        if node.entity.display_name().to_lowercase().contains(&needle) {
            return Ok(true);
        }
        Ok(self.search_metadata
            && node
                .entity
                .metadata_fields()
                .iter()
                .any(|f| f.to_lowercase().contains(&needle)))
    }

    fn accepts(&self, config: &FilterConfig) -> bool {
        matches!(config, FilterConfig::Text(_))
    }
}

/// Matches entities whose watched flag equals the configured flag.
#[derive(Debug, Clone, Default)]
pub struct WatchedFilter;

impl WatchedFilter {
    pub fn tiers() -> TierSet {
        TierSet::only(Tier::Title).with(Tier::Entry)
    }
}

impl FilterPredicate for WatchedFilter {
    fn evaluate(&self, node: &TreeNode, config: &FilterConfig) -> Result<bool, FilterError> {
        let FilterConfig::Flag(wanted) = config else {
            return Err(mismatch("flag", config));
        };
        Ok(node.entity.watched().map_or(true, |w| w == *wanted))
    }

    fn accepts(&self, config: &FilterConfig) -> bool {
        matches!(config, FilterConfig::Flag(_))
    }
}

/// Inclusive year bounds; nodes without a year never match.
#[derive(Debug, Clone, Default)]
pub struct YearRangeFilter;

impl YearRangeFilter {
    pub fn tiers() -> TierSet {
        TierSet::only(Tier::Title).with(Tier::Entry)
    }
}

impl FilterPredicate for YearRangeFilter {
    fn evaluate(&self, node: &TreeNode, config: &FilterConfig) -> Result<bool, FilterError> {
        let FilterConfig::Range { min, max } = config else {
            return Err(mismatch("range", config));
        };
        let Some(year) = node.entity.year() else {
            return Ok(false);
        };
        Ok(min.map_or(true, |m| year >= m) && max.map_or(true, |m| year <= m))
    }

    fn accepts(&self, config: &FilterConfig) -> bool {
        matches!(config, FilterConfig::Range { .. })
    }
}

/// Case-insensitive genre membership on titles.
#[derive(Debug, Clone, Default)]
pub struct GenreFilter;

impl GenreFilter {
    pub fn tiers() -> TierSet {
        TierSet::only(Tier::Title)
    }
}

impl FilterPredicate for GenreFilter {
    fn evaluate(&self, node: &TreeNode, config: &FilterConfig) -> Result<bool, FilterError> {
        let FilterConfig::Text(genre) = config else {
            return Err(mismatch("text", config));
        };
        let genre = genre.trim().to_lowercase();
        if genre.is_empty() {
            return Ok(true);
        }
        Ok(node
            .entity
            .genres()
            .iter()
            .any(|g| g.to_lowercase() == genre))
    }

    fn accepts(&self, config: &FilterConfig) -> bool {
        matches!(config, FilterConfig::Text(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CatalogEntity, Entry, Title};
    use chrono::NaiveDate;

    fn node(entity: impl Into<CatalogEntity>) -> TreeNode {
        TreeNode {
            entity: entity.into(),
            parent: None,
            children: Vec::new(),
        }
    }

    #[test]
    fn given_metadata_search_when_plot_matches_then_accepts() {
        let mut title = Title::new(1, "Show A");
        title.plot = Some("A chemistry teacher".into());
        let n = node(title);

        let plain = TextFilter::default();
        let deep = TextFilter {
            search_metadata: true,
        };
        let cfg = FilterConfig::text("CHEMISTRY");

        assert!(!plain.evaluate(&n, &cfg).unwrap());
        assert!(deep.evaluate(&n, &cfg).unwrap());
    }

    #[test]
    fn given_wrong_config_kind_when_evaluating_then_errors() {
        let n = node(Title::new(1, "Show"));
        let err = TextFilter::default()
            .evaluate(&n, &FilterConfig::Flag(true))
            .unwrap_err();
        assert_eq!(
            err,
            FilterError::ConfigMismatch {
                expected: "text",
                found: "flag"
            }
        );
    }

    #[test]
    fn given_non_ascii_genre_when_case_differs_then_matches() {
        let mut title = Title::new(1, "Amélie");
        title.genres = vec!["Drâme".into(), "Комедия".into()];
        let node = node(title);

        assert!(GenreFilter.evaluate(&node, &FilterConfig::text("DRÂME")).unwrap());
        assert!(GenreFilter.evaluate(&node, &FilterConfig::text(" комедия ")).unwrap());
        assert!(!GenreFilter.evaluate(&node, &FilterConfig::text("drame")).unwrap());
    }

    #[test]
    fn given_year_range_when_entry_aired_inside_then_matches() {
        let mut ep = Entry::new(1, Some(1), "Pilot");
        ep.aired = NaiveDate::from_ymd_opt(2008, 1, 20);
        let n = node(ep);

        assert!(YearRangeFilter
            .evaluate(&n, &FilterConfig::range(Some(2008), None))
            .unwrap());
        assert!(!YearRangeFilter
            .evaluate(&n, &FilterConfig::range(None, Some(2007)))
            .unwrap());
        assert!(!YearRangeFilter
            .evaluate(&node(Entry::new(2, None, "Undated")), &FilterConfig::range(None, None))
            .unwrap());
    }

    #[test]
    fn given_range_config_when_serialized_then_round_trips_through_toml() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Wrapper {
            year: FilterConfig,
        }
        let w = Wrapper {
            year: FilterConfig::range(Some(1990), None),
        };
        let s = toml::to_string(&w).unwrap();
        let back: Wrapper = toml::from_str(&s).unwrap();
        assert_eq!(back, w);
    }
}
