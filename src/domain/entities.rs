//! Domain entities: catalog tiers and their records

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Identity of a catalog entity, owned by the catalog source.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One of the three catalog tiers (show → season → episode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Title,
    Grouping,
    Entry,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Title, Tier::Grouping, Tier::Entry];

    /// Tier a node of this tier must hang under, `None` for top-level titles.
    pub fn parent(self) -> Option<Tier> {
        match self {
            Tier::Title => None,
            Tier::Grouping => Some(Tier::Title),
            Tier::Entry => Some(Tier::Grouping),
        }
    }

    fn bit(self) -> u8 {
        match self {
            Tier::Title => 0b001,
            Tier::Grouping => 0b010,
            Tier::Entry => 0b100,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Title => write!(f, "title"),
            Tier::Grouping => write!(f, "grouping"),
            Tier::Entry => write!(f, "entry"),
        }
    }
}

/// Set of tiers a filter applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TierSet(u8);

impl TierSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Self(0b111)
    }

    pub fn only(tier: Tier) -> Self {
        Self(tier.bit())
    }

    pub fn with(self, tier: Tier) -> Self {
        Self(self.0 | tier.bit())
    }

    pub fn contains(&self, tier: Tier) -> bool {
        self.0 & tier.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Tier> + '_ {
        Tier::ALL.into_iter().filter(|t| self.contains(*t))
    }
}

impl FromIterator<Tier> for TierSet {
    fn from_iter<I: IntoIterator<Item = Tier>>(iter: I) -> Self {
        iter.into_iter().fold(TierSet::empty(), TierSet::with)
    }
}

/// Top tier: a show.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Title {
    pub id: EntityId,
    pub name: String,
    pub original_name: Option<String>,
    pub year: Option<i32>,
    pub watched: bool,
    pub genres: Vec<String>,
    pub plot: Option<String>,
}

impl Title {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: EntityId(id),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Middle tier: a season. `number == None` is the "unknown" grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Grouping {
    pub id: EntityId,
    pub number: Option<u32>,
    pub name: Option<String>,
}

impl Grouping {
    pub fn new(id: u64, number: Option<u32>) -> Self {
        Self {
            id: EntityId(id),
            number,
            name: None,
        }
    }

    pub fn named(id: u64, number: Option<u32>, name: impl Into<String>) -> Self {
        Self {
            id: EntityId(id),
            number,
            name: Some(name.into()),
        }
    }
}

/// Leaf tier: an episode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entry {
    pub id: EntityId,
    pub number: Option<u32>,
    pub name: String,
    pub watched: bool,
    pub aired: Option<NaiveDate>,
    pub plot: Option<String>,
}

impl Entry {
    pub fn new(id: u64, number: Option<u32>, name: impl Into<String>) -> Self {
        Self {
            id: EntityId(id),
            number,
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Tagged view over the three catalog tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntity {
    Title(Title),
    Grouping(Grouping),
    Entry(Entry),
}

impl CatalogEntity {
    pub fn id(&self) -> EntityId {
        match self {
            CatalogEntity::Title(t) => t.id,
            CatalogEntity::Grouping(g) => g.id,
            CatalogEntity::Entry(e) => e.id,
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            CatalogEntity::Title(_) => Tier::Title,
            CatalogEntity::Grouping(_) => Tier::Grouping,
            CatalogEntity::Entry(_) => Tier::Entry,
        }
    }

    /// Name shown in the tree.
    ///
    /// Groupings without an explicit name render as `Season N`, or `Unknown`
    /// when unnumbered.
    pub fn display_name(&self) -> Cow<'_, str> {
        match self {
            CatalogEntity::Title(t) => Cow::Borrowed(t.name.as_str()),
            CatalogEntity::Grouping(g) => match (&g.name, g.number) {
                (Some(name), _) => Cow::Borrowed(name.as_str()),
                (None, Some(n)) => Cow::Owned(format!("Season {n}")),
                (None, None) => Cow::Borrowed("Unknown"),
            },
            CatalogEntity::Entry(e) => Cow::Borrowed(e.name.as_str()),
        }
    }

    /// Additional searchable text (original name, plot, genres).
    pub fn metadata_fields(&self) -> Vec<&str> {
        match self {
            CatalogEntity::Title(t) => t
                .original_name
                .iter()
                .chain(t.plot.iter())
                .chain(t.genres.iter())
                .map(String::as_str)
                .collect(),
            CatalogEntity::Grouping(_) => Vec::new(),
            CatalogEntity::Entry(e) => e.plot.iter().map(String::as_str).collect(),
        }
    }

    /// Watched flag, `None` for tiers that carry none.
    pub fn watched(&self) -> Option<bool> {
        match self {
            CatalogEntity::Title(t) => Some(t.watched),
            CatalogEntity::Grouping(_) => None,
            CatalogEntity::Entry(e) => Some(e.watched),
        }
    }

    /// Release year: title year, or the year an entry first aired.
    pub fn year(&self) -> Option<i32> {
        match self {
            CatalogEntity::Title(t) => t.year,
            CatalogEntity::Grouping(_) => None,
            CatalogEntity::Entry(e) => e.aired.map(|d| d.year()),
        }
    }

    pub fn genres(&self) -> &[String] {
        match self {
            CatalogEntity::Title(t) => &t.genres,
            _ => &[],
        }
    }

    /// Deterministic sibling order.
    ///
    /// - Titles: case-insensitive display name
    /// - Groupings: number ascending, unnumbered last
    /// - Entries: number ascending (unnumbered last), ties by name
    ///
    /// Entity id is the final tie breaker so equal keys still order stably.
    pub fn sibling_cmp(&self, other: &CatalogEntity) -> Ordering {
        match (self, other) {
            (CatalogEntity::Title(a), CatalogEntity::Title(b)) => a
                .name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.id.cmp(&b.id)),
            (CatalogEntity::Grouping(_), CatalogEntity::Grouping(_)) => {
                numbered_cmp(self.number(), other.number())
                    .then_with(|| {
                        self.display_name()
                            .to_lowercase()
                            .cmp(&other.display_name().to_lowercase())
                    })
                    .then(self.id().cmp(&other.id()))
            }
            (CatalogEntity::Entry(a), CatalogEntity::Entry(b)) => numbered_cmp(a.number, b.number)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                .then(a.id.cmp(&b.id)),
            _ => self.tier().cmp(&other.tier()),
        }
    }

    fn number(&self) -> Option<u32> {
        match self {
            CatalogEntity::Title(_) => None,
            CatalogEntity::Grouping(g) => g.number,
            CatalogEntity::Entry(e) => e.number,
        }
    }
}

fn numbered_cmp(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl From<Title> for CatalogEntity {
    fn from(t: Title) -> Self {
        CatalogEntity::Title(t)
    }
}

impl From<Grouping> for CatalogEntity {
    fn from(g: Grouping) -> Self {
        CatalogEntity::Grouping(g)
    }
}

impl From<Entry> for CatalogEntity {
    fn from(e: Entry) -> Self {
        CatalogEntity::Entry(e)
    }
}

/// Change notification emitted by a catalog source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogChange {
    EntityAdded {
        entity: CatalogEntity,
        parent: Option<EntityId>,
    },
    EntityRemoved(EntityId),
    EntityUpdated(CatalogEntity),
}

impl CatalogChange {
    pub fn added(entity: impl Into<CatalogEntity>, parent: Option<u64>) -> Self {
        CatalogChange::EntityAdded {
            entity: entity.into(),
            parent: parent.map(EntityId),
        }
    }
}
