//! In-memory catalog source with a change feed
//!
//! Reference [`CatalogSource`] used by the CLI and the tests. Data sits behind
//! an `RwLock` so background loaders may mutate it from other threads; every
//! mutation is published to subscribers as a [`CatalogChange`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Deserialize;
use tracing::{debug, trace};

use crate::domain::{CatalogChange, CatalogEntity, EntityId, Entry, Grouping, Tier, Title};
use crate::infrastructure::traits::{CatalogSource, FileSystem};
use crate::infrastructure::{CatalogError, InfraError, InfraResult};

/// On-disk catalog layout (TOML).
///
/// ```toml
/// [[titles]]
/// id = 1
/// name = "Show A"
///
/// [[titles.groupings]]
/// id = 10
/// number = 1
///
/// [[titles.groupings.entries]]
/// id = 100
/// number = 1
/// name = "Pilot"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogFile {
    pub titles: Vec<TitleRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TitleRecord {
    #[serde(flatten)]
    pub title: Title,
    #[serde(default)]
    pub groupings: Vec<GroupingRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupingRecord {
    #[serde(flatten)]
    pub grouping: Grouping,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

#[derive(Debug, Default)]
struct CatalogData {
    titles: Vec<Title>,
    /// Groupings keyed by owning title
    groupings: HashMap<EntityId, Vec<Grouping>>,
    /// Entries keyed by owning grouping
    entries: HashMap<EntityId, Vec<Entry>>,
    /// Every known entity with its tier and parent
    index: HashMap<EntityId, (Tier, Option<EntityId>)>,
}

impl CatalogData {
    fn insert(&mut self, entity: CatalogEntity, parent: Option<EntityId>) -> Result<(), CatalogError> {
        let id = entity.id();
        if self.index.contains_key(&id) {
            return Err(CatalogError::rejected(format!("duplicate entity {id}")));
        }
        let parent_tier = match parent {
            Some(p) => Some(self.index.get(&p).ok_or(CatalogError::NotFound(p))?.0),
            None => None,
        };
        if entity.tier().parent() != parent_tier {
            return Err(CatalogError::rejected(format!(
                "{} {id} cannot be placed under {parent_tier:?}",
                entity.tier()
            )));
        }

        self.index.insert(id, (entity.tier(), parent));
        match (entity, parent) {
            (CatalogEntity::Title(t), _) => self.titles.push(t),
            (CatalogEntity::Grouping(g), Some(p)) => self.groupings.entry(p).or_default().push(g),
            (CatalogEntity::Entry(e), Some(p)) => self.entries.entry(p).or_default().push(e),
            // parent presence was checked against the tier above
            (_, None) => {}
        }
        Ok(())
    }

    fn remove(&mut self, id: EntityId) -> Result<(), CatalogError> {
        let (tier, parent) = self.index.remove(&id).ok_or(CatalogError::NotFound(id))?;
        match (tier, parent) {
            (Tier::Title, _) => {
                self.titles.retain(|t| t.id != id);
                for g in self.groupings.remove(&id).unwrap_or_default() {
                    self.index.remove(&g.id);
                    for e in self.entries.remove(&g.id).unwrap_or_default() {
                        self.index.remove(&e.id);
                    }
                }
            }
            (Tier::Grouping, Some(p)) => {
                if let Some(siblings) = self.groupings.get_mut(&p) {
                    siblings.retain(|g| g.id != id);
                }
                for e in self.entries.remove(&id).unwrap_or_default() {
                    self.index.remove(&e.id);
                }
            }
            (Tier::Entry, Some(p)) => {
                if let Some(siblings) = self.entries.get_mut(&p) {
                    siblings.retain(|e| e.id != id);
                }
            }
            (_, None) => {}
        }
        Ok(())
    }

    fn replace(&mut self, entity: CatalogEntity) -> Result<(), CatalogError> {
        let id = entity.id();
        let (tier, parent) = *self.index.get(&id).ok_or(CatalogError::NotFound(id))?;
        if tier != entity.tier() {
            return Err(CatalogError::rejected(format!(
                "{id} is a {tier}, not a {}",
                entity.tier()
            )));
        }
        let slot = match (entity, parent) {
            (CatalogEntity::Title(t), _) => self
                .titles
                .iter_mut()
                .find(|x| x.id == id)
                .map(|x| *x = t),
            (CatalogEntity::Grouping(g), Some(p)) => self
                .groupings
                .get_mut(&p)
                .and_then(|v| v.iter_mut().find(|x| x.id == id))
                .map(|x| *x = g),
            (CatalogEntity::Entry(e), Some(p)) => self
                .entries
                .get_mut(&p)
                .and_then(|v| v.iter_mut().find(|x| x.id == id))
                .map(|x| *x = e),
            (_, None) => None,
        };
        slot.ok_or(CatalogError::NotFound(id))
    }
}

/// Thread-safe in-memory catalog.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    data: RwLock<CatalogData>,
    subscribers: Mutex<Vec<Sender<CatalogChange>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from parsed records without publishing changes.
    pub fn from_records(file: CatalogFile) -> Result<Self, CatalogError> {
        let mut data = CatalogData::default();
        for record in file.titles {
            let title_id = record.title.id;
            data.insert(record.title.into(), None)?;
            for g in record.groupings {
                let grouping_id = g.grouping.id;
                data.insert(g.grouping.into(), Some(title_id))?;
                for e in g.entries {
                    data.insert(e.into(), Some(grouping_id))?;
                }
            }
        }
        debug!("from_records: {} entities", data.index.len());
        Ok(Self {
            data: RwLock::new(data),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// Load a TOML catalog file.
    pub fn from_file(fs: &dyn FileSystem, path: &Path) -> InfraResult<Self> {
        let content = fs
            .read_to_string(path)
            .map_err(|e| InfraError::io(format!("read catalog {}", path.display()), e))?;
        let file: CatalogFile = toml::from_str(&content).map_err(|e| InfraError::CatalogFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self::from_records(file)?)
    }

    /// Register a change-feed receiver.
    pub fn subscribe(&self) -> Receiver<CatalogChange> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }

    pub fn add(
        &self,
        entity: impl Into<CatalogEntity>,
        parent: Option<EntityId>,
    ) -> Result<(), CatalogError> {
        let entity = entity.into();
        self.write()?.insert(entity.clone(), parent)?;
        self.publish(CatalogChange::EntityAdded { entity, parent });
        Ok(())
    }

    /// Remove an entity together with everything below it.
    pub fn remove(&self, id: EntityId) -> Result<(), CatalogError> {
        self.write()?.remove(id)?;
        self.publish(CatalogChange::EntityRemoved(id));
        Ok(())
    }

    pub fn update(&self, entity: impl Into<CatalogEntity>) -> Result<(), CatalogError> {
        let entity = entity.into();
        self.write()?.replace(entity.clone())?;
        self.publish(CatalogChange::EntityUpdated(entity));
        Ok(())
    }

    /// Number of entities across all tiers.
    pub fn len(&self) -> usize {
        self.read().map(|d| d.index.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn publish(&self, change: CatalogChange) {
        trace!("publish: {:?}", change);
        if let Ok(mut subs) = self.subscribers.lock() {
            // disconnected receivers are dropped
            subs.retain(|tx| tx.send(change.clone()).is_ok());
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CatalogData>, CatalogError> {
        self.data
            .read()
            .map_err(|_| CatalogError::unavailable("catalog lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CatalogData>, CatalogError> {
        self.data
            .write()
            .map_err(|_| CatalogError::unavailable("catalog lock poisoned"))
    }
}

impl CatalogSource for InMemoryCatalog {
    fn list_titles(&self) -> Result<Vec<Title>, CatalogError> {
        Ok(self.read()?.titles.clone())
    }

    fn list_groupings(&self, title: EntityId) -> Result<Vec<Grouping>, CatalogError> {
        let data = self.read()?;
        match data.index.get(&title) {
            Some((Tier::Title, _)) => Ok(data.groupings.get(&title).cloned().unwrap_or_default()),
            _ => Err(CatalogError::NotFound(title)),
        }
    }

    fn list_entries(&self, grouping: EntityId) -> Result<Vec<Entry>, CatalogError> {
        let data = self.read()?;
        match data.index.get(&grouping) {
            Some((Tier::Grouping, _)) => Ok(data.entries.get(&grouping).cloned().unwrap_or_default()),
            _ => Err(CatalogError::NotFound(grouping)),
        }
    }
}
