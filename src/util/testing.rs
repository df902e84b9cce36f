//! Shared test setup: logging, sample catalogs and a recording observer

use std::cell::RefCell;
use std::env;
use std::rc::Rc;
use std::sync::Once;

use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::application::events::{BrowserObserver, SelectionChanged};
use crate::application::projection::{DiffOp, Projection, ProjectionDiff};
use crate::domain::{Entry, Grouping, NodeId, Title};
use crate::infrastructure::{CatalogFile, GroupingRecord, InMemoryCatalog, TitleRecord};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "mediatree=trace");
        }
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Title record with groupings `(grouping, entries)`.
pub fn title_record(title: Title, groupings: Vec<(Grouping, Vec<Entry>)>) -> TitleRecord {
    TitleRecord {
        title,
        groupings: groupings
            .into_iter()
            .map(|(grouping, entries)| GroupingRecord { grouping, entries })
            .collect(),
    }
}

/// One show, two seasons, three episodes:
///
/// ```text
/// Show A (1)
/// ├── Season 1 (10)
/// │   ├── Pilot (100)
/// │   └── Episode 2 (101)
/// └── Season 2 (11)
///     └── Finale (110)
/// ```
pub fn scenario_catalog() -> InMemoryCatalog {
    let file = CatalogFile {
        titles: vec![title_record(
            Title::new(1, "Show A"),
            vec![
                (
                    Grouping::new(10, Some(1)),
                    vec![
                        Entry::new(100, Some(1), "Pilot"),
                        Entry::new(101, Some(2), "Episode 2"),
                    ],
                ),
                (
                    Grouping::new(11, Some(2)),
                    vec![Entry::new(110, Some(1), "Finale")],
                ),
            ],
        )],
    };
    InMemoryCatalog::from_records(file).expect("scenario catalog is consistent")
}

/// Three shows with metadata, inserted out of display order.
///
/// ```text
/// Alpha (2004, drama)            id 1
/// ├── Season 1 (10)              Pilot 100 watched, Second 101
/// └── Unknown (11)               Extra 110
/// beta (2012, comedy, watched)   id 2
/// └── Season 1 (20)              Opening 200 watched
/// Gamma (no year, drama)         id 3
/// └── Specials (30, number 0)    Gala 300
/// ```
pub fn library_catalog() -> InMemoryCatalog {
    let mut alpha = Title::new(1, "Alpha");
    alpha.year = Some(2004);
    alpha.genres = vec!["Drama".into()];
    alpha.plot = Some("A detective story".into());

    let mut beta = Title::new(2, "beta");
    beta.year = Some(2012);
    beta.genres = vec!["Comedy".into()];
    beta.watched = true;

    let mut gamma = Title::new(3, "Gamma");
    gamma.genres = vec!["drama".into()];

    let mut pilot = Entry::new(100, Some(1), "Pilot");
    pilot.watched = true;
    let mut opening = Entry::new(200, Some(1), "Opening");
    opening.watched = true;

    let file = CatalogFile {
        titles: vec![
            title_record(
                gamma,
                vec![(
                    Grouping::named(30, Some(0), "Specials"),
                    vec![Entry::new(300, Some(1), "Gala")],
                )],
            ),
            title_record(
                alpha,
                vec![
                    (Grouping::new(11, None), vec![Entry::new(110, None, "Extra")]),
                    (
                        Grouping::new(10, Some(1)),
                        vec![Entry::new(101, Some(2), "Second"), pilot],
                    ),
                ],
            ),
            title_record(beta, vec![(Grouping::new(20, Some(1)), vec![opening])]),
        ],
    };
    InMemoryCatalog::from_records(file).expect("library catalog is consistent")
}

/// What an observer saw, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    Diff {
        ops: Vec<DiffOp>,
        projection: Vec<NodeId>,
    },
    Selection(SelectionChanged),
}

/// Observer that records every callback. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    log: Rc<RefCell<Vec<Observed>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Observed> {
        self.log.borrow().clone()
    }

    pub fn diffs(&self) -> Vec<Vec<DiffOp>> {
        self.log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Observed::Diff { ops, .. } => Some(ops.clone()),
                Observed::Selection(_) => None,
            })
            .collect()
    }

    pub fn selections(&self) -> Vec<SelectionChanged> {
        self.log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Observed::Selection(s) => Some(*s),
                Observed::Diff { .. } => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

impl BrowserObserver for RecordingObserver {
    fn on_projection_diff(&mut self, diff: &ProjectionDiff, projection: &Projection) {
        self.log.borrow_mut().push(Observed::Diff {
            ops: diff.ops().to_vec(),
            projection: projection.ids(),
        });
    }

    fn on_selection_changed(&mut self, event: &SelectionChanged) {
        self.log.borrow_mut().push(Observed::Selection(*event));
    }
}
