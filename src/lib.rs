//! mediatree: a filtered, diffed tree projection of a three-tier media catalog
//!
//! Layers, innermost first:
//!
//! - [`domain`]: entities, the arena-backed node tree, domain errors
//! - [`application`]: filters, projection diffing, selection and the browser session
//! - [`infrastructure`]: catalog source, filter persistence, DI container
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
