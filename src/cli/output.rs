//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use std::collections::HashMap;

use colored::Colorize;
use itertools::Itertools;
use termtree::Tree;

use crate::application::projection::Projection;
use crate::application::services::{ProjectionStats, TierCounts};
use crate::domain::{CatalogEntity, NodeId, NodeTree};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Tree label for one catalog node.
pub fn label(entity: &CatalogEntity) -> String {
    let watched = if entity.watched() == Some(true) { " ✓" } else { "" };
    match entity {
        CatalogEntity::Title(t) => match t.year {
            Some(year) => format!("{} ({}){}", t.name, year, watched),
            None => format!("{}{}", t.name, watched),
        },
        CatalogEntity::Grouping(_) => entity.display_name().into_owned(),
        CatalogEntity::Entry(e) => match e.number {
            Some(n) => format!("{:02}. {}{}", n, e.name, watched),
            None => format!("{}{}", e.name, watched),
        },
    }
}

/// Render the visible projection below a single `root` label.
pub fn render_projection(root: &str, tree: &NodeTree, projection: &Projection) -> Tree<String> {
    let children: HashMap<NodeId, Vec<NodeId>> = projection
        .nodes()
        .iter()
        .filter_map(|n| n.parent.map(|p| (p, n.id)))
        .into_group_map();

    let roots = projection
        .nodes()
        .iter()
        .filter(|n| n.parent.is_none())
        .map(|n| build_subtree(n.id, tree, &children));
    Tree::new(root.to_string()).with_leaves(roots)
}

fn build_subtree(
    id: NodeId,
    tree: &NodeTree,
    children: &HashMap<NodeId, Vec<NodeId>>,
) -> Tree<String> {
    let text = tree
        .get(id)
        .map(|n| label(&n.entity))
        .unwrap_or_else(|| id.to_string());
    let leaves = children
        .get(&id)
        .into_iter()
        .flatten()
        .map(|&child| build_subtree(child, tree, children));
    Tree::new(text).with_leaves(leaves)
}

/// One line per tier: `visible/total`.
pub fn stats_lines(stats: &ProjectionStats) -> Vec<String> {
    let line = |name: &str, f: fn(&TierCounts) -> usize| {
        format!("{:<10} {}/{}", name, f(&stats.visible), f(&stats.total))
    };
    vec![
        line("titles", |c| c.titles),
        line("seasons", |c| c.groupings),
        line("episodes", |c| c.entries),
    ]
}
