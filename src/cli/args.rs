//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

/// Browse a media catalog as a filtered title/season/episode tree
#[derive(Parser, Debug)]
#[command(name = "mediatree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Turn debugging information on (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Additional config file, layered over the global one
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the filtered catalog tree
    Tree(TreeArgs),

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Debug, Default)]
pub struct TreeArgs {
    /// Catalog file (TOML)
    #[arg(value_hint = ValueHint::FilePath)]
    pub catalog: PathBuf,

    /// Case-insensitive substring match on names
    #[arg(short, long)]
    pub search: Option<String>,

    /// Search also matches original names and plots
    #[arg(short, long)]
    pub metadata: bool,

    /// Only watched (true) or unwatched (false) titles and episodes
    #[arg(short, long)]
    pub watched: Option<bool>,

    /// Earliest release year
    #[arg(long)]
    pub year_min: Option<i32>,

    /// Latest release year
    #[arg(long)]
    pub year_max: Option<i32>,

    /// Titles carrying this genre
    #[arg(short, long)]
    pub genre: Option<String>,

    /// Print visible/total counts after the tree
    #[arg(long)]
    pub stats: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print a config template
    Template,

    /// Show config and filter state paths
    Path,
}
