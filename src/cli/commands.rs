//! Command dispatch

use std::io;
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::filters::{
    FilterConfig, GENRE_FILTER, WATCHED_FILTER, YEAR_FILTER,
};
use crate::application::services::CatalogBrowser;
use crate::cli::args::{Cli, Commands, ConfigCommands, TreeArgs};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InMemoryCatalog;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Tree(args)) => cmd_tree(cli, args),
        Some(Commands::Config { command }) => cmd_config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see `mediatree --help`".to_string(),
        )),
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    Ok(Settings::load(cli.config.as_deref())?)
}

#[instrument(level = "debug", skip(cli))]
fn cmd_tree(cli: &Cli, args: &TreeArgs) -> CliResult<()> {
    if let (Some(min), Some(max)) = (args.year_min, args.year_max) {
        if min > max {
            return Err(CliError::InvalidArgs(format!(
                "--year-min {} is after --year-max {}",
                min, max
            )));
        }
    }
    let mut settings = load_settings(cli)?;
    settings.search_metadata |= args.metadata;
    let container = ServiceContainer::new(settings);

    let catalog = InMemoryCatalog::from_file(container.fs.as_ref(), &args.catalog)?;
    let mut browser = container.browser(Arc::new(catalog));
    let report = browser.open()?;
    for (id, e) in &report.skipped {
        output::warning(&format!("title {} left out: {}", id, e));
    }

    apply_filter_args(&mut browser, args)?;

    let root = args.catalog.display().to_string();
    let rendered = output::render_projection(&root, browser.tree(), browser.projection());
    output::info(&rendered);

    if args.stats {
        output::header("visible/total");
        for line in output::stats_lines(&browser.stats()) {
            output::detail(&line);
        }
    }
    Ok(())
}

fn apply_filter_args(browser: &mut CatalogBrowser, args: &TreeArgs) -> CliResult<()> {
    if let Some(text) = &args.search {
        browser.set_search_text(text)?;
    }
    if let Some(watched) = args.watched {
        browser.set_filter_config(WATCHED_FILTER, FilterConfig::Flag(watched))?;
        browser.set_filter_active(WATCHED_FILTER, true)?;
    }
    if args.year_min.is_some() || args.year_max.is_some() {
        browser.set_filter_config(YEAR_FILTER, FilterConfig::range(args.year_min, args.year_max))?;
        browser.set_filter_active(YEAR_FILTER, true)?;
    }
    if let Some(genre) = &args.genre {
        browser.set_filter_config(GENRE_FILTER, FilterConfig::text(genre.as_str()))?;
        browser.set_filter_active(GENRE_FILTER, true)?;
    }
    debug!(
        "apply_filter_args: active={}",
        browser.filters().has_active_filters()
    );
    Ok(())
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            let settings = load_settings(cli)?;
            match global_config_path() {
                Some(path) => output::info(&format!("global: {}", path.display())),
                None => output::info("global: <no config directory>"),
            }
            if let Some(path) = &cli.config {
                output::info(&format!("file:   {}", path.display()));
            }
            output::info(&format!(
                "filters: {}",
                settings.filter_state_file.display()
            ));
        }
    }
    Ok(())
}
