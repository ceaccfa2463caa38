mod commands;
mod pages;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use vortex::config::{Backend, VortexConfig};
use vortex::core::category::{Category, CategoryFilter};

/// Vortex: a personal app launcher
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Config file to use instead of ~/.config/vortex/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storage backend, overriding the config file
    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,

    /// Category filter: All or one category
    #[arg(short, long, global = true, default_value = "All", value_parser = parse_filter)]
    filter: CategoryFilter,

    /// Only apps whose name or description contains this text
    #[arg(short, long, global = true, default_value = "")]
    search: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the visible apps (default)
    List,
    /// Show the category strip with counts
    Categories,
    /// Add an app; fields not given are prompted for
    Add(AppFields),
    /// Edit the app at a visible position
    Edit {
        position: usize,
        #[command(flatten)]
        fields: AppFields,
    },
    /// Delete the app at a visible position
    Delete {
        position: usize,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Move the app at FROM onto TO (visible positions)
    Move { from: usize, to: usize },
    /// Open the app at a visible position in the browser
    Open { position: usize },
    /// Show or change the theme
    Theme {
        #[arg(value_enum)]
        mode: Option<ThemeMode>,
    },
    /// Follow the remote table live
    Watch,
    /// Copy the local store into the remote table
    Import {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Manage the remote API key in the system keyring
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct AppFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    url: Option<String>,
    /// Icon image URL
    #[arg(long)]
    icon: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long, value_parser = parse_category)]
    category: Option<Category>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ThemeMode {
    Light,
    Dark,
    Toggle,
}

#[derive(Subcommand, Debug)]
pub enum KeyCommands {
    /// Store the API key for the configured remote URL
    Set { api_key: String },
    /// Remove the stored API key
    Delete,
}

fn parse_filter(s: &str) -> Result<CategoryFilter, String> {
    CategoryFilter::from_name(s).ok_or_else(|| format!("unknown category: {}", s))
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::from_name(s).ok_or_else(|| format!("unknown category: {}", s))
}

fn init_logging() {
    // Logs go to the systemd user journal (`journalctl --user -t vortex -f`).
    // vortex targets at info/debug, everything else at warn.
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("vortex") {
                let max = if vortex::debug_logging() {
                    log::LevelFilter::Debug
                } else {
                    log::LevelFilter::Info
                };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => journal.with_syslog_identifier("vortex".to_string()),
        Err(e) => {
            eprintln!("vortex: journal logging unavailable: {}", e);
            return;
        }
    };
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        // Global max must be Debug so debug logs can pass through when toggled
        log::set_max_level(log::LevelFilter::Debug);
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    let config_path = cli.config.clone().unwrap_or_else(VortexConfig::default_path);
    let config = VortexConfig::load_or_default(&config_path);
    vortex::set_debug_logging(cli.debug || config.debug_logging);

    let backend = cli.backend.unwrap_or(config.backend);
    log::debug!("Using {:?} backend, config {}", backend, config_path.display());

    if let Err(e) = commands::run(cli, config, backend).await {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
