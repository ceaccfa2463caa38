mod local;
mod remote;

use dialoguer::{Confirm, Input, Select};
use thiserror::Error;

use vortex::config::{Backend, ConfigError, VortexConfig};
use vortex::core::app::AppDraft;
use vortex::core::category::{Category, CategoryFilter};
use vortex::core::theme::Theme;
use vortex::store::storage::LocalStorage;
use vortex::sync::keyring;

use crate::{AppFields, Cli, Commands, KeyCommands, ThemeMode};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("no app at position {position} ({visible} visible)")]
    NoSuchPosition { position: usize, visible: usize },
    #[error("`{0}` needs the remote backend")]
    NeedsRemote(&'static str),
    #[error("{0}")]
    Remote(String),
    #[error("command not available here: {0}")]
    Unsupported(String),
}

/// Filter and search applied before positions are resolved.
pub struct ViewArgs {
    pub filter: CategoryFilter,
    pub search: String,
}

pub async fn run(cli: Cli, config: VortexConfig, backend: Backend) -> CmdResult {
    let view = ViewArgs {
        filter: cli.filter,
        search: cli.search,
    };
    match cli.command.unwrap_or(Commands::List) {
        Commands::Theme { mode } => theme(&config, mode),
        Commands::Key { command } => key(&config, command).await,
        Commands::Import { yes } => remote::import(&config, yes).await,
        Commands::Watch => match backend {
            Backend::Remote => remote::watch(&config, &view).await,
            Backend::Local => Err(CliError::NeedsRemote("watch").into()),
        },
        command => match backend {
            Backend::Local => local::run(&config, &view, command),
            Backend::Remote => remote::run(&config, &view, command).await,
        },
    }
}

/// 1-based visible position to 0-based index.
pub fn index_of(position: usize, visible: usize) -> Result<usize, CliError> {
    if position == 0 || position > visible {
        Err(CliError::NoSuchPosition { position, visible })
    } else {
        Ok(position - 1)
    }
}

pub fn confirm(prompt: String, yes: bool) -> Result<bool, dialoguer::Error> {
    if yes {
        return Ok(true);
    }
    Confirm::new().with_prompt(prompt).default(false).interact()
}

fn prompt_text(label: &str) -> Result<String, dialoguer::Error> {
    Input::<String>::new().with_prompt(label).interact_text()
}

fn prompt_category() -> Result<Category, dialoguer::Error> {
    let labels: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    let choice = Select::new()
        .with_prompt("Category")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(Category::ALL[choice])
}

impl AppFields {
    /// Draft for a new entry, prompting for every field not given.
    pub fn into_new_draft(self) -> Result<AppDraft, dialoguer::Error> {
        let name = match self.name {
            Some(v) => v,
            None => prompt_text("Name")?,
        };
        let url = match self.url {
            Some(v) => v,
            None => prompt_text("URL")?,
        };
        let icon = match self.icon {
            Some(v) => v,
            None => prompt_text("Icon URL")?,
        };
        let description = match self.description {
            Some(v) => v,
            None => prompt_text("Description")?,
        };
        let category = match self.category {
            Some(v) => v,
            None => prompt_category()?,
        };
        Ok(AppDraft {
            name,
            url,
            icon,
            description,
            category,
        })
    }

    /// `current` with the given fields replaced.
    pub fn merged_into(self, current: AppDraft) -> AppDraft {
        AppDraft {
            name: self.name.unwrap_or(current.name),
            url: self.url.unwrap_or(current.url),
            icon: self.icon.unwrap_or(current.icon),
            description: self.description.unwrap_or(current.description),
            category: self.category.unwrap_or(current.category),
        }
    }
}

fn theme(config: &VortexConfig, mode: Option<ThemeMode>) -> CmdResult {
    let storage = LocalStorage::new(&config.data_directory);
    let current = storage.load_theme();
    let next = match mode {
        None => current,
        Some(ThemeMode::Light) => Theme::Light,
        Some(ThemeMode::Dark) => Theme::Dark,
        Some(ThemeMode::Toggle) => current.toggled(),
    };
    if next != current {
        storage.save_theme(next)?;
    }
    println!("{}", next.label());
    Ok(())
}

async fn key(config: &VortexConfig, command: KeyCommands) -> CmdResult {
    if !config.remote.is_configured() {
        return Err(ConfigError::RemoteNotConfigured.into());
    }
    let url = config.remote.url.trim();
    match command {
        KeyCommands::Set { api_key } => {
            keyring::store_api_key(url, &api_key).await?;
            println!("Stored API key for {}", url);
        }
        KeyCommands::Delete => {
            keyring::delete_api_key(url).await?;
            println!("Removed API key for {}", url);
        }
    }
    Ok(())
}
