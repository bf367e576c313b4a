//! Commands
//!
//! One function per CLI subcommand. Each returns a `CommandOutput` holding
//! both the serializable result and its human-readable rendering; `main`
//! picks one based on `--json`.

pub mod config;
pub mod marketplace;
pub mod plugins;
pub mod skills;

use serde::Serialize;

use crate::cli::{Cli, Commands, ConfigCommands, MarketplaceCommands, PluginCommands, SkillCommands};
use crate::models::response::CommandResponse;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

/// Result of one command invocation
#[derive(Debug)]
pub struct CommandOutput {
    pub data: serde_json::Value,
    pub text: String,
    /// Per-item failures of a batch command that otherwise ran
    pub failures: Vec<AppError>,
}

impl CommandOutput {
    pub fn new<T: Serialize>(data: &T, text: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            data: serde_json::to_value(data)?,
            text: text.into(),
            failures: Vec::new(),
        })
    }

    pub fn with_failures(mut self, failures: Vec<AppError>) -> Self {
        self.failures = failures;
        self
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Text for stdout.
    pub fn render(&self, json: bool) -> AppResult<String> {
        if json {
            let response = CommandResponse::partial(&self.data, &self.failures);
            Ok(serde_json::to_string_pretty(&response)?)
        } else {
            Ok(self.text.clone())
        }
    }
}

/// Run the parsed command line.
pub async fn dispatch(cli: Cli) -> AppResult<CommandOutput> {
    let mut state = AppState::open(cli.root.as_deref())?;

    match cli.command {
        Commands::Marketplace { action } => match action {
            MarketplaceCommands::Add { reference, name } => {
                marketplace::add(&state, &reference, name.as_deref()).await
            }
            MarketplaceCommands::Update { name } => marketplace::update(&state, &name).await,
            MarketplaceCommands::List => marketplace::list(&state),
            MarketplaceCommands::Remove { name } => marketplace::remove(&state, &name),
        },

        Commands::Plugin { action } => match action {
            PluginCommands::Install { plugins: targets, force } => {
                plugins::install(&state, &targets, force).await
            }
            PluginCommands::Remove { name } => plugins::remove(&state, &name),
            PluginCommands::List => plugins::list(&state),
            PluginCommands::Update { name } => plugins::update(&state, &name).await,
            PluginCommands::Info { name } => plugins::info(&state, &name),
        },

        Commands::Skill { action } => match action {
            SkillCommands::List => skills::list(&state),
            SkillCommands::Match { task, top_k, inject } => {
                skills::match_task(&state, &task.join(" "), top_k, inject)
            }
        },

        Commands::Config { action } => match action {
            ConfigCommands::Show => config::show(&state),
            ConfigCommands::Set { key, value } => config::set(&mut state, &key, &value),
            ConfigCommands::Reset => config::reset(&mut state),
        },
    }
}
