//! CLI command definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::paths::ROOT_ENV_VAR;

/// skillmart - install plugins from marketplaces and activate their skills
#[derive(Parser, Debug)]
#[command(name = "skillmart")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Install root (defaults to ~/.skillmart)
    #[arg(long, global = true, env = ROOT_ENV_VAR)]
    pub root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Marketplace management
    Marketplace {
        #[command(subcommand)]
        action: MarketplaceCommands,
    },

    /// Plugin management
    Plugin {
        #[command(subcommand)]
        action: PluginCommands,
    },

    /// Inspect and match installed skills
    Skill {
        #[command(subcommand)]
        action: SkillCommands,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Marketplace management subcommands
#[derive(Subcommand, Debug)]
pub enum MarketplaceCommands {
    /// Register a marketplace and cache its index
    Add {
        /// Local path, index URL, git URL or owner/repo
        reference: String,

        /// Name to register the marketplace under
        #[arg(long)]
        name: Option<String>,
    },

    /// Re-fetch a marketplace index
    Update {
        /// Marketplace name
        name: String,
    },

    /// List registered marketplaces
    List,

    /// Unregister a marketplace
    Remove {
        /// Marketplace name
        name: String,
    },
}

/// Plugin management subcommands
#[derive(Subcommand, Debug)]
pub enum PluginCommands {
    /// Install plugins (name, name@marketplace, or a direct source)
    Install {
        /// Plugins to install
        #[arg(required = true)]
        plugins: Vec<String>,

        /// Replace a same-named plugin installed from another source
        #[arg(long)]
        force: bool,
    },

    /// Remove an installed plugin
    Remove {
        /// Plugin name
        name: String,
    },

    /// List installed plugins
    List,

    /// Re-fetch a plugin and install it if it changed
    Update {
        /// Plugin name
        name: String,
    },

    /// Show plugin information
    Info {
        /// Plugin name
        name: String,
    },
}

/// Skill subcommands
#[derive(Subcommand, Debug)]
pub enum SkillCommands {
    /// List skills of every installed plugin
    List,

    /// Rank installed skills against a task description
    Match {
        /// Task description
        #[arg(required = true, num_args = 1..)]
        task: Vec<String>,

        /// Maximum number of skills to return (0 = unlimited)
        #[arg(long)]
        top_k: Option<usize>,

        /// Print the matched skill bodies as an injectable context block
        #[arg(long)]
        inject: bool,
    },
}

/// Settings subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the current settings
    Show,

    /// Change one setting, e.g. `fetch.max_attempts 5`
    Set {
        /// Setting key
        key: String,

        /// New value
        value: String,
    },

    /// Restore default settings
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_batch_install() {
        let cli = Cli::try_parse_from([
            "skillmart",
            "--root",
            "/tmp/sm",
            "plugin",
            "install",
            "ui-polish@local",
            "lint@local",
            "--force",
        ])
        .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/sm")));
        match cli.command {
            Commands::Plugin {
                action: PluginCommands::Install { plugins, force },
            } => {
                assert_eq!(plugins, vec!["ui-polish@local", "lint@local"]);
                assert!(force);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_skill_match_joins_words() {
        let cli = Cli::try_parse_from([
            "skillmart", "--json", "skill", "match", "Refactor", "this", "button", "--top-k", "1",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Skill {
                action: SkillCommands::Match { task, top_k, inject },
            } => {
                assert_eq!(task.join(" "), "Refactor this button");
                assert_eq!(top_k, Some(1));
                assert!(!inject);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_install_requires_a_plugin() {
        assert!(Cli::try_parse_from(["skillmart", "plugin", "install"]).is_err());
    }
}
