//! Command-line interface.
//!
//! Flags override the config file for a single run; `--persist` writes the
//! overridden config back so later runs pick it up.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Overrides, StorageType};
use crate::providers::Provider;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Comma-separated keywords, replacing the configured list
    #[arg(short, long)]
    pub keywords: Option<String>,

    /// Where to store news
    #[arg(short = 't', long, value_enum)]
    pub storage_type: Option<StorageType>,

    /// Search provider
    #[arg(short = 'a', long = "api", value_enum)]
    pub api: Option<Provider>,

    /// API key for the search provider
    #[arg(long)]
    pub api_key: Option<String>,

    /// Save the overridden settings back to the config file
    #[arg(long)]
    pub persist: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch news for every keyword and save it (default)
    Run,
    /// Print stored news, newest first
    List {
        /// Only show news carrying this tag
        #[arg(long)]
        tag: Option<String>,

        /// Maximum number of entries
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            keywords: self.keywords.clone(),
            storage_type: self.storage_type,
            api_provider: self.api,
            api_key: self.api_key.clone(),
        }
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_run() {
        let cli = Cli::parse_from(["news-harvester"]);

        assert_eq!(cli.command(), Command::Run);
        assert!(!cli.persist);
        assert!(cli.overrides().keywords.is_none());
    }

    #[test]
    fn test_override_flags() {
        let cli = Cli::parse_from([
            "news-harvester",
            "-k",
            "AI,机器学习",
            "-t",
            "relational",
            "--api",
            "newsapi",
            "--api-key",
            "k",
            "--persist",
        ]);

        let overrides = cli.overrides();
        assert_eq!(overrides.keywords.as_deref(), Some("AI,机器学习"));
        assert_eq!(overrides.storage_type, Some(StorageType::Sqlite));
        assert_eq!(overrides.api_provider, Some(Provider::NewsApi));
        assert!(cli.persist);
    }

    #[test]
    fn test_list_subcommand() {
        let cli = Cli::parse_from(["news-harvester", "list", "--tag", "AI", "-n", "5"]);

        assert_eq!(
            cli.command(),
            Command::List {
                tag: Some("AI".to_string()),
                limit: 5
            }
        );
    }
}
