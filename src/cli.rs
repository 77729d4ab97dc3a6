//! Command-line interface definitions.
//!
//! Global options pick the config file and override the values most often
//! supplied from the environment; subcommands select the operation.
//!
//! # Examples
//!
//! ```sh
//! # One manual scrape run
//! iqx_rewrite run
//!
//! # Scheduled runs with the API key from the environment
//! IQX_API_KEY=sk-... iqx_rewrite --config /etc/iqx.yaml watch
//!
//! # Inspect and operate on stored articles
//! iqx_rewrite list --page 2 --per-page 10
//! iqx_rewrite rewrite --id 17
//! iqx_rewrite publish --id 17
//! ```

use crate::config::Overrides;
use crate::models::ArticleId;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, default_value = "iqx.yaml")]
    pub config: PathBuf,

    /// Chat-completion API key
    #[arg(long, env = "IQX_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Listing page to scrape
    #[arg(long, env = "IQX_TARGET_URL")]
    pub target_url: Option<String>,

    /// Articles to rewrite per run (1-50)
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Scrape once, now
    Run,
    /// Scrape on the configured schedule until interrupted
    Watch,
    /// List stored articles, newest first
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        per_page: usize,
    },
    /// Show articles still waiting for a rewrite, oldest first
    Pending {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Rewrite a stored article again
    Rewrite {
        #[arg(long)]
        id: ArticleId,
    },
    /// Publish a rewritten article
    Publish {
        #[arg(long)]
        id: ArticleId,
    },
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            target_url: self.target_url.clone(),
            api_key: self.api_key.clone(),
            limit: self.limit,
        }
    }
}
