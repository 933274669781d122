//! Command-line argument parsing for shopinsight.

use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ask natural-language questions about e-commerce ad and sales metrics.
#[derive(Parser, Debug)]
#[command(name = "shopinsight")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Metrics store URL (postgres://... or sqlite:...)
    #[arg(long, global = true, env = "DATABASE_URL", value_name = "URL")]
    pub database_url: Option<String>,

    /// LLM provider: gemini, openai, anthropic or mock
    #[arg(long, global = true, value_name = "PROVIDER")]
    pub llm: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// Address to listen on (e.g., 0.0.0.0:5000)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Create the tables and load sample data before serving
        #[arg(long)]
        seed: bool,
    },
    /// Answer one question and exit
    Ask {
        /// The question, e.g. "What is my total sales?"
        #[arg(required = true, num_args = 1.., value_name = "QUESTION")]
        question: Vec<String>,

        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create the tables and load sample data
    Seed,
    /// Print aggregate statistics as JSON
    Stats,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Applies command-line overrides on top of a loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if let Some(provider) = &self.llm {
            config.llm.provider = provider.clone();
        }
        if let Command::Serve {
            bind: Some(bind), ..
        } = &self.command
        {
            config.server.bind = bind.clone();
        }
    }
}

impl Command {
    /// Returns the question for `ask`, words joined by spaces.
    pub fn question(&self) -> Option<String> {
        match self {
            Self::Ask { question, .. } => Some(question.join(" ")),
            _ => None,
        }
    }
}
