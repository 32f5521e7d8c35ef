pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "coletor")]
#[command(about = "Headless-browser article scraper with a retry queue", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite document store (overrides config and environment)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API
    Serve {
        /// Address to listen on, e.g. "0.0.0.0:8000"
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Scrape a single URL and print the extracted article
    Scrape {
        /// URL of the article
        url: String,
    },
    /// Queue URLs for the next retry batch
    Enqueue {
        /// URLs to queue
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Run one retry batch in the foreground
    RunBatch,
}
