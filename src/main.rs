use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use coletor::app::AppContext;
use coletor::cli::{commands, Cli, Commands};
use coletor::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env();
    if let Some(db) = cli.db {
        config.store.path = Some(db);
    }

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let ctx = Arc::new(AppContext::new(config)?);
            coletor::api::serve(ctx, &bind).await?;
        }
        Commands::Scrape { url } => {
            let ctx = AppContext::new(config)?;
            commands::scrape_url(&ctx, &url).await?;
        }
        Commands::Enqueue { urls } => {
            let ctx = AppContext::new(config)?;
            commands::enqueue_urls(&ctx, &urls)?;
        }
        Commands::RunBatch => {
            let ctx = AppContext::new(config)?;
            commands::run_batch(&ctx).await?;
        }
    }

    Ok(())
}
