use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use freshet::app::AppContext;
use freshet::cli::{commands, Cli, Commands};
use freshet::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(api) = cli.api {
        config.api.base_url = api;
    }
    if let Some(owner) = cli.owner {
        config.feed.owner = Some(owner);
    }

    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Show => commands::show(&ctx).await?,
        Commands::Refresh => commands::refresh(&ctx).await?,
        Commands::More => commands::more(&ctx).await?,
        Commands::Previous => commands::previous(&ctx).await?,
        Commands::Poll => commands::poll(&ctx).await?,
        Commands::Reveal => commands::reveal(&ctx).await?,
        Commands::Watch { interval } => commands::watch(&ctx, &interval).await?,
        Commands::Status => commands::status(&ctx).await?,
        Commands::Clear => commands::clear(&ctx).await?,
    }

    Ok(())
}
