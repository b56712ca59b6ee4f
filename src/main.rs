use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tuberss::app::AppContext;
use tuberss::cli::{commands, Cli, Commands};
use tuberss::config::Config;
use tuberss::domain::FeedKey;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(workers) = cli.workers {
        config.feed.workers = workers;
    }

    let ctx = AppContext::new(config, cli.db)?;

    match cli.command {
        Commands::Refresh { kind, id, force } => {
            let key = FeedKey::new(kind, id)?;
            commands::refresh_feed(&ctx, &key, force).await?;
        }
        Commands::Render {
            kind,
            id,
            format,
            embed,
            output,
            offline,
        } => {
            let key = FeedKey::new(kind, id)?;
            commands::render_feed(&ctx, &key, format, embed, output.as_deref(), offline).await?;
        }
        Commands::Update => {
            commands::update_feeds(&ctx).await?;
        }
        Commands::List => {
            commands::list_feeds(&ctx)?;
        }
        Commands::Remove { kind, id } => {
            let key = FeedKey::new(kind, id)?;
            commands::remove_feed(&ctx, &key)?;
        }
    }

    Ok(())
}
