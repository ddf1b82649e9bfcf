mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

use cascade::chain::{Chain, Outcome, StageConfig, handler_fn};
use cascade::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Serve(args) => {
            let address = args.address.unwrap_or(config.server.bind_addr);
            cascade::server::run(address, demo_chain()).await?;
        }
    }

    Ok(())
}

/// Two-stage demo pipeline: a health endpoint that defers everything else,
/// then a greeting handler whose 404s fall through to the host default.
fn demo_chain() -> Chain {
    let health = handler_fn(|request, ctx| async move {
        if request.uri().path() == "/health" {
            Ok(Outcome::finalize(axum::Json(
                serde_json::json!({ "status": "ok" }),
            )))
        } else {
            Ok(ctx.next())
        }
    });

    let greeting = handler_fn(|request, _ctx| async move {
        if request.uri().path() == "/" {
            Ok(Outcome::finalize("cascade demo server\n"))
        } else {
            Ok(Outcome::finalize(axum::http::StatusCode::NOT_FOUND))
        }
    });

    Chain::new()
        .stage(health)
        .stage_with(StageConfig::new(greeting).next_if_404(true))
}
