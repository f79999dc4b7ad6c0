//! Scheduled catalog sync, meant to be run from cron.
//!
//! Drives the same resumable sync the dashboard uses until it completes,
//! under its own cursor owner so it never collides with a browser session.

use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockroom_backend::{external::WooCommerceClient, services::SyncService, Config};
use shared::SyncStatus;

/// `stockroom-sync` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stockroom-sync",
    about = "Sync the WooCommerce catalog into the physical inventory",
    version
)]
struct CliArgs {
    /// Refresh catalog fields of products that already exist locally.
    #[arg(long)]
    full: bool,
    /// Cursor owner key.
    #[arg(long, env = "STOCKROOM_SYNC_OWNER", default_value = "cron")]
    owner: String,
    /// Drop any half-finished run for this owner before starting.
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockroom_sync=info,stockroom_backend=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(args).await {
        Ok(SyncStatus::Completed) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(error) => {
            tracing::error!(error = %error, "Sync aborted");
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> anyhow::Result<SyncStatus> {
    let config = Config::load()?;

    let db_pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    let store = WooCommerceClient::new(&config.woocommerce)?;
    let service = SyncService::new(db_pool, store, &config);

    if args.reset && service.reset(&args.owner).await? {
        println!("Discarded unfinished sync for owner '{}'", args.owner);
    }

    println!(
        "Starting {} sync at {}",
        if args.full { "full" } else { "incremental" },
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S")
    );
    let started = Instant::now();

    let result = service.run_to_completion(&args.owner, args.full).await?;

    println!("Sync finished in {:.1}s", started.elapsed().as_secs_f64());
    println!("status={}", result.status.as_str());
    println!("products_added={}", result.products_added);
    println!("products_updated={}", result.products_updated);
    println!("variations_added={}", result.variations_added);
    println!("variations_updated={}", result.variations_updated);
    println!("total_products={}", result.total_products);
    for error in &result.errors {
        println!("error: {}", error);
    }

    Ok(result.status)
}
