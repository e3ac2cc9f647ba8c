//! # Rates Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the store adapter and the provider gateways
//! - Serve the HTTP API, or run a one-shot refresh (cron entry points)

mod config;

use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rates_hex::{RateService, RateUpdater, inbound::HttpServer};
use rates_providers::default_providers;
use rates_repo::build_repo;
use rates_types::ProviderUpdateReport;

#[derive(Parser)]
#[command(name = "rates")]
#[command(author, version, about = "Exchange-rate aggregation service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve,
    /// Update rates of the specified day (default today)
    Update {
        /// Date in format 'yyyy-mm-dd'
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Update rates since the origin date
    UpdateAll {
        /// Date in format 'yyyy-mm-dd'
        #[arg(long, default_value = "2015-01-01")]
        origin_date: NaiveDate,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rates_app=debug,rates_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = config::Config::from_env()?;

    // Build the store (handles connection and migration) and the gateways
    let repo = build_repo(&config.database_url).await?;
    let providers = default_providers(config.base_currency, &config.secrets)?;

    match cli.command {
        Commands::Serve => {
            tracing::info!("Starting rates server on port {}", config.port);
            tracing::info!("Using database: {}", config.database_url);

            let service = RateService::new(
                repo,
                providers,
                config.base_currency,
                config.supported_currencies,
            );
            let server = HttpServer::new(service);
            let addr = format!("0.0.0.0:{}", config.port);

            server.run(&addr).await?;
        }
        Commands::Update { date } => {
            let date_of_exchange = date.unwrap_or_else(|| Utc::now().date_naive());
            let updater = RateUpdater::new(repo, providers, config.supported_currencies);

            // Vendor quotas renew monthly; the run date is the reset signal.
            if date_of_exchange.day() == 1 {
                updater.reset_request_limits();
            }

            let reports = updater.update_all_rates_by_date(date_of_exchange).await;
            summarize(&reports)?;
        }
        Commands::UpdateAll { origin_date } => {
            let updater = RateUpdater::new(repo, providers, config.supported_currencies);
            let reports = updater.update_all_historical_rates(origin_date).await;
            summarize(&reports)?;
        }
    }

    Ok(())
}

fn summarize(reports: &[ProviderUpdateReport]) -> anyhow::Result<()> {
    let succeeded = reports.iter().filter(|r| r.is_success()).count();
    tracing::info!(succeeded, total = reports.len(), "refresh finished");
    if succeeded == 0 && !reports.is_empty() {
        anyhow::bail!("no provider produced any rates");
    }
    Ok(())
}
