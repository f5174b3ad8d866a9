use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use country_cache::api::{ApiServer, AppState};
use country_cache::config::{AppConfig, StoreBackend};
use country_cache::database_ops::db::Db;
use country_cache::database_ops::{open_store, CountryFilter, GdpSort};
use country_cache::refresh::summary::format_timestamp;
use country_cache::telemetry;
use country_cache::util::env as env_util;

#[derive(Parser, Debug)]
#[command(name = "countries", version, about = "Country cache admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Run the HTTP API server
    Serve,
    /// Fetch both upstreams once, reconcile into the store and rebuild the summary image
    Refresh,
    /// Print record count and last refresh time
    Status,
    /// Print cached countries
    List {
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        currency: Option<String>,
        /// gdp_desc | gdp_asc
        #[arg(long)]
        sort: Option<String>,
    },
    /// Apply pending SQL migrations (postgres backend only)
    Migrate,
}

#[actix_web::main]
async fn main() -> Result<()> {
    env_util::init_env();
    telemetry::init_tracing(telemetry::DEFAULT_FILTER)?;
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::Serve => {
            let store = open_store(&config).await?;
            let state = AppState::from_config(&config, store)?;
            ApiServer::from_config(&config.server).run(state).await?;
        }
        Commands::Refresh => {
            let store = open_store(&config).await?;
            let state = AppState::from_config(&config, store)?;
            let outcome = state.engine.refresh().await?;
            println!(
                "refreshed: total={} upserted={} skipped={} summary={}",
                outcome.total_countries,
                outcome.tally.upserted,
                outcome.tally.skipped,
                outcome
                    .summary_path
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "not written".to_string())
            );
        }
        Commands::Status => {
            let store = open_store(&config).await?;
            println!(
                "total_countries={} last_refreshed_at={}",
                store.count().await?,
                format_timestamp(store.last_refreshed_at().await?)
            );
        }
        Commands::List {
            region,
            currency,
            sort,
        } => {
            let store = open_store(&config).await?;
            let filter = CountryFilter {
                region,
                currency,
                sort: sort.as_deref().and_then(GdpSort::parse),
            };
            for c in store.list(&filter).await? {
                println!(
                    "{:<40} {:<10} {:>14} {:>24}",
                    c.name,
                    c.currency_code.as_deref().unwrap_or("-"),
                    c.population,
                    c.estimated_gdp
                        .map(|g| g.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
        Commands::Migrate => {
            if config.store != StoreBackend::Postgres {
                bail!("migrate requires COUNTRY_STORE=postgres");
            }
            let db = Db::connect_no_migrate(&env_util::db_url()?, config.db_max_connections).await?;
            let applied = db.run_migrations().await?;
            println!("applied {applied} migration(s)");
        }
    }
    Ok(())
}
