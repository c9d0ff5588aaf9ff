//! vehdata - vehicle registry lookups from the command line
//!
//! Builds one [`VehicleDataClient`] per run, executes a single command and
//! prints the result as pretty JSON on stdout. Logs go to stderr (or the
//! configured log file) so stdout stays machine-readable.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vehdata_client::cache::{DurableStore, SqliteStore};
use vehdata_client::{vin, ClientConfig, VehicleDataClient};
use vehdata_common::config::{
    load_toml_config, resolve_config_path, resolve_root_folder, LoggingConfig,
};
use vehdata_common::db::{init_database, CACHE_DB_FILE};

/// Command-line arguments for vehdata
#[derive(Parser, Debug)]
#[command(name = "vehdata")]
#[command(about = "Normalized, cached access to public vehicle registries")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "VEHDATA_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the durable cache database
    #[arg(short, long, env = "VEHDATA_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Cache in memory only for this run
    #[arg(long)]
    no_durable_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a VIN offline and show its structure
    Validate { vin: String },
    /// Decode a VIN into its specification
    Decode { vin: String },
    /// Recall campaigns for a vehicle
    Recalls(VehicleArgs),
    /// Consumer complaints for a vehicle
    Complaints(VehicleArgs),
    /// Crash-test ratings for a vehicle
    Safety(VehicleArgs),
    /// Fuel-economy lookups
    #[command(subcommand)]
    Fuel(FuelCommand),
    /// Cache maintenance
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(clap::Args, Debug)]
struct VehicleArgs {
    #[arg(long)]
    year: u16,
    #[arg(long)]
    make: String,
    #[arg(long)]
    model: String,
}

#[derive(Subcommand, Debug)]
enum FuelCommand {
    /// List engine/transmission variants
    Search(VehicleArgs),
    /// Pick one variant by engine attributes
    Match {
        #[command(flatten)]
        vehicle: VehicleArgs,
        #[arg(long)]
        cylinders: Option<u32>,
        /// Displacement in liters
        #[arg(long)]
        displacement: Option<f64>,
    },
    /// Figures for one registry vehicle id
    Get { id: String },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Empty both cache tiers
    Clear,
    /// Remove expired durable entries
    Purge,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path)?,
        None => Default::default(),
    };

    init_tracing(&toml_config.logging)?;

    info!(
        "Starting vehdata v{} ({:?})",
        env!("CARGO_PKG_VERSION"),
        args.command
    );

    // Offline; no client or database needed
    if let Command::Validate { vin } = &args.command {
        return print_json(&validation_report(vin));
    }

    let config = ClientConfig::resolve(&toml_config)?;

    let pool = if config.durable_enabled && !args.no_durable_cache {
        let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml_config);
        let db_path = root_folder.join(CACHE_DB_FILE);
        info!("Cache database: {}", db_path.display());
        Some(
            init_database(&db_path)
                .await
                .context("Failed to open cache database")?,
        )
    } else {
        info!("Durable cache disabled; caching in memory only");
        None
    };

    let durable = pool
        .clone()
        .map(|pool| Arc::new(SqliteStore::new(pool)) as Arc<dyn DurableStore>);
    let client = VehicleDataClient::new(&config, durable)?;

    let outcome = run(&client, args.command).await;

    client.flush_cache_writes().await;
    if let Some(pool) = pool {
        pool.close().await;
    }

    outcome
}

async fn run(client: &VehicleDataClient, command: Command) -> Result<()> {
    match command {
        Command::Validate { vin } => print_json(&validation_report(&vin)),
        Command::Decode { vin } => print_json(&client.decode_vin(&vin).await?),
        Command::Recalls(v) => print_json(&client.get_recalls(&v.make, &v.model, v.year).await?),
        Command::Complaints(v) => {
            print_json(&client.get_complaints(&v.make, &v.model, v.year).await?)
        }
        Command::Safety(v) => {
            print_json(&client.get_safety_ratings(v.year, &v.make, &v.model).await?)
        }
        Command::Fuel(FuelCommand::Search(v)) => {
            print_json(&client.search_fuel_economy(v.year, &v.make, &v.model).await?)
        }
        Command::Fuel(FuelCommand::Match {
            vehicle: v,
            cylinders,
            displacement,
        }) => {
            let id = client
                .match_fuel_economy(v.year, &v.make, &v.model, cylinders, displacement)
                .await?;
            if id.is_none() {
                warn!("No fuel economy variants listed for {} {} {}", v.year, v.make, v.model);
            }
            print_json(&json!({ "id": id }))
        }
        Command::Fuel(FuelCommand::Get { id }) => print_json(&client.get_fuel_economy(&id).await?),
        Command::Cache(CacheCommand::Clear) => {
            client.clear_cache().await;
            print_json(&json!({ "cleared": true }))
        }
        Command::Cache(CacheCommand::Purge) => {
            let purged = client.purge_expired_cache().await;
            print_json(&json!({ "purged": purged }))
        }
    }
}

fn validation_report(raw: &str) -> serde_json::Value {
    match vin::validate(raw) {
        Ok(normalized) => {
            let structure = vin::parse_structure(&normalized);
            let model_years = structure
                .as_ref()
                .map(|s| s.model_year_candidates())
                .unwrap_or_default();
            json!({
                "vin": normalized,
                "valid": true,
                "structure": structure,
                "modelYearCandidates": model_years,
            })
        }
        Err(e) => json!({
            "vin": vin::normalize(raw),
            "valid": false,
            "error": e.to_string(),
        }),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// RUST_LOG wins over the configured level; logs never go to stdout
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match &logging.log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    let stderr_layer = file_layer
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(())
}
