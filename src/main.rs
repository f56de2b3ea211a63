use anyhow::Result;
use clap::{Parser, Subcommand};
use geojson::FeatureCollection;
use std::path::PathBuf;
use tracing::error;

use upazila_map::config::AppConfig;
use upazila_map::style::{CategoryStyles, ColorRamp};
use upazila_map::{data, processing, server};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the map frontend and JSON API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print a classification and selector summary of the configured datasets
    Inspect {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            let app_config = AppConfig::load_from_file(config)?;

            // 1. Load both datasets
            let (population, buildings) = load_datasets(&app_config).await?;

            // 2. Classify, dedup, index and serve
            server::start_server(app_config, population, buildings).await?;
        }
        Commands::Inspect { config } => {
            let app_config = AppConfig::load_from_file(config)?;
            let (population, buildings) = load_datasets(&app_config).await?;
            inspect(&app_config, &population, &buildings)?;
        }
    }

    Ok(())
}

// The two collections load concurrently on the blocking pool and are joined
// here; nothing downstream starts until both are in. A failed load is
// reported to the log sink and aborts the rest of the setup.
async fn load_datasets(config: &AppConfig) -> Result<(FeatureCollection, FeatureCollection)> {
    let population_path = config.input.population_geojson.clone();
    let building_path = config.input.building_geojson.clone();

    let population =
        tokio::task::spawn_blocking(move || data::load_feature_collection(&population_path));
    let buildings =
        tokio::task::spawn_blocking(move || data::load_feature_collection(&building_path));

    let (population, buildings) = tokio::try_join!(population, buildings)?;

    match (population, buildings) {
        (Ok(population), Ok(buildings)) => Ok((population, buildings)),
        (Err(e), _) | (_, Err(e)) => {
            error!("Dataset load failed: {e:#}");
            Err(e)
        }
    }
}

fn inspect(
    config: &AppConfig,
    population: &FeatureCollection,
    buildings: &FeatureCollection,
) -> Result<()> {
    let ramp = ColorRamp::from_config(&config.style.population.buckets)?;
    let styles = CategoryStyles::from_config(&config.style.buildings)?;

    let upazilas = data::extract_upazilas(population, &config.input.fields);
    let pop = processing::summarize_population(&upazilas, &ramp);
    let bld = processing::summarize_buildings(buildings, &config.input.fields, &styles);

    println!("Population dataset: {} features", pop.features);
    println!("  selector entries:  {}", pop.selector_entries);
    println!("  missing code/name: {}", pop.missing_identity);
    println!("  duplicate codes:   {}", pop.duplicate_codes);
    println!("  bucket histogram:");
    for (bucket, count) in ramp.buckets().iter().zip(&pop.bucket_counts) {
        println!("    {:>15}  {}  {}", bucket.label(), bucket.color, count);
    }

    println!("Building dataset: {} features", bld.features);
    for (category, count) in &bld.category_counts {
        println!(
            "    {:>15}  {}  {}",
            category,
            styles.resolve(Some(category)),
            count
        );
    }
    println!("  default-styled:    {}", bld.defaulted);

    Ok(())
}
