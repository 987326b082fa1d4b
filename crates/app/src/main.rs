use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use restaurant_discovery_core::{
    filter_restaurants, format_distance_from, format_price_level, format_rating, Coordinate,
    DiscoveryOptions, DiscoveryPipeline, DiscoveryReport, DiscoveryRequest, FixturePlaces,
    GooglePlacesClient, MemoryImageCache, PlaceLookup, DEFAULT_CACHE_BUDGET_BYTES,
    DEFAULT_COUNTRY_CODE, DEFAULT_PLACES_URL, DEFAULT_RADIUS_METERS,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "restaurant-discovery", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Places API base URL
    #[arg(long, env = "PLACES_URL", default_value = DEFAULT_PLACES_URL)]
    places_url: String,

    /// Places API key
    #[arg(long, env = "PLACES_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Serve places from a JSON fixture instead of the network.
    #[arg(long, env = "PLACES_FIXTURE")]
    fixture: Option<PathBuf>,

    /// Timeout applied to each provider call.
    #[arg(long, default_value = "10")]
    timeout_secs: u64,

    /// Largest photo edge requested from the provider.
    #[arg(long, default_value = "800")]
    photo_max_px: u32,

    /// Memory budget of the image cache.
    #[arg(long, default_value_t = DEFAULT_CACHE_BUDGET_BYTES)]
    image_cache_bytes: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Restaurants around a coordinate, closest first.
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Search radius in meters.
        #[arg(long, default_value_t = DEFAULT_RADIUS_METERS)]
        radius: f64,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Best rated restaurants of a country.
    Countrywide {
        /// ISO 3166-1 alpha-2 country code.
        #[arg(long, default_value = DEFAULT_COUNTRY_CODE)]
        country: String,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Only print restaurants whose name, cuisine or address contains this text.
    #[arg(long)]
    filter: Option<String>,
    /// Print the restaurants as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "restaurant-discovery boot"
    );

    let options = DiscoveryOptions {
        request_timeout: Duration::from_secs(cli.timeout_secs),
        photo_max_px: cli.photo_max_px,
        ..DiscoveryOptions::default()
    };
    let images = Arc::new(MemoryImageCache::new(cli.image_cache_bytes));

    let (request, output) = match cli.command {
        Command::Nearby {
            lat,
            lng,
            radius,
            output,
        } => (
            DiscoveryRequest::Nearby {
                origin: Coordinate::new(lat, lng),
                radius_meters: radius,
            },
            output,
        ),
        Command::Countrywide { country, output } => (
            DiscoveryRequest::Countrywide {
                country_code: country,
            },
            output,
        ),
    };

    let (report, cached_photos) = match (&cli.fixture, &cli.api_key) {
        (Some(path), _) => {
            let places = FixturePlaces::from_path(path)
                .await
                .with_context(|| format!("failed to load fixture {}", path.display()))?;
            discover(places, images, options, &request).await?
        }
        (None, Some(api_key)) => {
            let places = GooglePlacesClient::new(&cli.places_url, api_key.as_str())?;
            discover(places, images, options, &request).await?
        }
        (None, None) => anyhow::bail!("either --api-key or --fixture is required"),
    };

    print_report(&report, cached_photos, &request, &output)
}

async fn discover<P>(
    places: P,
    images: Arc<MemoryImageCache>,
    options: DiscoveryOptions,
    request: &DiscoveryRequest,
) -> anyhow::Result<(DiscoveryReport, usize)>
where
    P: PlaceLookup + Send + Sync + 'static,
{
    let pipeline = DiscoveryPipeline::new(places, Arc::clone(&images), options)?;
    let report = pipeline.discover(request).await?;
    let cached_photos = report
        .restaurants
        .iter()
        .filter_map(|restaurant| restaurant.image_url.as_deref())
        .filter(|uri| images.resolve(pipeline.image_uris(), uri).is_some())
        .count();

    if !report.failures.is_empty() {
        warn!(
            failures = report.failures.len(),
            dropped = report.dropped_count(),
            "discovery finished with failures"
        );
    }
    info!(
        cached_photos,
        cache_bytes = images.used_bytes(),
        "photos cached"
    );
    Ok((report, cached_photos))
}

fn print_report(
    report: &DiscoveryReport,
    cached_photos: usize,
    request: &DiscoveryRequest,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let restaurants = match &output.filter {
        Some(text) => filter_restaurants(&report.restaurants, text),
        None => report.restaurants.clone(),
    };

    if output.json {
        println!("{}", serde_json::to_string_pretty(&restaurants)?);
        return Ok(());
    }

    for restaurant in &restaurants {
        let distance = match request {
            DiscoveryRequest::Nearby { origin, .. } => {
                format!(" {}", format_distance_from(*origin, restaurant))
            }
            DiscoveryRequest::Countrywide { .. } => String::new(),
        };
        println!(
            "{} [{}] rating={} price={}{}",
            restaurant.name,
            restaurant.cuisine,
            format_rating(restaurant.rating),
            format_price_level(restaurant.price_level),
            distance
        );
        if let Some(address) = &restaurant.address {
            println!("  {address}");
        }
    }

    println!(
        "{} restaurants from {} candidates ({} skipped, {} failures, {} photos cached) in {} ms",
        restaurants.len(),
        report.candidate_count,
        report.skipped,
        report.failures.len(),
        cached_photos,
        (report.finished_at - report.started_at).num_milliseconds()
    );
    Ok(())
}
