//! birdcast-daily - command-line front end
//!
//! Generates the day's intro, narration and outro for a location, or prints
//! the bird or voice of the day.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use birdcast_common::config::{default_config_path, ensure_directory, RootFolderResolver};
use birdcast_common::time::local_today;
use birdcast_common::Location;
use birdcast_daily::types::entropy_rng;
use birdcast_daily::{Collaborators, DailyConfig, DailyProgramService, ProgramRequest};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "birdcast_daily=info,birdcast_common=info";

/// Command-line arguments for birdcast-daily
#[derive(Parser, Debug)]
#[command(name = "birdcast-daily")]
#[command(about = "Daily bird-of-the-day audio program")]
#[command(version)]
struct Args {
    /// Root folder containing assets
    #[arg(short, long, env = "BIRDCAST_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, env = "BIRDCAST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct PlaceArgs {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Card or device identifier
    #[arg(long, default_value = "default")]
    card: String,

    #[arg(long, default_value = "")]
    city: String,

    #[arg(long, default_value = "")]
    region: String,

    #[arg(long, default_value = "")]
    country: String,
}

impl PlaceArgs {
    fn location(&self) -> Location {
        let mut location = Location::from_coordinates(self.lat, self.lon);
        location.city = self.city.clone();
        location.region = self.region.clone();
        location.country = self.country.clone();
        location
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate today's intro, narration and outro
    Generate {
        #[command(flatten)]
        place: PlaceArgs,

        /// Listener's offset from UTC in minutes
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        utc_offset_minutes: i32,

        /// Directory for intro.mp3, narration.mp3, outro.mp3 and narration.txt
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Print today's bird for a location
    Bird {
        #[command(flatten)]
        place: PlaceArgs,
    },
    /// Print today's voice
    Voice,
}

fn load_config(explicit: Option<&Path>) -> Result<DailyConfig> {
    match explicit.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => DailyConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(DailyConfig::from_env()),
    }
}

async fn write_track(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let path = dir.join(name);
    if bytes.is_empty() {
        warn!(file = %path.display(), "Track is empty; not written");
        return Ok(());
    }
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(file = %path.display(), bytes = bytes.len(), "Wrote track");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let fallback_filter = config
        .common
        .log_level
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let root_folder = RootFolderResolver::new("birdcast-daily")
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&config.common)
        .resolve();
    let assets_dir = config.assets_dir(&root_folder);
    info!(root = %root_folder.display(), assets = %assets_dir.display(), "Starting birdcast-daily");

    let collaborators =
        Collaborators::from_config(&config).context("Failed to build upstream clients")?;
    let service = DailyProgramService::new(collaborators, &config, &assets_dir, entropy_rng());

    let token = CancellationToken::new();
    let tasks = service.spawn_background_tasks(token.clone());

    let outcome = run(&service, args.command).await;

    token.cancel();
    for task in tasks {
        let _ = task.await;
    }
    outcome
}

async fn run(service: &DailyProgramService, command: Command) -> Result<()> {
    match command {
        Command::Generate {
            place,
            utc_offset_minutes,
            out_dir,
        } => {
            ensure_directory(&out_dir)
                .with_context(|| format!("Failed to create {}", out_dir.display()))?;

            let request = ProgramRequest {
                device_id: place.card.clone(),
                location: place.location(),
                utc_offset_minutes,
            };
            let program = service
                .generate_program(&request)
                .await
                .context("Failed to generate program")?;

            write_track(&out_dir, "intro.mp3", &program.intro).await?;
            write_track(&out_dir, "narration.mp3", &program.narration).await?;
            write_track(&out_dir, "outro.mp3", &program.outro).await?;
            write_track(&out_dir, "narration.txt", program.narration_text.as_bytes()).await?;

            println!(
                "{} | {} ({}) | voice {} | {}",
                program.date,
                program.bird.candidate.common_name,
                program.bird.source,
                program.voice.name,
                out_dir.display()
            );
        }
        Command::Bird { place } => {
            let today = local_today();
            let bird = service
                .get_bird_for_location(&place.card, &place.location(), today)
                .await
                .context("No bird available")?;
            println!(
                "{}: {} ({}) via {}",
                today, bird.candidate.common_name, bird.candidate.scientific_name, bird.source
            );
        }
        Command::Voice => {
            let today = local_today();
            let voice = service.get_daily_voice(today);
            println!("{}: {} ({})", today, voice.name, voice.voice_id);
        }
    }
    Ok(())
}
