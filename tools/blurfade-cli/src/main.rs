//! Blur & Fade CLI: apply blur and bottom fade to an image or video.
//!
//! Usage:
//!   blurfade edit <INPUT> [OPTIONS]   Apply effects and save the result
//!   blurfade filters [OPTIONS]        Print the ffmpeg arguments for a preset
//!   blurfade check                    Check encoder availability

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use blurfade_common::config::AppConfig;
use blurfade_media_model::{PresetLevel, VideoContainer};

mod commands;

#[derive(Parser)]
#[command(
    name = "blurfade",
    about = "Blur and fade images and videos",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply effects to a file and save the edited copy
    Edit {
        /// Image or video to edit
        input: PathBuf,

        /// Blur preset: light|middle|full
        #[arg(long)]
        blur: Option<PresetLevel>,

        /// Fade preset: light|middle|full
        #[arg(long)]
        fade: Option<PresetLevel>,

        /// Exact blur intensity (overrides --blur)
        #[arg(long)]
        blur_value: Option<f64>,

        /// Exact fade intensity, 0-200 (overrides --fade)
        #[arg(long)]
        fade_value: Option<f64>,

        /// Directory to save the edited file into
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Video output container
        #[arg(long, value_enum)]
        container: Option<ContainerArg>,
    },

    /// Print the ffmpeg arguments for a set of effects
    Filters {
        /// Blur preset: light|middle|full
        #[arg(long)]
        blur: Option<PresetLevel>,

        /// Fade preset: light|middle|full
        #[arg(long)]
        fade: Option<PresetLevel>,

        /// Video output container
        #[arg(long, value_enum, default_value = "mp4")]
        container: ContainerArg,

        /// Print as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Check encoder availability
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ContainerArg {
    Mp4,
    Webm,
}

impl From<ContainerArg> for VideoContainer {
    fn from(arg: ContainerArg) -> Self {
        match arg {
            ContainerArg::Mp4 => VideoContainer::Mp4,
            ContainerArg::Webm => VideoContainer::Webm,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::try_load_from(path)?,
        None => AppConfig::default(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    blurfade_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Edit {
            input,
            blur,
            fade,
            blur_value,
            fade_value,
            output_dir,
            container,
        } => {
            commands::edit::run(commands::edit::EditArgs {
                input,
                blur,
                fade,
                blur_value,
                fade_value,
                output_dir,
                container: container.map(VideoContainer::from),
                config,
            })
            .await
        }
        Commands::Filters {
            blur,
            fade,
            container,
            json,
        } => commands::filters::run(blur, fade, container.into(), json),
        Commands::Check => commands::check::run(config).await,
    }
}
