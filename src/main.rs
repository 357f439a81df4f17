// SPDX-License-Identifier: GPL-3.0-only

use clap::{Args, Parser, Subcommand};
use retrocam::backends::camera::CameraBackendType;
use retrocam::constants::{app_info, retro};
use retrocam::{AppResult, Config, FilterType, PixelSize, i18n};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "retrocam")]
#[command(about = "Camera preview with retro pixel filters and a QR code panel")]
#[command(version = app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    overrides: Overrides,
}

/// Per-run overrides of the config file
#[derive(Args)]
struct Overrides {
    /// Frame source: v4l2, file or test-pattern
    #[arg(long, global = true)]
    backend: Option<CameraBackendType>,

    /// V4L2 device path (e.g. /dev/video0)
    #[arg(long, global = true)]
    device: Option<String>,

    /// Image file for the file backend (implies --backend file)
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Initial filter: none, grayscale, sepia, invert or retro
    #[arg(long, global = true)]
    filter: Option<FilterType>,

    /// Retro mosaic block size in pixels
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(retro::MIN_PIXEL_SIZE as i64..=retro::MAX_PIXEL_SIZE as i64))]
    pixel_size: Option<u8>,

    /// String encoded in the QR panel
    #[arg(long, global = true)]
    qr_data: Option<String>,

    /// UI language (e.g. en, ko)
    #[arg(long, global = true)]
    language: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(device) = self.device {
            config.device_path = Some(device);
        }
        if let Some(file) = self.file {
            config.file_source = Some(file);
            if self.backend.is_none() {
                config.backend = CameraBackendType::File;
            }
        }
        if let Some(filter) = self.filter {
            config.initial_filter = filter;
        }
        if let Some(size) = self.pixel_size.and_then(PixelSize::new) {
            config.initial_pixel_size = size;
        }
        if let Some(data) = self.qr_data {
            config.qr_data = data;
        }
        if let Some(language) = self.language {
            config.language = Some(language);
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal preview (default)
    Preview,

    /// List available cameras
    List,

    /// Capture one frame, apply the filter and save it
    Snapshot {
        /// Output file or directory (default: ~/Pictures/retrocam/IMG_TIMESTAMP.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render the QR code for a string
    Qr {
        /// String to encode (default: configured qr_data)
        data: Option<String>,

        /// Save the raster to this file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Raster edge length in pixels
        #[arg(short, long)]
        size: Option<u32>,
    },

    /// Run the render loop without a display
    Stream {
        /// Stop after this many ticks (default: until Ctrl+C)
        #[arg(short, long)]
        ticks: Option<u64>,
    },
}

fn main() -> AppResult<()> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=retrocam=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    cli.overrides.apply(&mut config);
    config.validate()?;

    // Enable localizations to be applied.
    i18n::init(&i18n::requested_languages(config.language.as_deref()));

    match cli.command {
        Some(Commands::Preview) | None => retrocam::terminal::run(&config),
        Some(Commands::List) => cli::list_cameras(&config),
        Some(Commands::Snapshot { output }) => cli::take_snapshot(&config, output),
        Some(Commands::Qr { data, output, size }) => {
            if let Some(data) = data {
                config.qr_data = data;
            }
            cli::render_qr(&config, output, size)
        }
        Some(Commands::Stream { ticks }) => cli::stream(&config, ticks),
    }
}
