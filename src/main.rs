use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, warn, Level};

use ocr_dispatch_lib::commands;
use ocr_dispatch_lib::services::config::ConfigManager;
use ocr_dispatch_lib::{BatchOcr, OcrEngine, OcrError};

#[derive(Debug, Parser)]
#[command(name = "ocr-dispatch", version, about = "Batch OCR with ordered results")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recognize a batch of image files; prints a JSON array in input order
    Batch {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Preset for the image at the same position (`-` for none)
        #[arg(long = "preset")]
        presets: Vec<String>,
    },
    /// Recognize the regions of a layout file in one image
    Roi {
        image: PathBuf,
        #[arg(long)]
        layout: PathBuf,
        /// Write the image with region outlines here
        #[arg(long)]
        overlay: Option<PathBuf>,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Path,
    Show,
    Init,
}

fn init_tracing(verbose: u8, json: bool) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: Cli) -> Result<(), OcrError> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::at(path),
        None => ConfigManager::new()?,
    };

    match cli.command {
        Command::Batch { images, presets } => {
            let config = manager.load()?;
            let ocr = BatchOcr::from_config(&config)?;
            if !ocr.engine().is_available() {
                warn!(binary = ?config.engine.binary, "OCR engine does not answer --version");
            }
            let texts = commands::ocr::run_batch(&ocr, &images, &presets)?;
            println!("{}", serde_json::to_string_pretty(&texts)?);
        }
        Command::Roi {
            image,
            layout,
            overlay,
        } => {
            let config = manager.load()?;
            let ocr = Arc::new(BatchOcr::from_config(&config)?);
            let regions = commands::ocr::run_roi(ocr, &image, &layout, overlay.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&regions)?);
        }
        Command::Config { action } => match action {
            ConfigAction::Path => println!("{}", manager.config_file_path().display()),
            ConfigAction::Show => println!("{}", commands::config::show_config(&manager)?),
            ConfigAction::Init => {
                let path = commands::config::init_config(&manager)?;
                println!("{}", path.display());
            }
        },
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "ocr-dispatch failed");
            ExitCode::FAILURE
        }
    }
}
