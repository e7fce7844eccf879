//! screenboot command line
//!
//! Loads a boot screen configuration and drives the guest installer until the
//! last configured screen has been handled.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use screenboot::config::{default_config_path, BootConfig};
use screenboot::logging::init_logging;
use screenboot::ocr::OcrLibrary;
use screenboot::CancelFlag;

#[derive(Parser)]
#[command(name = "screenboot")]
#[command(version)]
#[command(about = "Drives guest OS installers by reading the screen with OCR and typing boot macros")]
struct Cli {
    /// Configuration file (default: config.json next to the executable)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Guest to drive, overriding vm_name from the configuration
    #[arg(long)]
    vm_name: Option<String>,

    /// OCR engine, overriding ocr_library from the configuration
    #[arg(long, value_enum)]
    ocr_library: Option<OcrLibrary>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run screen based boot (default)
    Run,
    /// Validate the configuration and compile every boot command
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = init_logging() {
        info!("Logging to {}", path.display());
    }

    // Route panics through the log as well
    std::panic::set_hook(Box::new(|panic_info| {
        error!("[PANIC] {}", panic_info);
    }));

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let mut config = BootConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    if let Some(vm_name) = cli.vm_name {
        config.vm_name = vm_name;
    }
    if let Some(library) = cli.ocr_library {
        config.ocr_library = library;
    }

    let registry = config.validate().context("Invalid configuration")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Check => {
            println!(
                "Configuration OK: vm '{}', {} boot screen(s), OCR library {}",
                config.vm_name,
                registry.len(),
                config.ocr_library
            );
            for screen in registry.iter() {
                println!(
                    "  {:<24} strings={:?} groups={} last={} once={}",
                    screen.name,
                    screen.matching_strings(),
                    screen.boot_macro.groups.len(),
                    screen.is_terminal,
                    screen.execute_once
                );
            }
            Ok(())
        }
        Command::Run => {
            let cancel = CancelFlag::new();
            let handle = cancel.clone();
            ctrlc::set_handler(move || handle.cancel())
                .context("Failed to set Ctrl-C handler")?;

            screenboot::run(
                registry,
                &config.detector_config(),
                &config.injection_config(),
                cancel,
            )
            .context("Screen based boot failed")?;
            info!("Screen based boot completed");
            Ok(())
        }
    }
}
