//! pvtools - command-line utilities for PrairieView two-photon acquisitions.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pvtools::{
    config::{
        Cli, Command, ConvertConfig, InfoConfig, InfoFormat, ProjectConfig, ReportConfig,
        ZSERIES_PREFIX,
    },
    format::{is_tiff_header, tiff::TiffDecoder},
    image::{convert_file, convert_folder, project_channel},
    io::{FileRangeReader, RangeReader},
    pv::ScanFactory,
    report::{self, Templates},
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Convert(config) => run_convert(config),
        Command::Project(config) => run_project(config),
        Command::Info(config) => run_info(config),
        Command::Report(config) => run_report(config),
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "pvtools=debug"
    } else {
        "pvtools=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

// =============================================================================
// Convert Command
// =============================================================================

fn run_convert(config: ConvertConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let options = config.options();
    let result = if config.input.is_dir() {
        convert_folder(&config.input, &config.output, &options).map(|written| {
            info!("Wrote {} images to {}", written.len(), config.output.display());
        })
    } else {
        convert_file(&config.input, &config.output, &options)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Conversion failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Project Command
// =============================================================================

fn run_project(config: ProjectConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let folders = match zseries_folders(&config.folder) {
        Ok(folders) => folders,
        Err(e) => {
            error!("Cannot list {}: {}", config.folder.display(), e);
            return ExitCode::FAILURE;
        }
    };
    if folders.is_empty() {
        warn!("No {}* folders in {}", ZSERIES_PREFIX, config.folder.display());
        return ExitCode::SUCCESS;
    }

    let mut failures = 0;
    for folder in &folders {
        let destinations = vec![folder.join(report::REFERENCES_DIR), config.folder.clone()];
        for &channel in &config.channels {
            match project_channel(folder, channel, config.divisor, &destinations) {
                Ok(written) => {
                    for path in written {
                        info!("  {}", path.display());
                    }
                }
                Err(e) => {
                    error!("{} channel {}: {}", folder.display(), channel, e);
                    failures += 1;
                }
            }
        }
    }

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn zseries_folders(folder: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut folders: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(ZSERIES_PREFIX))
                .unwrap_or(false)
        })
        .collect();
    folders.sort();
    Ok(folders)
}

// =============================================================================
// Info Command
// =============================================================================

fn run_info(config: InfoConfig) -> ExitCode {
    match describe(&config.path, config.format) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}: {}", config.path.display(), e);
            ExitCode::FAILURE
        }
    }
}

fn describe(path: &Path, format: InfoFormat) -> Result<String, Box<dyn Error>> {
    if path.is_dir() {
        let scan = ScanFactory::from_folder(path)?
            .ok_or_else(|| format!("no PrairieView XML in {}", path.display()))?;
        return Ok(match format {
            InfoFormat::Text => scan.summary(),
            InfoFormat::Json => serde_json::to_string_pretty(&scan)?,
        });
    }

    let is_xml = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("xml"))
        .unwrap_or(false);
    if is_xml {
        let scan = ScanFactory::from_xml_path(path)?;
        return Ok(match format {
            InfoFormat::Text => scan.summary(),
            InfoFormat::Json => serde_json::to_string_pretty(&scan)?,
        });
    }

    let reader = FileRangeReader::open(path)?;
    let head = reader.read_exact_at(0, reader.size().min(16) as usize)?;
    if !is_tiff_header(&head) {
        return Err("not a TIFF file".into());
    }

    let decoder = TiffDecoder::new(reader)?;
    let tiff = decoder.info();
    Ok(match format {
        InfoFormat::Json => serde_json::to_string_pretty(tiff)?,
        InfoFormat::Text => format!(
            "{} x {} pixels, {} bits x {} samples, photometric {}\n\
             {} {}, {} strips of {} rows\nsoftware: {}",
            tiff.width,
            tiff.height,
            tiff.bits_per_sample,
            tiff.samples_per_pixel,
            tiff.photometric,
            if tiff.bigtiff { "BigTIFF" } else { "TIFF" },
            if tiff.big_endian { "big-endian" } else { "little-endian" },
            tiff.strip_count,
            tiff.rows_per_strip,
            tiff.software.as_deref().unwrap_or("-"),
        ),
    })
}

// =============================================================================
// Report Command
// =============================================================================

fn run_report(config: ReportConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let templates = match &config.templates {
        Some(dir) => match Templates::load(dir) {
            Ok(templates) => templates,
            Err(e) => {
                error!("Cannot load templates: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Templates::default(),
    };

    let mut failures = 0;
    for folder in &config.folders {
        match report::run(folder, config.overwrite, &templates) {
            Ok(index) => info!("Report written to {}", index.display()),
            Err(e) => {
                error!("{}: {}", folder.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
