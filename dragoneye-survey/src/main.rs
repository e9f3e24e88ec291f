#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::doc_markdown,
    clippy::uninlined_format_args,
    clippy::match_same_arms,
    clippy::needless_pass_by_value
)]

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};

use dragoneye::{CalibrationProfile, GradeError, Grader};
use dragoneye_survey::{load_actual_weights, survey_with_progress, SurveyError};

/// DragonEye survey tool
#[derive(Parser)]
#[command(name = "dragoneye-survey")]
#[command(about = "Measures a directory of specimen photographs into a reference population")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Directory of specimen photographs
    #[arg(value_name = "DIRECTORY")]
    directory: PathBuf,

    /// Reference population output file (.json, .toml or .yaml)
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Also write the per-photograph report to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Calibration profile (.json, .toml or .yaml)
    #[arg(short, long, value_name = "FILE")]
    calibration: Option<PathBuf>,

    /// Scale readings in grams keyed by file name; enables grade evaluation
    #[arg(short, long, value_name = "FILE")]
    weights: Option<PathBuf>,

    /// Override the profile's pixels per centimetre
    #[arg(long)]
    pixel_per_cm: Option<f64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,

    /// Number of threads for processing
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.quiet {
        log::LevelFilter::Error
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Err(e) = run(args) {
        error!("Survey failed: {}", e);

        // Map to appropriate exit codes
        let exit_code = match (e.downcast_ref::<SurveyError>(), e.downcast_ref::<GradeError>()) {
            (Some(survey), _) if survey.is_input_error() => 1,
            (_, Some(grade)) if grade.is_input_error() => 1,
            _ => 2,
        };

        process::exit(exit_code);
    }
}

fn run(args: Args) -> Result<()> {
    info!("DragonEye Survey v{}", env!("CARGO_PKG_VERSION"));
    info!("Directory: {}", args.directory.display());
    info!("Output: {}", args.output.display());

    validate_args(&args)?;
    configure_threads(args.threads)?;

    let mut calibration = match &args.calibration {
        Some(path) => CalibrationProfile::load(path)?,
        None => CalibrationProfile::default(),
    };
    if let Some(pixel_per_cm) = args.pixel_per_cm {
        calibration = calibration.with_pixel_per_cm(pixel_per_cm);
    }
    let grader = Grader::new(calibration)?;

    let weights = args
        .weights
        .as_deref()
        .map(|path| {
            info!("Loading scale readings from {}", path.display());
            load_actual_weights(path)
        })
        .transpose()?;

    let progress = if args.quiet {
        None
    } else {
        Some(create_progress_bar())
    };

    let report = survey_with_progress(
        &args.directory,
        &grader,
        weights.as_ref(),
        progress.as_ref(),
    )?;

    if let Some(ref pb) = progress {
        pb.finish_with_message("Survey complete!");
    }

    if report.population.is_empty() {
        warn!("No specimen measured, the population file will be empty");
    }

    report.population.save(&args.output)?;
    info!(
        "Wrote reference population of {} specimens to {}",
        report.population.len(),
        args.output.display()
    );

    if let Some(metrics) = &report.metrics {
        for class in &metrics.classes {
            info!(
                "Grade {}: precision {:.3}, recall {:.3}, F1 {:.3} ({} weighed)",
                class.grade, class.precision, class.recall, class.f1, class.support
            );
        }
    }

    if let Some(path) = &args.report {
        report.save(path)?;
        info!("Wrote survey report to {}", path.display());
    }

    Ok(())
}

fn validate_args(args: &Args) -> Result<()> {
    if !args.directory.is_dir() {
        anyhow::bail!("Input directory does not exist: {}", args.directory.display());
    }

    for output in std::iter::once(&args.output).chain(args.report.iter()) {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                anyhow::bail!("Output directory does not exist: {}", parent.display());
            }
        }
    }

    if let Some(pixel_per_cm) = args.pixel_per_cm {
        if !pixel_per_cm.is_finite() || pixel_per_cm <= 0.0 {
            anyhow::bail!("Pixels per centimetre must be positive, got {}", pixel_per_cm);
        }
    }

    if args.quiet && args.verbose {
        warn!("Both --quiet and --verbose specified, using --quiet");
    }

    Ok(())
}

#[cfg(feature = "parallel")]
fn configure_threads(threads: usize) -> Result<()> {
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }
    Ok(())
}

#[cfg(not(feature = "parallel"))]
fn configure_threads(threads: usize) -> Result<()> {
    if threads > 1 {
        warn!("Built without the parallel feature, ignoring --threads {}", threads);
    }
    Ok(())
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("Failed to create progress bar template")
            .progress_chars("##-"),
    );
    pb
}
