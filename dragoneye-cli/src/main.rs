#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::doc_markdown,
    clippy::uninlined_format_args,
    clippy::match_same_arms,
    clippy::needless_pass_by_value
)]

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use serde::Serialize;

use dragoneye::config::ConfigFormat;
use dragoneye::fuzzy::crisp_inputs;
use dragoneye::fuzzy::presets::{self, DIAMETER, LENGTH, RATIO, WEIGHT};
use dragoneye::{
    decode_image, CalibrationProfile, Grade, GradeError, Grader, GradingPolicy,
    ReferencePopulation,
};
use dragoneye_survey::{load_actual_weights, survey_with_progress, SurveyError};

/// DragonEye command line tools
#[derive(Parser)]
#[command(name = "dragoneye")]
#[command(about = "DragonEye - grade fruit from a photograph with calibrated geometry and fuzzy scoring")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (only errors)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a single photograph
    Grade {
        /// Photograph of one specimen
        image: PathBuf,
        /// Calibration profile (.json, .toml or .yaml)
        #[arg(short, long)]
        calibration: Option<PathBuf>,
        /// Reference population for percentile normalization
        #[arg(short, long)]
        reference: Option<PathBuf>,
        /// Weight measured by a scale, in grams
        #[arg(short, long)]
        actual_weight: Option<f64>,
        /// Override the profile's pixels per centimetre
        #[arg(long)]
        pixel_per_cm: Option<f64>,
        /// Output format (json, yaml, toml)
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
        /// Pretty print output
        #[arg(short, long)]
        pretty: bool,
    },
    /// Measure a directory of photographs into a reference population
    Survey {
        /// Directory of specimen photographs
        directory: PathBuf,
        /// Reference population output file
        #[arg(short, long)]
        output: PathBuf,
        /// Calibration profile (.json, .toml or .yaml)
        #[arg(short, long)]
        calibration: Option<PathBuf>,
        /// Override the profile's pixels per centimetre
        #[arg(long)]
        pixel_per_cm: Option<f64>,
        /// Scale readings in grams keyed by file name; enables grade evaluation
        #[arg(short, long)]
        weights: Option<PathBuf>,
        /// Write grade evaluation metrics to this file
        #[arg(short, long)]
        metrics: Option<PathBuf>,
    },
    /// Evaluate the size rule base on normalized inputs
    Fuzzy {
        /// Normalized length (0-1)
        #[arg(long)]
        length: f64,
        /// Normalized diameter (0-1)
        #[arg(long)]
        diameter: f64,
        /// Normalized weight (0-1)
        #[arg(long)]
        weight: f64,
        /// Normalized length/diameter ratio (0-1)
        #[arg(long)]
        ratio: f64,
        /// Output format (json, yaml, toml)
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
        /// Pretty print output
        #[arg(short, long)]
        pretty: bool,
    },
    /// Print the default calibration profile
    Calibration {
        /// Output format (json, yaml, toml)
        #[arg(short, long, default_value = "toml")]
        format: OutputFormat,
    },
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum OutputFormat {
    Json,
    Yaml,
    Toml,
}

impl From<OutputFormat> for ConfigFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Self::Json,
            OutputFormat::Yaml => Self::Yaml,
            OutputFormat::Toml => Self::Toml,
        }
    }
}

#[derive(Serialize)]
struct RuleFiring {
    rule: String,
    strength: f64,
}

#[derive(Serialize)]
struct FuzzyReport {
    score: f64,
    grade: Grade,
    degenerate: bool,
    rules: Vec<RuleFiring>,
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

    if args.quiet && args.verbose {
        warn!("Both --quiet and --verbose specified, using --quiet");
    }

    let quiet = args.quiet;

    // Run command
    if let Err(e) = run(args.command, quiet) {
        error!("Command failed: {}", e);

        // Map to appropriate exit codes
        let exit_code = match (e.downcast_ref::<GradeError>(), e.downcast_ref::<SurveyError>()) {
            (Some(grade), _) if grade.is_input_error() => 1,
            (_, Some(survey)) if survey.is_input_error() => 1,
            _ => 2,
        };

        process::exit(exit_code);
    }
}

fn run(command: Commands, quiet: bool) -> Result<()> {
    match command {
        Commands::Grade {
            image,
            calibration,
            reference,
            actual_weight,
            pixel_per_cm,
            format,
            pretty,
        } => cmd_grade(
            &image,
            calibration.as_deref(),
            reference.as_deref(),
            actual_weight,
            pixel_per_cm,
            format,
            pretty,
        ),
        Commands::Survey {
            directory,
            output,
            calibration,
            pixel_per_cm,
            weights,
            metrics,
        } => cmd_survey(
            &directory,
            &output,
            calibration.as_deref(),
            pixel_per_cm,
            weights.as_deref(),
            metrics.as_deref(),
            quiet,
        ),
        Commands::Fuzzy {
            length,
            diameter,
            weight,
            ratio,
            format,
            pretty,
        } => cmd_fuzzy(length, diameter, weight, ratio, format, pretty),
        Commands::Calibration { format } => cmd_calibration(format),
    }
}

fn load_grader(calibration: Option<&Path>, pixel_per_cm: Option<f64>) -> Result<Grader> {
    let mut profile = match calibration {
        Some(path) => {
            info!("Loading calibration from {}", path.display());
            CalibrationProfile::load(path)?
        }
        None => CalibrationProfile::default(),
    };

    if let Some(pixel_per_cm) = pixel_per_cm {
        profile = profile.with_pixel_per_cm(pixel_per_cm);
    }

    Ok(Grader::new(profile)?)
}

fn cmd_grade(
    image: &Path,
    calibration: Option<&Path>,
    reference: Option<&Path>,
    actual_weight: Option<f64>,
    pixel_per_cm: Option<f64>,
    format: OutputFormat,
    pretty: bool,
) -> Result<()> {
    info!("Grading {}", image.display());

    let grader = load_grader(calibration, pixel_per_cm)?;

    let population = reference
        .map(|path| {
            info!("Loading reference population from {}", path.display());
            ReferencePopulation::load(path)
        })
        .transpose()?;

    let bytes = std::fs::read(image).map_err(GradeError::from)?;
    let photo = decode_image(&bytes)?;

    let result = grader.grade_image(&photo, population.as_ref(), actual_weight)?;
    if !result.diagnostics.specimen_found {
        warn!("No specimen found in {}", image.display());
    }
    info!("Grade {}: {}", result.final_grade, result.explanation);

    println!("{}", ConfigFormat::from(format).render(&result, pretty)?);
    Ok(())
}

fn cmd_survey(
    directory: &Path,
    output: &Path,
    calibration: Option<&Path>,
    pixel_per_cm: Option<f64>,
    weights: Option<&Path>,
    metrics: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    if metrics.is_some() && weights.is_none() {
        anyhow::bail!("--metrics needs scale readings from --weights");
    }

    for file in std::iter::once(output).chain(metrics) {
        if let Some(parent) = file.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                anyhow::bail!("Output directory does not exist: {}", parent.display());
            }
        }
    }

    let grader = load_grader(calibration, pixel_per_cm)?;

    let weights = weights
        .map(|path| {
            info!("Loading scale readings from {}", path.display());
            load_actual_weights(path)
        })
        .transpose()?;

    let progress = if quiet {
        None
    } else {
        Some(create_progress_bar())
    };

    let report = survey_with_progress(directory, &grader, weights.as_ref(), progress.as_ref())?;

    if let Some(ref pb) = progress {
        pb.finish_with_message("Survey complete!");
    }

    report.population.save(output)?;
    info!(
        "Wrote reference population of {} specimens to {}",
        report.population.len(),
        output.display()
    );

    if let (Some(path), Some(grade_metrics)) = (metrics, &report.metrics) {
        dragoneye::config::save(grade_metrics, path)?;
        info!("Wrote grade evaluation to {}", path.display());
    }
    Ok(())
}

fn cmd_fuzzy(
    length: f64,
    diameter: f64,
    weight: f64,
    ratio: f64,
    format: OutputFormat,
    pretty: bool,
) -> Result<()> {
    let rules = presets::shared_size_rule_base();
    let inference = rules.evaluate_detailed(&crisp_inputs([
        (LENGTH, length),
        (DIAMETER, diameter),
        (WEIGHT, weight),
        (RATIO, ratio),
    ]))?;

    let report = FuzzyReport {
        score: inference.output,
        grade: GradingPolicy::default().grade_from_score(inference.output),
        degenerate: inference.degenerate,
        rules: rules
            .rules()
            .iter()
            .zip(&inference.firing_strengths)
            .map(|(rule, &strength)| RuleFiring {
                rule: rule.to_string(),
                strength,
            })
            .collect(),
    };

    println!("{}", ConfigFormat::from(format).render(&report, pretty)?);
    Ok(())
}

fn cmd_calibration(format: OutputFormat) -> Result<()> {
    let profile = CalibrationProfile::default();
    println!("{}", ConfigFormat::from(format).render(&profile, true)?);
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
