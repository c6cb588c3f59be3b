//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - runs the estimation pipeline
//! - prints reports and writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, DesignArgs, EstimateArgs, ShowArgs, SimulateArgs, TrialsArgs};
use crate::data::SyntheticDesign;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `dplr` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is the common case.
    dotenvy::dotenv().ok();
    init_logging();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Estimate(args) => handle_estimate(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Trials(args) => handle_trials(args),
        Command::Show(args) => handle_show(args),
    }
}

/// Logs go to stderr so stdout stays clean for reports. `RUST_LOG` overrides the default level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Ignore the error if a subscriber is already installed (tests, embedding).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_estimate(args: EstimateArgs) -> Result<(), AppError> {
    let config = args.estimator.estimator_config();
    let (data, beta) = crate::io::read_dataset_json(&args.input)?.into_parts();
    let record = pipeline::run_estimate(
        &data,
        &beta,
        None,
        &config,
        args.estimator.rho,
        args.estimator.seed,
    )?;

    println!("{}", crate::report::format_run_summary(&record));
    if let Some(path) = &args.export {
        crate::io::write_run_json(path, &record)?;
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = args.estimator.estimator_config();
    let design = design_from_args(&args.design);
    let out = pipeline::run_simulate(&design, &config, args.estimator.rho, args.estimator.seed)?;

    println!("{}", crate::report::format_run_summary(&out.record));
    if let Some(path) = &args.export {
        crate::io::write_run_json(path, &out.record)?;
    }
    if let Some(path) = &args.export_data {
        crate::io::write_dataset_json(path, &out.dataset)?;
    }
    Ok(())
}

fn handle_trials(args: TrialsArgs) -> Result<(), AppError> {
    let config = args.estimator.estimator_config();
    let design = design_from_args(&args.design);
    let summary = pipeline::run_trial_batch(
        &design,
        &config,
        args.estimator.rho,
        args.trials,
        args.estimator.seed,
    )?;

    println!(
        "{}",
        crate::report::format_trials_summary(
            &summary,
            design.n,
            design.dim(),
            args.estimator.rho
        )
    );
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let record = crate::io::read_run_json(&args.run)?;
    println!("{}", crate::report::format_run_summary(&record));
    Ok(())
}

pub fn design_from_args(args: &DesignArgs) -> SyntheticDesign {
    let mut design = SyntheticDesign::isotropic(args.samples, args.dim, args.beta_norm);
    design.noise_sd = args.noise_sd;
    design
}
