use std::{fs, path::Path};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use csm_pipeline::{
    run_articulation, run_transfer_evaluation, ArticulationConfig, ArticulationInput,
    TransferEvalConfig, TransferEvalInput,
};
use log::info;

/// Canonical surface mapping tools.
#[derive(Debug, Parser)]
#[command(author, version, about = "CSM articulation and keypoint-transfer evaluation")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Transfer keypoints across image pairs and report PCK.
    Transfer {
        /// Path to JSON file containing TransferEvalInput.
        #[arg(long)]
        input: String,

        /// Optional path to JSON TransferEvalConfig. Defaults are used if omitted.
        #[arg(long)]
        config: Option<String>,

        /// Directory receiving pck.json and transfers.json.
        #[arg(long)]
        out_dir: Option<String>,

        /// Print the PCK table instead of the JSON report.
        #[arg(long)]
        table: bool,
    },
    /// Deform an articulated template from features or poses.
    Articulate {
        /// Path to JSON file containing ArticulationInput.
        #[arg(long)]
        input: String,

        /// Optional path to JSON ArticulationConfig. Defaults are used if omitted.
        #[arg(long)]
        config: Option<String>,
    },
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(value)
}

fn load_config<T: serde::de::DeserializeOwned + Default>(path: Option<&str>) -> Result<T> {
    match path {
        Some(p) => load_json_file(Path::new(p)),
        None => Ok(T::default()),
    }
}

fn run_transfer_from_files(
    input_path: &str,
    config_path: Option<&str>,
    out_dir: Option<&str>,
    table: bool,
) -> Result<String> {
    let input: TransferEvalInput = load_json_file(Path::new(input_path))?;
    let config: TransferEvalConfig = load_config(config_path)?;

    let report = run_transfer_evaluation(&input, &config)?;
    if let Some(dir) = out_dir {
        report.write_artifacts(Path::new(dir))?;
        info!("wrote evaluation artifacts to {dir}");
    }
    if table {
        Ok(report.pck.to_string())
    } else {
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

fn run_articulation_from_files(input_path: &str, config_path: Option<&str>) -> Result<String> {
    let input: ArticulationInput = load_json_file(Path::new(input_path))?;
    let config: ArticulationConfig = load_config(config_path)?;
    let report = run_articulation(&input, &config)?;
    Ok(serde_json::to_string_pretty(&report)?)
}

fn main() {
    env_logger::init();
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    let output = match &args.command {
        Command::Transfer {
            input,
            config,
            out_dir,
            table,
        } => run_transfer_from_files(input, config.as_deref(), out_dir.as_deref(), *table)?,
        Command::Articulate { input, config } => {
            run_articulation_from_files(input, config.as_deref())?
        }
    };
    println!("{}", output);
    Ok(())
}
