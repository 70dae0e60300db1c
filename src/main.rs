use std::{io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fridge_diff::{
    DEFAULT_DEDUP_IOU_THRESHOLD, DEFAULT_MATCH_IOU_THRESHOLD, DetectionSet, DifferConfig,
    JsonFileDetector, MatchStrategy, Pipeline, RawDetection, deduplicate, diff, read_json,
    write_diff_to,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Detect what changed in the fridge between two photos")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one capture: dedup, rotate old/new, crop, diff.
    Process {
        /// Captured photo (jpeg or png).
        #[arg(long)]
        image: PathBuf,

        /// Detector output for the photo: [{bounding_box, confidence, label}].
        #[arg(long)]
        detections: PathBuf,

        /// TOML config file.
        #[arg(long, env = "FRIDGE_DIFF_CONFIG")]
        config: Option<PathBuf>,

        /// Overrides `result_dir` from the config.
        #[arg(long)]
        result_dir: Option<PathBuf>,
    },
    /// Compare two object record files and write match/add/delete json.
    Diff {
        old: PathBuf,
        new: PathBuf,

        /// Output directory, defaults to the directory of NEW.
        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long, default_value_t = DEFAULT_MATCH_IOU_THRESHOLD)]
        threshold: f64,

        #[arg(long, default_value_t = MatchStrategy::FirstMatch)]
        strategy: MatchStrategy,
    },
    /// Filter raw detector output and print deduplicated object records.
    Dedup {
        detections: PathBuf,

        #[arg(long, default_value_t = DEFAULT_DEDUP_IOU_THRESHOLD)]
        threshold: f64,

        #[arg(long, default_value_t = 0.4)]
        score_threshold: f64,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    run(Args::parse(), &mut std::io::stdout().lock())
}

fn run(args: Args, out: &mut impl Write) -> Result<()> {
    match args.command {
        Command::Process {
            image,
            detections,
            config,
            result_dir,
        } => {
            let mut cfg = DifferConfig::load(config.as_deref()).context("loading config")?;
            if let Some(dir) = result_dir {
                cfg.result_dir = dir;
            }

            let pipeline = with_uploader(Pipeline::new(cfg.clone())?, &cfg);
            let summary = pipeline
                .process(&image, &mut JsonFileDetector::new(detections))
                .with_context(|| format!("processing {}", image.display()))?;

            writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
        }
        Command::Diff {
            old,
            new,
            out,
            threshold,
            strategy,
        } => {
            let old_set: DetectionSet = read_json(&old)?;
            let new_set: DetectionSet = read_json(&new)?;
            let changes = diff(&old_set, &new_set, threshold, strategy);

            let out = out
                .or_else(|| new.parent().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("."));
            write_diff_to(&out, &changes)
                .with_context(|| format!("writing diff to {}", out.display()))?;

            log::info!(
                "{} matched, {} added, {} deleted -> {}",
                changes.matches.len(),
                changes.added.len(),
                changes.deleted.len(),
                out.display()
            );
        }
        Command::Dedup {
            detections,
            threshold,
            score_threshold,
        } => {
            let raw: Vec<RawDetection> = read_json(&detections)?;
            let filtered = deduplicate(&DetectionSet::from_raw(raw, score_threshold), threshold);

            writeln!(out, "{}", serde_json::to_string_pretty(&filtered)?)?;
        }
    }

    Ok(())
}

#[cfg(feature = "upload")]
fn with_uploader(pipeline: Pipeline, cfg: &DifferConfig) -> Pipeline {
    match &cfg.upload_url {
        Some(url) => pipeline.with_uploader(Box::new(fridge_diff::HttpUploader::new(url))),
        None => pipeline,
    }
}

#[cfg(not(feature = "upload"))]
fn with_uploader(pipeline: Pipeline, cfg: &DifferConfig) -> Pipeline {
    if let Some(url) = &cfg.upload_url {
        log::warn!("upload_url {url} ignored, built without the `upload` feature");
    }
    pipeline
}
