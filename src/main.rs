use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde_json::{json, Map, Value};

use lumbo_pelvic_rs::{analyze_paths, AnalysisConfig, AnalysisReport, TimeUnit};

#[derive(Parser, Debug)]
#[command(name = "lumbo_pelvic")]
#[command(about = "Lumbo-pelvic coordination analysis of spine/pelvis IMU exports", long_about = None)]
struct Args {
    /// Spine sensor export (.csv or .csv.gz)
    #[arg(long, requires = "pelvis", conflicts_with = "batch_dir")]
    spine: Option<PathBuf>,

    /// Pelvis sensor export (.csv or .csv.gz)
    #[arg(long, requires = "spine")]
    pelvis: Option<PathBuf>,

    /// Directory of <name>_spine.csv / <name>_pelvis.csv pairs, analysed in parallel
    #[arg(long)]
    batch_dir: Option<PathBuf>,

    /// JSON analysis config; missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Unit of SampleTimeFine (us, ms, s); overrides the config file
    #[arg(long)]
    time_unit: Option<TimeUnit>,

    /// Write JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

const SPINE_SUFFIX: &str = "_spine";
const PELVIS_SUFFIX: &str = "_pelvis";

#[derive(Debug)]
struct Trial {
    name: String,
    spine: PathBuf,
    pelvis: PathBuf,
}

fn load_config(args: &Args) -> Result<AnalysisConfig> {
    let mut config = match args.config.as_ref() {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(unit) = args.time_unit {
        config.time_unit = unit;
    }
    config.validate()?;
    Ok(config)
}

/// Split `trial_spine.csv.gz` into `("trial", "_spine", ".csv.gz")`.
fn split_trial_name<'a>(file_name: &'a str, suffix: &str) -> Option<(&'a str, &'a str)> {
    let idx = file_name.rfind(suffix)?;
    let ext = &file_name[idx + suffix.len()..];
    if ext == ".csv" || ext == ".csv.gz" {
        Some((&file_name[..idx], ext))
    } else {
        None
    }
}

fn find_trials(dir: &Path) -> Result<Vec<Trial>> {
    let mut trials = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let Some((name, ext)) = split_trial_name(file_name, SPINE_SUFFIX) else {
            continue;
        };
        let pelvis = dir.join(format!("{name}{PELVIS_SUFFIX}{ext}"));
        if !pelvis.is_file() {
            log::warn!("{} has no pelvis counterpart, skipping", path.display());
            continue;
        }
        trials.push(Trial {
            name: name.to_string(),
            spine: path.clone(),
            pelvis,
        });
    }
    trials.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(trials)
}

fn run_batch(dir: &Path, config: &AnalysisConfig) -> Result<Value> {
    let trials = find_trials(dir)?;
    if trials.is_empty() {
        bail!("no <name>_spine.csv / <name>_pelvis.csv pairs in {}", dir.display());
    }
    log::info!("analysing {} trials from {}", trials.len(), dir.display());

    let outcomes = crossbeam::scope(|scope| {
        let handles: Vec<_> = trials
            .iter()
            .map(|trial| scope.spawn(move |_| analyze_paths(&trial.spine, &trial.pelvis, config)))
            .collect();
        handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
    })
    .map_err(|_| anyhow!("batch scope panicked"))?;

    let mut results = Map::new();
    for (trial, outcome) in trials.iter().zip(outcomes) {
        let entry = match outcome {
            Ok(Ok(report)) => {
                log::info!("{}: {} samples", trial.name, report.metadata.total_samples);
                json!({ "report": report })
            }
            Ok(Err(err)) => {
                log::warn!("{}: [{}] {}", trial.name, err.code(), err);
                json!({ "error": { "code": err.code(), "message": err.to_string() } })
            }
            Err(_) => {
                log::error!("{}: worker panicked", trial.name);
                json!({ "error": { "code": "E007", "message": "analysis worker panicked" } })
            }
        };
        results.insert(trial.name.clone(), entry);
    }
    Ok(Value::Object(results))
}

fn run_single(spine: &Path, pelvis: &Path, config: &AnalysisConfig) -> Result<AnalysisReport> {
    let report = analyze_paths(spine, pelvis, config)
        .map_err(|err| anyhow!("[{}] {}", err.code(), err))
        .with_context(|| format!("analysing {} + {}", spine.display(), pelvis.display()))?;
    log::info!(
        "{} samples over {} s, r = {}",
        report.metadata.total_samples,
        report.metadata.duration_sec,
        report.statistics.coordination.pearson_r
    );
    Ok(report)
}

fn write_output(text: &str, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            log::info!("wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = load_config(&args)?;

    let value = if let Some(dir) = args.batch_dir.as_ref() {
        run_batch(dir, &config)?
    } else if let (Some(spine), Some(pelvis)) = (args.spine.as_ref(), args.pelvis.as_ref()) {
        serde_json::to_value(run_single(spine, pelvis, &config)?)?
    } else {
        bail!("Provide --spine and --pelvis, or --batch-dir");
    };

    let text = if args.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    write_output(&text, args.output.as_ref())
}
