use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use lumbo_pelvic_rs::synthetic::SyntheticRecording;

/// Write a deterministic sinusoidal spine/pelvis export pair.
#[derive(Parser, Debug)]
#[command(name = "synth")]
struct Args {
    /// Output directory
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Trial name; files are <name>_spine.csv and <name>_pelvis.csv
    #[arg(long, default_value = "demo")]
    name: String,

    /// Sample rate (Hz)
    #[arg(long, default_value_t = 100.0)]
    rate: f64,

    /// Recording length (seconds)
    #[arg(long, default_value_t = 6.0)]
    duration: f64,

    /// Peak pitch (radians)
    #[arg(long, default_value_t = 0.8)]
    amplitude: f64,

    /// Nodding frequency (Hz)
    #[arg(long, default_value_t = 1.2)]
    frequency: f64,

    /// Pelvis phase shift relative to spine (radians)
    #[arg(long, default_value_t = 0.6)]
    phase: f64,

    /// Omit Acc_* / Gyr_* columns
    #[arg(long, default_value_t = false)]
    quaternions_only: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let spine = SyntheticRecording {
        sample_rate_hz: args.rate,
        duration_sec: args.duration,
        amplitude_rad: args.amplitude,
        frequency_hz: args.frequency,
        include_inertial: !args.quaternions_only,
        ..SyntheticRecording::spine()
    };
    let pelvis = SyntheticRecording {
        phase_rad: args.phase,
        ..spine.clone()
    };

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    for (role, recording) in [("spine", &spine), ("pelvis", &pelvis)] {
        let path = args.out_dir.join(format!("{}_{role}.csv", args.name));
        fs::write(&path, recording.to_csv()).with_context(|| format!("writing {}", path.display()))?;
        log::info!("wrote {} ({} samples)", path.display(), recording.sample_count());
    }
    Ok(())
}
