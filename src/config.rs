//! Analysis configuration
//!
//! Every threshold the pipeline applies lives here so that a deployment can
//! tune it from a JSON file without touching code. Keys missing from the
//! file keep their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Unit of the raw `SampleTimeFine` column.
///
/// Device exports disagree on this, so it is always chosen explicitly
/// rather than guessed per file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Microseconds,
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    /// Raw ticks per second.
    pub fn ticks_per_second(&self) -> f64 {
        match self {
            TimeUnit::Microseconds => 1_000_000.0,
            TimeUnit::Milliseconds => 1_000.0,
            TimeUnit::Seconds => 1.0,
        }
    }

    pub fn to_seconds(&self, raw: f64) -> f64 {
        raw / self.ticks_per_second()
    }
}

impl std::str::FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us" | "micro" | "microseconds" => Ok(TimeUnit::Microseconds),
            "ms" | "milli" | "milliseconds" => Ok(TimeUnit::Milliseconds),
            "s" | "sec" | "seconds" => Ok(TimeUnit::Seconds),
            other => Err(format!("unknown time unit '{other}'")),
        }
    }
}

pub const DEFAULT_MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub time_unit: TimeUnit,
    pub max_file_bytes: u64,
    /// Lowercase, without the dot.
    pub allowed_extensions: Vec<String>,
    /// Valid rows a stream needs after cleaning.
    pub min_samples: usize,
    /// Allowed deviation of |q| from 1 before a row counts as invalid.
    pub magnitude_tolerance: f64,
    pub max_invalid_quaternion_fraction: f64,
    /// Base-stream samples the overlap window must hold.
    pub min_overlap_samples: usize,
    pub histogram_bins: usize,
    pub normality_alpha: f64,
    pub cross_correlation_max_lag: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            time_unit: TimeUnit::Microseconds,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            allowed_extensions: vec!["csv".to_string()],
            min_samples: 100,
            magnitude_tolerance: 0.1,
            max_invalid_quaternion_fraction: 0.1,
            min_overlap_samples: 100,
            histogram_bins: 30,
            normality_alpha: 0.05,
            cross_correlation_max_lag: 50,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: AnalysisConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.histogram_bins == 0 {
            bail!("histogram_bins must be at least 1");
        }
        if !(self.magnitude_tolerance >= 0.0) {
            bail!("magnitude_tolerance must be non-negative");
        }
        if !(0.0..=1.0).contains(&self.max_invalid_quaternion_fraction) {
            bail!("max_invalid_quaternion_fraction must be within [0, 1]");
        }
        if !(self.normality_alpha > 0.0 && self.normality_alpha < 1.0) {
            bail!("normality_alpha must be within (0, 1)");
        }
        if self.min_overlap_samples < 2 {
            bail!("min_overlap_samples must be at least 2");
        }
        Ok(())
    }
}
