//! Descriptive, distribution and coordination statistics over FE series.
//!
//! Angles and quartiles are rounded to 2 decimals, correlation and
//! regression coefficients to 3, p-values to 4.

pub mod coordination;
pub mod normality;

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::fe::FeAnalysis;
use crate::signal::{mean, min_max, percentile_sorted, rms, round_to, sorted_copy, std_dev};

pub use coordination::{
    contribution_ratio, coordination, cross_correlation, linear_regression, Coordination,
    ContributionRatio, CrossCorrelation,
};
pub use normality::{shapiro_wilk, ShapiroWilk};

/// Gyroscope summary, deg/s. Peak and mean are of `|ω|`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VelocityStats {
    pub peak_angular_velocity: f64,
    pub mean_angular_velocity: f64,
    pub rms_angular_velocity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AngleStats {
    pub rom: f64,
    pub mean: f64,
    pub std: f64,
    pub max: f64,
    pub min: f64,
    #[serde(flatten, default)]
    pub velocity: Option<VelocityStats>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub counts: Vec<u64>,
    pub bin_edges: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quartiles {
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
}

/// Both fields are `null` when the test is undefined.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalityTest {
    pub p_value: Option<f64>,
    pub is_normal: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub histogram: Histogram,
    pub quartiles: Quartiles,
    pub normality_test: NormalityTest,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Distributions {
    pub spine: Distribution,
    pub pelvis: Distribution,
    pub relative: Distribution,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub spine: AngleStats,
    pub pelvis: AngleStats,
    pub relative: AngleStats,
    pub coordination: Coordination,
    pub distribution: Distributions,
}

pub fn calculate_statistics(fe: &FeAnalysis, config: &AnalysisConfig) -> AnalysisResult<Statistics> {
    let ts = &fe.time_series;

    let mut spine = angle_stats(&ts.spine_fe)?;
    spine.velocity = velocity_stats(&fe.angular_velocity.spine.gyr_y);
    let mut pelvis = angle_stats(&ts.pelvis_fe)?;
    pelvis.velocity = velocity_stats(&fe.angular_velocity.pelvis.gyr_y);
    let relative = angle_stats(&ts.relative_fe)?;

    let coordination = coordination(&ts.spine_fe, &ts.pelvis_fe, config.cross_correlation_max_lag)?;

    let distribution = Distributions {
        spine: distribution(&ts.spine_fe, config)?,
        pelvis: distribution(&ts.pelvis_fe, config)?,
        relative: distribution(&ts.relative_fe, config)?,
    };

    Ok(Statistics {
        spine,
        pelvis,
        relative,
        coordination,
        distribution,
    })
}

/// ROM, mean, population std and extremes. Constant input gives
/// `rom = 0`, `std = 0`.
pub fn angle_stats(angles: &[f64]) -> AnalysisResult<AngleStats> {
    let (Some((lo, hi)), Some(m), Some(s)) = (min_max(angles), mean(angles), std_dev(angles)) else {
        return Err(AnalysisError::computation("angle statistics of an empty series"));
    };
    Ok(AngleStats {
        rom: round_to(hi - lo, 2),
        mean: round_to(m, 2),
        std: round_to(s, 2),
        max: round_to(hi, 2),
        min: round_to(lo, 2),
        velocity: None,
    })
}

/// `None` when the gyroscope axis was absent.
pub fn velocity_stats(velocity: &[f64]) -> Option<VelocityStats> {
    let magnitude: Vec<f64> = velocity.iter().map(|v| v.abs()).collect();
    let (_, peak) = min_max(&magnitude)?;
    Some(VelocityStats {
        peak_angular_velocity: round_to(peak, 2),
        mean_angular_velocity: round_to(mean(&magnitude)?, 2),
        rms_angular_velocity: round_to(rms(velocity)?, 2),
    })
}

pub fn distribution(values: &[f64], config: &AnalysisConfig) -> AnalysisResult<Distribution> {
    let sorted = sorted_copy(values);
    let quartile = |q: f64| {
        percentile_sorted(&sorted, q)
            .map(|v| round_to(v, 2))
            .ok_or_else(|| AnalysisError::computation("percentile of an empty series"))
    };
    let quartiles = Quartiles {
        q25: quartile(25.0)?,
        q50: quartile(50.0)?,
        q75: quartile(75.0)?,
    };

    let normality_test = match shapiro_wilk(values)? {
        Some(sw) => NormalityTest {
            p_value: Some(round_to(sw.p_value, 4)),
            is_normal: Some(sw.p_value > config.normality_alpha),
        },
        None => NormalityTest {
            p_value: None,
            is_normal: None,
        },
    };

    Ok(Distribution {
        histogram: histogram(values, config.histogram_bins)?,
        quartiles,
        normality_test,
    })
}

/// Equal-width histogram. Bins are half-open except the last, which also
/// takes the maximum. A constant series spans `[v - 0.5, v + 0.5]`.
pub fn histogram(values: &[f64], bins: usize) -> AnalysisResult<Histogram> {
    if bins == 0 {
        return Err(AnalysisError::computation("histogram needs at least one bin"));
    }
    let (lo, hi) = match min_max(values) {
        Some((lo, hi)) if lo == hi => (lo - 0.5, hi + 0.5),
        Some(range) => range,
        None => (0.0, 1.0),
    };
    if !(lo.is_finite() && hi.is_finite()) {
        return Err(AnalysisError::computation("histogram of non-finite data"));
    }

    let width = hi - lo;
    let mut counts = vec![0u64; bins];
    for &v in values {
        let idx = ((v - lo) * bins as f64 / width).floor() as usize;
        counts[idx.min(bins - 1)] += 1;
    }
    let bin_edges = (0..=bins)
        .map(|i| round_to(lo + width * i as f64 / bins as f64, 2))
        .collect();

    Ok(Histogram { counts, bin_edges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeUnit;
    use crate::fe::analyze_fe;
    use crate::sync::synchronize;
    use crate::synthetic::SyntheticRecording;
    use crate::types::{SensorRole, SensorStream};
    use approx::assert_abs_diff_eq;

    fn synthetic_fe() -> FeAnalysis {
        let spine = SensorStream::new(
            SensorRole::Spine,
            "spine",
            TimeUnit::Microseconds,
            SyntheticRecording::spine().samples(),
        );
        let pelvis = SensorStream::new(
            SensorRole::Pelvis,
            "pelvis",
            TimeUnit::Microseconds,
            SyntheticRecording::pelvis().samples(),
        );
        let pair = synchronize(&spine, &pelvis, &AnalysisConfig::default()).unwrap();
        analyze_fe(&pair).unwrap()
    }

    #[test]
    fn test_rom_law() {
        let s = angle_stats(&[-3.0, 1.0, 7.5, 2.0]).unwrap();
        assert_eq!(s.rom, 10.5);
        assert_eq!(s.rom, s.max - s.min);

        let flat = angle_stats(&[12.3; 40]).unwrap();
        assert_eq!(flat.rom, 0.0);
        assert_eq!(flat.std, 0.0);
        assert_eq!(flat.mean, 12.3);
    }

    #[test]
    fn test_empty_series_is_computation_error() {
        assert!(matches!(angle_stats(&[]), Err(AnalysisError::Computation(_))));
    }

    #[test]
    fn test_velocity_stats() {
        let v = velocity_stats(&[3.0, -4.0, 0.0, 1.0]).unwrap();
        assert_eq!(v.peak_angular_velocity, 4.0);
        assert_eq!(v.mean_angular_velocity, 2.0);
        assert_eq!(v.rms_angular_velocity, round_to((26.0f64 / 4.0).sqrt(), 2));
        assert!(velocity_stats(&[]).is_none());
    }

    #[test]
    fn test_histogram_edges_and_counts() {
        let values: Vec<f64> = (0..=30).map(|i| i as f64).collect();
        let h = histogram(&values, 30).unwrap();
        assert_eq!(h.counts.len(), 30);
        assert_eq!(h.bin_edges.len(), 31);
        assert_eq!(h.bin_edges[0], 0.0);
        assert_eq!(h.bin_edges[30], 30.0);
        // max lands in the closed last bin
        assert_eq!(h.counts[29], 2);
        assert_eq!(h.counts.iter().sum::<u64>(), 31);
    }

    #[test]
    fn test_histogram_constant_series() {
        let h = histogram(&[2.0; 10], 4).unwrap();
        assert_eq!(h.bin_edges, vec![1.5, 1.75, 2.0, 2.25, 2.5]);
        assert_eq!(h.counts, vec![0, 0, 10, 0]);
    }

    #[test]
    fn test_normality_null_below_three_samples() {
        let d = distribution(&[1.0, 2.0], &AnalysisConfig::default()).unwrap();
        assert_eq!(d.normality_test.p_value, None);
        assert_eq!(d.normality_test.is_normal, None);
        let json = serde_json::to_value(&d.normality_test).unwrap();
        assert!(json["p_value"].is_null());
    }

    #[test]
    fn test_quartiles_linear() {
        let d = distribution(&[4.0, 1.0, 3.0, 2.0, 5.0], &AnalysisConfig::default()).unwrap();
        assert_eq!(
            d.quartiles,
            Quartiles {
                q25: 2.0,
                q50: 3.0,
                q75: 4.0
            }
        );
    }

    #[test]
    fn test_statistics_on_synthetic_pair() {
        let fe = synthetic_fe();
        let stats = calculate_statistics(&fe, &AnalysisConfig::default()).unwrap();

        // ±0.8 rad sinusoid
        assert_abs_diff_eq!(stats.spine.max, 45.84, epsilon = 0.1);
        assert_abs_diff_eq!(stats.spine.min, -45.84, epsilon = 0.1);
        assert!(stats.spine.velocity.is_some());
        assert!(stats.relative.velocity.is_none());

        let c = &stats.coordination;
        assert!(c.pearson_r > 0.7 && c.pearson_r < 0.9, "r = {}", c.pearson_r);
        assert_abs_diff_eq!(
            c.contribution_ratio.spine + c.contribution_ratio.pelvis,
            1.0,
            epsilon = 1e-9
        );
        let cc = c.cross_correlation.as_ref().unwrap();
        assert_eq!(cc.lags.len(), 101);
        assert!(cc.peak_lag > 0, "spine trails pelvis, lag {}", cc.peak_lag);

        assert_eq!(stats.distribution.spine.histogram.counts.len(), 30);
        assert!(stats.distribution.relative.normality_test.p_value.is_some());
    }

    #[test]
    fn test_velocity_keys_flattened() {
        let fe = synthetic_fe();
        let stats = calculate_statistics(&fe, &AnalysisConfig::default()).unwrap();
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["spine"]["peak_angular_velocity"].is_number());
        assert!(json["relative"].get("peak_angular_velocity").is_none());
        assert!(json["spine"]["rom"].is_number());
    }
}
