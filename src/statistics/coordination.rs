//! Lumbo-pelvic coordination: how spine FE tracks pelvis FE.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{AnalysisError, AnalysisResult};
use crate::signal::{mean, min_max, round_to, std_dev};

/// Label carried by [`ResidualBand`] so consumers never mistake it for a
/// confidence interval on the fitted parameters.
pub const RESIDUAL_BAND_METHOD: &str = "linear_residual_approximation";

const BAND_Z: f64 = 1.96;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_value: f64,
}

impl Regression {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContributionRatio {
    pub spine: f64,
    pub pelvis: f64,
}

/// Two points of the fitted line at the pelvis extremes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Fitted line ± 1.96 · std(residuals), evaluated at the pelvis extremes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResidualBand {
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
    pub method: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrossCorrelation {
    pub lags: Vec<i64>,
    pub correlation: Vec<f64>,
    pub peak_lag: i64,
    pub peak_correlation: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordination {
    pub r_squared: f64,
    pub slope: f64,
    pub intercept: f64,
    pub pearson_r: f64,
    pub pearson_p: f64,
    pub contribution_ratio: ContributionRatio,
    pub regression_line: Line,
    pub residual_band: ResidualBand,
    /// `None` when either signal is constant.
    pub cross_correlation: Option<CrossCorrelation>,
}

/// Ordinary least squares of `y` on `x`.
///
/// Fails when `x` is constant: the slope is undefined. A constant `y` fits a
/// flat line with `r = 0`.
pub fn linear_regression(x: &[f64], y: &[f64]) -> AnalysisResult<Regression> {
    if x.len() != y.len() || x.len() < 2 {
        return Err(AnalysisError::computation(format!(
            "regression needs two equal series of at least 2 values (got {} and {})",
            x.len(),
            y.len()
        )));
    }
    let (Some(mx), Some(my)) = (mean(x), mean(y)) else {
        return Err(AnalysisError::computation("regression on empty series"));
    };

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y) {
        let (dx, dy) = (xi - mx, yi - my);
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if !(sxx > 0.0) {
        return Err(AnalysisError::computation(
            "regression undefined: all pelvis values are identical",
        ));
    }

    let slope = sxy / sxx;
    let r_value = if syy > 0.0 {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    } else {
        0.0
    };
    Ok(Regression {
        slope,
        intercept: my - slope * mx,
        r_value,
    })
}

/// Two-sided p-value for a Pearson `r` over `n` pairs.
pub fn pearson_p_value(r: f64, n: usize) -> AnalysisResult<f64> {
    if n < 3 {
        return Ok(1.0);
    }
    if r.abs() >= 1.0 {
        return Ok(0.0);
    }
    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| AnalysisError::computation(format!("Student t with {df} dof: {e}")))?;
    Ok((2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

/// Share of total ROM per sensor, `0.5 / 0.5` when neither moved.
pub fn contribution_ratio(spine_rom: f64, pelvis_rom: f64) -> ContributionRatio {
    let total = spine_rom + pelvis_rom;
    if !(total > 0.0) {
        return ContributionRatio {
            spine: 0.5,
            pelvis: 0.5,
        };
    }
    let spine = round_to(spine_rom / total, 3);
    // complement of the rounded share keeps the pair summing to 1
    ContributionRatio {
        spine,
        pelvis: round_to(1.0 - spine, 3),
    }
}

/// Normalised cross-correlation for lags `-max_lag..=max_lag`.
///
/// `c[k] = Σ a[n+k]·b[n] / N` over z-scored signals, so a positive peak lag
/// means `a` trails `b`. `max_lag` is clamped to `N - 1`.
pub fn cross_correlation(a: &[f64], b: &[f64], max_lag: usize) -> AnalysisResult<CrossCorrelation> {
    let n = a.len();
    if n != b.len() || n == 0 {
        return Err(AnalysisError::computation(format!(
            "cross-correlation needs two equal, non-empty series (got {} and {})",
            a.len(),
            b.len()
        )));
    }
    let za = z_score(a)?;
    let zb = z_score(b)?;
    let max_lag = max_lag.min(n - 1) as i64;

    let lags: Vec<i64> = (-max_lag..=max_lag).collect();
    let raw: Vec<f64> = lags
        .iter()
        .map(|&lag| {
            let sum: f64 = (0..n as i64)
                .filter_map(|i| {
                    let j = i + lag;
                    (0..n as i64).contains(&j).then(|| za[j as usize] * zb[i as usize])
                })
                .sum();
            sum / n as f64
        })
        .collect();

    let mut peak = 0;
    for (i, c) in raw.iter().enumerate() {
        if c.abs() > raw[peak].abs() {
            peak = i;
        }
    }

    Ok(CrossCorrelation {
        peak_lag: lags[peak],
        peak_correlation: round_to(raw[peak], 3),
        correlation: raw.iter().map(|&c| round_to(c, 3)).collect(),
        lags,
    })
}

fn z_score(values: &[f64]) -> AnalysisResult<Vec<f64>> {
    let (Some(m), Some(s)) = (mean(values), std_dev(values)) else {
        return Err(AnalysisError::computation("z-score of empty series"));
    };
    if !(s > 0.0) {
        return Err(AnalysisError::computation("z-score of constant series"));
    }
    Ok(values.iter().map(|v| (v - m) / s).collect())
}

/// Full coordination block between spine and pelvis FE.
pub fn coordination(spine: &[f64], pelvis: &[f64], max_lag: usize) -> AnalysisResult<Coordination> {
    let fit = linear_regression(pelvis, spine)?;
    let pearson_p = pearson_p_value(fit.r_value, spine.len())?;

    let (spine_lo, spine_hi) = min_max(spine).unwrap_or_default();
    let (pelvis_lo, pelvis_hi) = min_max(pelvis).unwrap_or_default();

    let residuals: Vec<f64> = pelvis
        .iter()
        .zip(spine)
        .map(|(&x, &y)| y - fit.predict(x))
        .collect();
    let half_width = BAND_Z * std_dev(&residuals).unwrap_or(0.0);

    let extremes = [pelvis_lo, pelvis_hi];
    let line: Vec<f64> = extremes.iter().map(|&x| fit.predict(x)).collect();

    let cross = match cross_correlation(spine, pelvis, max_lag) {
        Ok(cc) => Some(cc),
        Err(err) => {
            log::debug!("cross-correlation skipped: {err}");
            None
        }
    };

    Ok(Coordination {
        r_squared: round_to(fit.r_value * fit.r_value, 3),
        slope: round_to(fit.slope, 3),
        intercept: round_to(fit.intercept, 3),
        pearson_r: round_to(fit.r_value, 3),
        pearson_p: round_to(pearson_p, 4),
        contribution_ratio: contribution_ratio(spine_hi - spine_lo, pelvis_hi - pelvis_lo),
        regression_line: Line {
            x: extremes.iter().map(|&x| round_to(x, 2)).collect(),
            y: line.iter().map(|&y| round_to(y, 2)).collect(),
        },
        residual_band: ResidualBand {
            upper: line.iter().map(|&y| round_to(y + half_width, 2)).collect(),
            lower: line.iter().map(|&y| round_to(y - half_width, 2)).collect(),
            method: RESIDUAL_BAND_METHOD.to_string(),
        },
        cross_correlation: cross,
    })
}
