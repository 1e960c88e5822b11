//! Sit-to-stand movement scoring.
//!
//! Three angle signals come from one synchronized pair:
//!
//! * lordosis: spine pitch minus pelvis pitch, target ≤ 0°
//! * pelvic rotation: pelvis pitch, optimal range 30° to 60°
//! * trunk lean: spine pitch, judged on peak, timing and smoothness
//!
//! Each yields a 0..=100 score. The rules are fixed piecewise-linear
//! tables; scores keep two decimals.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::fe::rebase_time;
use crate::orientation::pitch_series;
use crate::signal::{argmax, gradient, mean, min_max, round_to, std_dev};
use crate::sync::SynchronizedPair;

const PELVIC_OPTIMAL_MIN: f64 = 30.0;
const PELVIC_OPTIMAL_MAX: f64 = 60.0;
const PELVIC_MAX_PENALTY: f64 = 40.0;

const TRUNK_PEAK_MIN: f64 = 20.0;
const TRUNK_PEAK_MAX: f64 = 45.0;
const TRUNK_PEAK_WEIGHT: f64 = 50.0;
const TRUNK_PEAK_MAX_PENALTY: f64 = 25.0;
const TRUNK_TIMING_WEIGHT: f64 = 30.0;
/// Middle third, as fractional position of the peak sample.
const TRUNK_TIMING_WINDOW: (f64, f64) = (0.33, 0.67);
const TRUNK_SMOOTHNESS_WEIGHT: f64 = 20.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LordosisStats {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    pub std: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LordosisData {
    pub angles: Vec<f64>,
    pub time: Vec<f64>,
    pub stats: LordosisStats,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PelvicRotationData {
    pub angles: Vec<f64>,
    pub time: Vec<f64>,
    pub range: f64,
    /// Largest absolute pitch
    pub peak: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrunkLeanData {
    pub angles: Vec<f64>,
    pub time: Vec<f64>,
    /// Largest forward pitch
    pub peak: f64,
    /// Seconds at which `peak` first occurs
    pub peak_time: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub lordosis: f64,
    #[serde(alias = "hip_hinge")]
    pub pelvic_rotation: f64,
    pub trunk_lean: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SitToStand {
    pub lordosis_data: LordosisData,
    pub pelvic_rotation_data: PelvicRotationData,
    pub trunk_lean_data: TrunkLeanData,
    pub scores: Scores,
}

pub fn analyze_sit_to_stand(pair: &SynchronizedPair) -> AnalysisResult<SitToStand> {
    if pair.is_empty() || pair.spine.len() != pair.pelvis.len() {
        return Err(AnalysisError::computation(format!(
            "sit-to-stand needs two equal, non-empty streams (spine {}, pelvis {})",
            pair.spine.len(),
            pair.pelvis.len()
        )));
    }

    let time = rebase_time(&pair.spine.times(), pair.spine.time_unit);
    let trunk_lean = pitch_series(&pair.spine.samples)?;
    let pelvic_rotation = pitch_series(&pair.pelvis.samples)?;
    let lordosis: Vec<f64> = trunk_lean
        .iter()
        .zip(&pelvic_rotation)
        .map(|(s, p)| s - p)
        .collect();

    let lordosis_stats = lordosis_stats(&lordosis)?;
    let (pelvis_lo, pelvis_hi) = extremes(&pelvic_rotation)?;
    let pelvic_range = pelvis_hi - pelvis_lo;
    let pelvic_peak = pelvis_lo.abs().max(pelvis_hi.abs());

    let (_, trunk_peak) = extremes(&trunk_lean)?;
    let peak_idx = argmax(&trunk_lean).unwrap_or(0);
    let peak_time = time.get(peak_idx).copied().unwrap_or(0.0);

    let scores = Scores {
        lordosis: round_to(lordosis_score(&lordosis), 2),
        pelvic_rotation: round_to(pelvic_rotation_score(pelvic_range), 2),
        trunk_lean: round_to(trunk_lean_score(&trunk_lean), 2),
    };
    log::debug!(
        "sit-to-stand scores: lordosis {}, pelvic rotation {}, trunk lean {}",
        scores.lordosis,
        scores.pelvic_rotation,
        scores.trunk_lean
    );

    Ok(SitToStand {
        lordosis_data: LordosisData {
            angles: lordosis,
            time: time.clone(),
            stats: lordosis_stats,
        },
        pelvic_rotation_data: PelvicRotationData {
            angles: pelvic_rotation,
            time: time.clone(),
            range: round_to(pelvic_range, 2),
            peak: round_to(pelvic_peak, 2),
        },
        trunk_lean_data: TrunkLeanData {
            angles: trunk_lean,
            time,
            peak: round_to(trunk_peak, 2),
            peak_time: round_to(peak_time, 2),
        },
        scores,
    })
}

fn extremes(values: &[f64]) -> AnalysisResult<(f64, f64)> {
    min_max(values).ok_or_else(|| AnalysisError::computation("extremes of an empty series"))
}

fn lordosis_stats(lordosis: &[f64]) -> AnalysisResult<LordosisStats> {
    let (lo, hi) = extremes(lordosis)?;
    let (Some(m), Some(s)) = (mean(lordosis), std_dev(lordosis)) else {
        return Err(AnalysisError::computation("lordosis statistics of an empty series"));
    };
    Ok(LordosisStats {
        mean: round_to(m, 2),
        max: round_to(hi, 2),
        min: round_to(lo, 2),
        std: round_to(s, 2),
    })
}

/// Percentage of frames at or below 0°.
pub fn lordosis_score(lordosis: &[f64]) -> f64 {
    if lordosis.is_empty() {
        return 0.0;
    }
    let in_target = lordosis.iter().filter(|&&a| a <= 0.0).count();
    (in_target as f64 / lordosis.len() as f64 * 100.0).clamp(0.0, 100.0)
}

/// Score a pelvic pitch range against the 30°..=60° band.
pub fn pelvic_rotation_score(range: f64) -> f64 {
    let score = if (PELVIC_OPTIMAL_MIN..=PELVIC_OPTIMAL_MAX).contains(&range) {
        100.0
    } else if range < PELVIC_OPTIMAL_MIN {
        range / PELVIC_OPTIMAL_MIN * 100.0
    } else {
        100.0 - (range - PELVIC_OPTIMAL_MAX).min(PELVIC_MAX_PENALTY)
    };
    score.clamp(0.0, 100.0)
}

pub fn trunk_peak_component(peak: f64) -> f64 {
    let score = if (TRUNK_PEAK_MIN..=TRUNK_PEAK_MAX).contains(&peak) {
        TRUNK_PEAK_WEIGHT
    } else if peak < TRUNK_PEAK_MIN {
        peak / TRUNK_PEAK_MIN * TRUNK_PEAK_WEIGHT
    } else {
        TRUNK_PEAK_WEIGHT - (peak - TRUNK_PEAK_MAX).min(TRUNK_PEAK_MAX_PENALTY)
    };
    score.clamp(0.0, TRUNK_PEAK_WEIGHT)
}

/// `position` is `peak_index / frame_count`.
pub fn trunk_timing_component(position: f64) -> f64 {
    let (lo, hi) = TRUNK_TIMING_WINDOW;
    let score = if (lo..=hi).contains(&position) {
        TRUNK_TIMING_WEIGHT
    } else {
        let distance = (position - 0.5).abs();
        TRUNK_TIMING_WEIGHT * (1.0 - (distance * 2.0).min(1.0))
    };
    score.clamp(0.0, TRUNK_TIMING_WEIGHT)
}

/// `20 / (1 + std(jerk))`, derivatives taken per sample.
pub fn trunk_smoothness_component(trunk_lean: &[f64]) -> f64 {
    let acceleration = gradient(&gradient(trunk_lean));
    let jerk = gradient(&acceleration);
    let spread = std_dev(&jerk).unwrap_or(0.0);
    (TRUNK_SMOOTHNESS_WEIGHT / (1.0 + spread)).clamp(0.0, TRUNK_SMOOTHNESS_WEIGHT)
}

pub fn trunk_lean_score(trunk_lean: &[f64]) -> f64 {
    let (Some((_, peak)), Some(peak_idx)) = (min_max(trunk_lean), argmax(trunk_lean)) else {
        return 0.0;
    };
    let position = peak_idx as f64 / trunk_lean.len() as f64;
    let total = trunk_peak_component(peak)
        + trunk_timing_component(position)
        + trunk_smoothness_component(trunk_lean);
    total.clamp(0.0, 100.0)
}
