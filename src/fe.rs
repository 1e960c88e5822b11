//! Flexion-extension (FE) angles from a synchronized sensor pair.
//!
//! FE is the pitch of each sensor's orientation. Relative FE is
//! `spine - pelvis`, sample by sample on the shared time axis. Gyroscope and
//! accelerometer axes ride along when the export carried them; a missing
//! axis comes out as an empty series rather than an error.

use serde::{Deserialize, Serialize};

use crate::config::TimeUnit;
use crate::error::{AnalysisError, AnalysisResult};
use crate::orientation::pitch_series;
use crate::signal::round_to;
use crate::sync::SynchronizedPair;
use crate::types::{Axis, Channel, SensorStream};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Seconds since the first synchronized sample
    pub time: Vec<f64>,
    pub spine_fe: Vec<f64>,
    pub pelvis_fe: Vec<f64>,
    pub relative_fe: Vec<f64>,
}

/// Gyroscope axes, deg/s. Empty when the axis is absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AngularVelocitySeries {
    pub gyr_x: Vec<f64>,
    pub gyr_y: Vec<f64>,
    pub gyr_z: Vec<f64>,
}

/// Accelerometer axes. `magnitude` needs all three.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AccelerationSeries {
    pub acc_x: Vec<f64>,
    pub acc_y: Vec<f64>,
    pub acc_z: Vec<f64>,
    pub magnitude: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerSensor<T> {
    pub spine: T,
    pub pelvis: T,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeMetadata {
    pub duration_sec: f64,
    pub total_samples: usize,
    pub sample_rate: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeAnalysis {
    pub time_series: TimeSeries,
    pub angular_velocity: PerSensor<AngularVelocitySeries>,
    pub acceleration: PerSensor<AccelerationSeries>,
    pub metadata: FeMetadata,
}

pub fn analyze_fe(pair: &SynchronizedPair) -> AnalysisResult<FeAnalysis> {
    if pair.is_empty() || pair.spine.len() != pair.pelvis.len() {
        return Err(AnalysisError::computation(format!(
            "FE analysis needs two equal, non-empty streams (spine {}, pelvis {})",
            pair.spine.len(),
            pair.pelvis.len()
        )));
    }

    let spine_fe = pitch_series(&pair.spine.samples)?;
    let pelvis_fe = pitch_series(&pair.pelvis.samples)?;
    let relative_fe = spine_fe
        .iter()
        .zip(&pelvis_fe)
        .map(|(s, p)| s - p)
        .collect();

    let time = rebase_time(&pair.spine.times(), pair.spine.time_unit);
    let metadata = window_metadata(&time);

    Ok(FeAnalysis {
        time_series: TimeSeries {
            time,
            spine_fe,
            pelvis_fe,
            relative_fe,
        },
        angular_velocity: PerSensor {
            spine: angular_velocity(&pair.spine),
            pelvis: angular_velocity(&pair.pelvis),
        },
        acceleration: PerSensor {
            spine: acceleration(&pair.spine),
            pelvis: acceleration(&pair.pelvis),
        },
        metadata,
    })
}

/// Seconds since the first timestamp.
pub fn rebase_time(raw: &[f64], unit: TimeUnit) -> Vec<f64> {
    let Some(&origin) = raw.first() else {
        return Vec::new();
    };
    raw.iter().map(|&t| unit.to_seconds(t - origin)).collect()
}

/// Duration, count and `count / duration` (0 for a zero-length window).
pub fn window_metadata(time_sec: &[f64]) -> FeMetadata {
    let duration = time_sec.last().copied().unwrap_or(0.0);
    let total = time_sec.len();
    let rate = if duration > 0.0 {
        total as f64 / duration
    } else {
        0.0
    };
    FeMetadata {
        duration_sec: round_to(duration, 2),
        total_samples: total,
        sample_rate: round_to(rate, 1),
    }
}

fn axis_or_empty(stream: &SensorStream, channel: Channel, axis: Axis) -> Vec<f64> {
    stream.axis_values(channel, axis).unwrap_or_default()
}

fn angular_velocity(stream: &SensorStream) -> AngularVelocitySeries {
    AngularVelocitySeries {
        gyr_x: axis_or_empty(stream, Channel::AngularVelocity, Axis::X),
        gyr_y: axis_or_empty(stream, Channel::AngularVelocity, Axis::Y),
        gyr_z: axis_or_empty(stream, Channel::AngularVelocity, Axis::Z),
    }
}

fn acceleration(stream: &SensorStream) -> AccelerationSeries {
    let acc_x = axis_or_empty(stream, Channel::Acceleration, Axis::X);
    let acc_y = axis_or_empty(stream, Channel::Acceleration, Axis::Y);
    let acc_z = axis_or_empty(stream, Channel::Acceleration, Axis::Z);

    let magnitude = if [&acc_x, &acc_y, &acc_z].iter().all(|a| !a.is_empty()) {
        stream
            .samples
            .iter()
            .filter_map(|s| s.linear_acceleration.vector())
            .map(|v| v.norm())
            .collect()
    } else {
        Vec::new()
    };

    AccelerationSeries {
        acc_x,
        acc_y,
        acc_z,
        magnitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::sync::synchronize;
    use crate::synthetic::SyntheticRecording;
    use crate::types::{SensorRole, SensorStream};
    use approx::assert_abs_diff_eq;

    fn pair(spine: &SyntheticRecording, pelvis: &SyntheticRecording) -> SynchronizedPair {
        let s = SensorStream::new(SensorRole::Spine, "spine", TimeUnit::Microseconds, spine.samples());
        let p = SensorStream::new(SensorRole::Pelvis, "pelvis", TimeUnit::Microseconds, pelvis.samples());
        synchronize(&s, &p, &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_fe_is_pitch_and_relative_is_difference() {
        let spine = SyntheticRecording::spine();
        let pelvis = SyntheticRecording::pelvis();
        let fe = analyze_fe(&pair(&spine, &pelvis)).unwrap();
        let ts = &fe.time_series;

        assert_eq!(ts.time.len(), 600);
        for i in [0, 137, 599] {
            let t = ts.time[i];
            assert_abs_diff_eq!(ts.spine_fe[i], spine.pitch_at(t).to_degrees(), epsilon = 1e-6);
            assert_abs_diff_eq!(ts.pelvis_fe[i], pelvis.pitch_at(t).to_degrees(), epsilon = 1e-6);
            assert_abs_diff_eq!(ts.relative_fe[i], ts.spine_fe[i] - ts.pelvis_fe[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_time_rebased_and_metadata() {
        let spine = SyntheticRecording {
            start_time_us: 3_000_000.0,
            ..SyntheticRecording::spine()
        };
        let pelvis = SyntheticRecording {
            start_time_us: 3_000_000.0,
            ..SyntheticRecording::pelvis()
        };
        let fe = analyze_fe(&pair(&spine, &pelvis)).unwrap();
        assert_eq!(fe.time_series.time[0], 0.0);
        assert_abs_diff_eq!(fe.time_series.time[1], 0.01, epsilon = 1e-12);
        assert_eq!(fe.metadata.total_samples, 600);
        assert_eq!(fe.metadata.duration_sec, 5.99);
        assert_eq!(fe.metadata.sample_rate, 100.2);
    }

    #[test]
    fn test_inertial_channels_extracted() {
        let fe = analyze_fe(&pair(&SyntheticRecording::spine(), &SyntheticRecording::pelvis())).unwrap();
        let acc = &fe.acceleration.spine;
        assert_eq!(acc.magnitude.len(), 600);
        assert_abs_diff_eq!(acc.magnitude[10], 9.81, epsilon = 1e-9);
        assert_eq!(fe.angular_velocity.pelvis.gyr_y.len(), 600);
    }

    #[test]
    fn test_missing_channels_are_empty() {
        let bare = SyntheticRecording {
            include_inertial: false,
            ..SyntheticRecording::spine()
        };
        let fe = analyze_fe(&pair(&bare, &bare)).unwrap();
        assert!(fe.angular_velocity.spine.gyr_y.is_empty());
        assert!(fe.acceleration.pelvis.acc_x.is_empty());
        assert!(fe.acceleration.pelvis.magnitude.is_empty());
    }

    #[test]
    fn test_zero_duration_rate() {
        let meta = window_metadata(&[0.0, 0.0]);
        assert_eq!(meta.sample_rate, 0.0);
        assert_eq!(meta.total_samples, 2);
    }
}
