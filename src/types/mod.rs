pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::config::TimeUnit;

/// Which body segment a sensor is strapped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorRole {
    Spine,
    Pelvis,
}

impl SensorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorRole::Spine => "spine",
            SensorRole::Pelvis => "pelvis",
        }
    }
}

impl Display for SensorRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Column suffix as written by the device export (`Gyr_X`).
    pub fn suffix(&self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

/// Optional inertial channels carried next to the quaternion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Gyroscope, deg/s
    AngularVelocity,
    /// Accelerometer, m/s²
    Acceleration,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::AngularVelocity, Channel::Acceleration];

    pub fn column_prefix(&self) -> &'static str {
        match self {
            Channel::AngularVelocity => "Gyr",
            Channel::Acceleration => "Acc",
        }
    }

    pub fn column_name(&self, axis: Axis) -> String {
        format!("{}_{}", self.column_prefix(), axis.suffix())
    }
}

/// Three optional axis readings. An axis is `None` when the export has no
/// such column or the cell was not numeric.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisTriple {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl AxisTriple {
    pub const EMPTY: AxisTriple = AxisTriple {
        x: None,
        y: None,
        z: None,
    };

    pub fn get(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn set(&mut self, axis: Axis, value: Option<f64>) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }

    /// All three axes as a vector, if every one is present.
    pub fn vector(&self) -> Option<Vec3> {
        Some(Vec3::new(self.x?, self.y?, self.z?))
    }
}

/// One instant of a sensor stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    /// Raw device time, in the stream's [`TimeUnit`].
    pub time: f64,
    pub quaternion: Quat,
    pub angular_velocity: AxisTriple,
    pub linear_acceleration: AxisTriple,
}

impl Sample {
    pub fn new(time: f64, quaternion: Quat) -> Self {
        Sample {
            time,
            quaternion,
            angular_velocity: AxisTriple::EMPTY,
            linear_acceleration: AxisTriple::EMPTY,
        }
    }

    pub fn channel(&self, channel: Channel) -> &AxisTriple {
        match channel {
            Channel::AngularVelocity => &self.angular_velocity,
            Channel::Acceleration => &self.linear_acceleration,
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut AxisTriple {
        match channel {
            Channel::AngularVelocity => &mut self.angular_velocity,
            Channel::Acceleration => &mut self.linear_acceleration,
        }
    }
}

/// Ordered samples from one sensor. Time is non-decreasing.
#[derive(Clone, Debug)]
pub struct SensorStream {
    pub role: SensorRole,
    pub sensor_name: String,
    pub time_unit: TimeUnit,
    /// Derived from the timestamps, never taken from file metadata.
    pub sample_rate_hz: f64,
    pub samples: Vec<Sample>,
}

impl SensorStream {
    pub fn new(
        role: SensorRole,
        sensor_name: impl Into<String>,
        time_unit: TimeUnit,
        samples: Vec<Sample>,
    ) -> Self {
        let sample_rate_hz = derive_sample_rate(&samples, time_unit);
        SensorStream {
            role,
            sensor_name: sensor_name.into(),
            time_unit,
            sample_rate_hz,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn start_time(&self) -> Option<f64> {
        self.samples.first().map(|s| s.time)
    }

    pub fn end_time(&self) -> Option<f64> {
        self.samples.last().map(|s| s.time)
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    pub fn duration_sec(&self) -> f64 {
        match (self.start_time(), self.end_time()) {
            (Some(start), Some(end)) => self.time_unit.to_seconds(end - start),
            _ => 0.0,
        }
    }

    /// True when every sample carries a reading for this axis.
    pub fn has_axis(&self, channel: Channel, axis: Axis) -> bool {
        !self.samples.is_empty()
            && self
                .samples
                .iter()
                .all(|s| s.channel(channel).get(axis).is_some())
    }

    /// Axis values, or `None` unless every sample has one.
    pub fn axis_values(&self, channel: Channel, axis: Axis) -> Option<Vec<f64>> {
        if self.samples.is_empty() {
            return None;
        }
        self.samples
            .iter()
            .map(|s| s.channel(channel).get(axis))
            .collect()
    }

    pub fn summary(&self) -> StreamSummary {
        StreamSummary {
            sensor_name: self.sensor_name.clone(),
            role: self.role,
            total_samples: self.len(),
            duration_sec: crate::signal::round_to(self.duration_sec(), 2),
            sample_rate: crate::signal::round_to(self.sample_rate_hz, 1),
            start_time: self.start_time().unwrap_or(0.0),
            end_time: self.end_time().unwrap_or(0.0),
        }
    }
}

/// `count / duration_sec`, or 0 for a zero-length clip.
pub fn derive_sample_rate(samples: &[Sample], unit: TimeUnit) -> f64 {
    match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => {
            let duration = unit.to_seconds(last.time - first.time);
            if duration > 0.0 {
                samples.len() as f64 / duration
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Per-file metadata, as reported back right after an upload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub sensor_name: String,
    pub role: SensorRole,
    pub total_samples: usize,
    pub duration_sec: f64,
    pub sample_rate: f64,
    pub start_time: f64,
    pub end_time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(times: &[f64]) -> SensorStream {
        let samples = times
            .iter()
            .map(|&t| Sample::new(t, quat_wxyz(1.0, 0.0, 0.0, 0.0)))
            .collect();
        SensorStream::new(SensorRole::Spine, "spine", TimeUnit::Microseconds, samples)
    }

    #[test]
    fn test_sample_rate_from_timestamps() {
        let times: Vec<f64> = (0..100).map(|i| i as f64 * 10_000.0).collect();
        let s = stream(&times);
        // 100 samples over 0.99 s
        assert!((s.sample_rate_hz - 100.0 / 0.99).abs() < 1e-9);
        assert!((s.duration_sec() - 0.99).abs() < 1e-12);
    }

    #[test]
    fn test_zero_duration_rate_is_zero() {
        let s = stream(&[5.0, 5.0, 5.0]);
        assert_eq!(s.sample_rate_hz, 0.0);
    }

    #[test]
    fn test_axis_values_require_every_sample() {
        let mut s = stream(&[0.0, 1.0]);
        s.samples[0].angular_velocity.y = Some(1.0);
        assert!(s.axis_values(Channel::AngularVelocity, Axis::Y).is_none());
        s.samples[1].angular_velocity.y = Some(2.0);
        assert_eq!(
            s.axis_values(Channel::AngularVelocity, Axis::Y),
            Some(vec![1.0, 2.0])
        );
        assert!(s.has_axis(Channel::AngularVelocity, Axis::Y));
        assert!(!s.has_axis(Channel::AngularVelocity, Axis::X));
    }

    #[test]
    fn test_axis_triple_vector() {
        let t = AxisTriple {
            x: Some(3.0),
            y: Some(4.0),
            z: Some(0.0),
        };
        assert_eq!(t.vector().map(|v| v.norm()), Some(5.0));
        assert!(AxisTriple::EMPTY.vector().is_none());
    }

    #[test]
    fn test_column_names() {
        assert_eq!(Channel::AngularVelocity.column_name(Axis::Y), "Gyr_Y");
        assert_eq!(Channel::Acceleration.column_name(Axis::Z), "Acc_Z");
    }
}
