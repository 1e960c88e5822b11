//! Deterministic synthetic recordings.
//!
//! Produces Movella-style exports of a sensor nodding sinusoidally about its
//! pitch axis. Used to seed demos and as test fixtures.

use std::f64::consts::PI;
use std::fmt::Write as _;

use crate::types::{quat_wxyz, AxisTriple, Sample};

const GRAVITY: f64 = 9.81; // m/s²

#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticRecording {
    pub sample_rate_hz: f64,
    pub duration_sec: f64,
    /// Peak pitch, radians
    pub amplitude_rad: f64,
    pub frequency_hz: f64,
    pub phase_rad: f64,
    /// Constant pitch added to the sinusoid, radians
    pub offset_rad: f64,
    /// Raw `SampleTimeFine` of the first row, microseconds
    pub start_time_us: f64,
    /// Emit Acc_* and Gyr_* columns
    pub include_inertial: bool,
}

impl Default for SyntheticRecording {
    fn default() -> Self {
        SyntheticRecording {
            sample_rate_hz: 100.0,
            duration_sec: 6.0,
            amplitude_rad: 0.8,
            frequency_hz: 1.2,
            phase_rad: 0.0,
            offset_rad: 0.0,
            start_time_us: 0.0,
            include_inertial: true,
        }
    }
}

impl SyntheticRecording {
    pub fn spine() -> Self {
        SyntheticRecording::default()
    }

    /// Same motion as [`spine`](Self::spine), phase-shifted by 0.6 rad.
    pub fn pelvis() -> Self {
        SyntheticRecording {
            phase_rad: 0.6,
            ..SyntheticRecording::default()
        }
    }

    pub fn sample_count(&self) -> usize {
        (self.sample_rate_hz * self.duration_sec).round().max(0.0) as usize
    }

    /// Pitch in radians `t` seconds after the first sample.
    pub fn pitch_at(&self, t: f64) -> f64 {
        self.offset_rad + self.amplitude_rad * (2.0 * PI * self.frequency_hz * t + self.phase_rad).sin()
    }

    /// Pitch rate in deg/s.
    pub fn pitch_rate_deg_at(&self, t: f64) -> f64 {
        let omega = 2.0 * PI * self.frequency_hz;
        (self.amplitude_rad * omega * (omega * t + self.phase_rad).cos()).to_degrees()
    }

    fn time_us(&self, i: usize) -> f64 {
        self.start_time_us + (i as f64 * 1_000_000.0 / self.sample_rate_hz).round()
    }

    pub fn samples(&self) -> Vec<Sample> {
        (0..self.sample_count())
            .map(|i| {
                let t = i as f64 / self.sample_rate_hz;
                let pitch = self.pitch_at(t);
                let half = pitch / 2.0;
                let mut sample = Sample::new(self.time_us(i), quat_wxyz(half.cos(), 0.0, half.sin(), 0.0));
                if self.include_inertial {
                    sample.angular_velocity = AxisTriple {
                        x: Some(0.0),
                        y: Some(self.pitch_rate_deg_at(t)),
                        z: Some(0.0),
                    };
                    sample.linear_acceleration = AxisTriple {
                        x: Some(-GRAVITY * pitch.sin()),
                        y: Some(0.0),
                        z: Some(GRAVITY * pitch.cos()),
                    };
                }
                sample
            })
            .collect()
    }

    /// Export text, including the trailing delimiter the device writes.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str("PacketCounter,SampleTimeFine,Quat_W,Quat_X,Quat_Y,Quat_Z");
        if self.include_inertial {
            out.push_str(",Acc_X,Acc_Y,Acc_Z,Gyr_X,Gyr_Y,Gyr_Z");
        }
        out.push_str(",\n");

        for (i, s) in self.samples().iter().enumerate() {
            let q = &s.quaternion;
            // writing to a String cannot fail
            let _ = write!(out, "{},{},{:.9},{:.9},{:.9},{:.9}", i, s.time, q.w, q.i, q.j, q.k);
            if self.include_inertial {
                let acc = &s.linear_acceleration;
                let gyr = &s.angular_velocity;
                let _ = write!(
                    out,
                    ",{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
                    acc.x.unwrap_or(0.0),
                    acc.y.unwrap_or(0.0),
                    acc.z.unwrap_or(0.0),
                    gyr.x.unwrap_or(0.0),
                    gyr.y.unwrap_or(0.0),
                    gyr.z.unwrap_or(0.0)
                );
            }
            out.push_str(",\n");
        }
        out
    }
}
