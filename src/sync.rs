//! Temporal alignment of the spine and pelvis streams.
//!
//! Both streams are cut to their common window `[max(starts), min(ends)]`.
//! The one with more samples inside the window supplies the time axis and
//! the other is linearly interpolated onto it, column by column. Because the
//! interpolation domain is the cut window itself, nothing is extrapolated.

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::signal::interp;
use crate::types::{quat_wxyz, Axis, Channel, Sample, SensorRole, SensorStream};

/// Two streams on one shared time axis. Spine first, pelvis second.
#[derive(Clone, Debug)]
pub struct SynchronizedPair {
    pub spine: SensorStream,
    pub pelvis: SensorStream,
    /// Which stream's timestamps were kept verbatim.
    pub time_base: SensorRole,
    /// Raw window bounds, in the streams' time unit.
    pub window: (f64, f64),
}

impl SynchronizedPair {
    pub fn len(&self) -> usize {
        self.spine.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spine.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.spine.times()
    }
}

/// Align two streams. Ties in sample count keep the spine's timestamps.
pub fn synchronize(
    spine: &SensorStream,
    pelvis: &SensorStream,
    config: &AnalysisConfig,
) -> AnalysisResult<SynchronizedPair> {
    let (spine_start, spine_end) = bounds(spine)?;
    let (pelvis_start, pelvis_end) = bounds(pelvis)?;

    let start = spine_start.max(pelvis_start);
    let end = spine_end.min(pelvis_end);
    if !(start <= end) {
        return Err(AnalysisError::NoOverlap { start, end });
    }

    let spine_cut = cut(spine, start, end);
    let pelvis_cut = cut(pelvis, start, end);
    if spine_cut.is_empty() || pelvis_cut.is_empty() {
        return Err(AnalysisError::NoOverlap { start, end });
    }

    let base_len = spine_cut.len().max(pelvis_cut.len());
    if base_len < config.min_overlap_samples {
        return Err(AnalysisError::InsufficientData {
            found: base_len,
            required: config.min_overlap_samples,
        });
    }

    let (spine_samples, pelvis_samples, time_base) = if spine_cut.len() >= pelvis_cut.len() {
        let resampled = resample_onto(&pelvis_cut, &spine_cut);
        (spine_cut, resampled, SensorRole::Spine)
    } else {
        let resampled = resample_onto(&spine_cut, &pelvis_cut);
        (resampled, pelvis_cut, SensorRole::Pelvis)
    };

    log::debug!(
        "synchronized {} samples over [{}, {}], time base {}",
        spine_samples.len(),
        start,
        end,
        time_base
    );

    Ok(SynchronizedPair {
        spine: SensorStream::new(
            SensorRole::Spine,
            spine.sensor_name.clone(),
            spine.time_unit,
            spine_samples,
        ),
        pelvis: SensorStream::new(
            SensorRole::Pelvis,
            pelvis.sensor_name.clone(),
            pelvis.time_unit,
            pelvis_samples,
        ),
        time_base,
        window: (start, end),
    })
}

fn bounds(stream: &SensorStream) -> AnalysisResult<(f64, f64)> {
    match (stream.start_time(), stream.end_time()) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(AnalysisError::InsufficientData {
            found: 0,
            required: 1,
        }),
    }
}

fn cut(stream: &SensorStream, start: f64, end: f64) -> Vec<Sample> {
    stream
        .samples
        .iter()
        .filter(|s| s.time >= start && s.time <= end)
        .cloned()
        .collect()
}

/// Interpolate every column of `source` at the timestamps of `base`.
///
/// An optional axis is carried over only when every source sample has it.
fn resample_onto(source: &[Sample], base: &[Sample]) -> Vec<Sample> {
    let xp: Vec<f64> = source.iter().map(|s| s.time).collect();
    let qw: Vec<f64> = source.iter().map(|s| s.quaternion.w).collect();
    let qx: Vec<f64> = source.iter().map(|s| s.quaternion.i).collect();
    let qy: Vec<f64> = source.iter().map(|s| s.quaternion.j).collect();
    let qz: Vec<f64> = source.iter().map(|s| s.quaternion.k).collect();

    let optional: Vec<(Channel, Axis, Vec<f64>)> = Channel::ALL
        .iter()
        .flat_map(|&ch| Axis::ALL.iter().map(move |&axis| (ch, axis)))
        .filter_map(|(ch, axis)| {
            let values: Option<Vec<f64>> =
                source.iter().map(|s| s.channel(ch).get(axis)).collect();
            values.map(|v| (ch, axis, v))
        })
        .collect();

    base.iter()
        .map(|b| {
            let t = b.time;
            let mut sample = Sample::new(
                t,
                quat_wxyz(
                    interp(t, &xp, &qw),
                    interp(t, &xp, &qx),
                    interp(t, &xp, &qy),
                    interp(t, &xp, &qz),
                ),
            );
            for (channel, axis, fp) in &optional {
                sample.channel_mut(*channel).set(*axis, Some(interp(t, &xp, fp)));
            }
            sample
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeUnit;
    use crate::types::AxisTriple;
    use approx::assert_abs_diff_eq;

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            min_overlap_samples: 2,
            ..AnalysisConfig::default()
        }
    }

    fn stream(role: SensorRole, times: &[f64], w_of_t: impl Fn(f64) -> f64) -> SensorStream {
        let samples = times
            .iter()
            .map(|&t| {
                let mut s = Sample::new(t, quat_wxyz(w_of_t(t), 0.0, 0.0, 0.0));
                s.angular_velocity = AxisTriple {
                    x: None,
                    y: Some(t * 2.0),
                    z: None,
                };
                s
            })
            .collect();
        SensorStream::new(role, role.as_str(), TimeUnit::Seconds, samples)
    }

    fn range(start: f64, step: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    #[test]
    fn test_denser_stream_is_time_base() {
        let spine = stream(SensorRole::Spine, &range(0.0, 1.0, 11), |t| t);
        let pelvis = stream(SensorRole::Pelvis, &range(0.0, 0.5, 21), |t| t);
        let pair = synchronize(&spine, &pelvis, &config()).unwrap();

        assert_eq!(pair.time_base, SensorRole::Pelvis);
        assert_eq!(pair.spine.len(), 21);
        assert_eq!(pair.pelvis.len(), 21);
        assert_eq!(pair.spine.times(), pair.pelvis.times());
        assert_eq!(pair.spine.role, SensorRole::Spine);
        // spine interpolated halfway between its samples
        assert_abs_diff_eq!(pair.spine.samples[3].quaternion.w, 1.5, epsilon = 1e-12);
        assert_eq!(pair.spine.samples[3].angular_velocity.y, Some(3.0));
    }

    #[test]
    fn test_tie_uses_spine() {
        let spine = stream(SensorRole::Spine, &range(0.0, 1.0, 10), |_| 1.0);
        let pelvis = stream(SensorRole::Pelvis, &range(0.25, 1.0, 10), |_| 1.0);
        let pair = synchronize(&spine, &pelvis, &config()).unwrap();
        // overlap [0.25, 9.0]: spine has 1..=9 (9), pelvis 0.25..=8.25 (9)
        assert_eq!(pair.time_base, SensorRole::Spine);
        assert_eq!(pair.times(), range(1.0, 1.0, 9));
    }

    #[test]
    fn test_output_restricted_to_overlap() {
        let spine = stream(SensorRole::Spine, &range(0.0, 1.0, 20), |_| 1.0);
        let pelvis = stream(SensorRole::Pelvis, &range(5.0, 0.5, 11), |_| 1.0);
        let pair = synchronize(&spine, &pelvis, &config()).unwrap();
        assert_eq!(pair.window, (5.0, 10.0));
        // pelvis has 11 samples in the window, spine 6
        assert_eq!(pair.len(), 11);
        assert!(pair.times().iter().all(|&t| (5.0..=10.0).contains(&t)));
    }

    #[test]
    fn test_disjoint_streams_fail() {
        let spine = stream(SensorRole::Spine, &range(0.0, 1.0, 10), |_| 1.0);
        let pelvis = stream(SensorRole::Pelvis, &range(100.0, 1.0, 10), |_| 1.0);
        let err = synchronize(&spine, &pelvis, &config()).unwrap_err();
        assert!(matches!(err, AnalysisError::NoOverlap { .. }));
    }

    #[test]
    fn test_window_without_samples_fails() {
        // pelvis spans spine's gap but spine has nothing inside it
        let spine = stream(SensorRole::Spine, &[0.0, 10.0], |_| 1.0);
        let pelvis = stream(SensorRole::Pelvis, &range(2.0, 1.0, 5), |_| 1.0);
        let err = synchronize(&spine, &pelvis, &config()).unwrap_err();
        assert!(matches!(err, AnalysisError::NoOverlap { .. }));
    }

    #[test]
    fn test_tiny_overlap_is_insufficient() {
        let spine = stream(SensorRole::Spine, &range(0.0, 1.0, 200), |_| 1.0);
        let pelvis = stream(SensorRole::Pelvis, &range(195.0, 1.0, 200), |_| 1.0);
        let err = synchronize(&spine, &pelvis, &AnalysisConfig::default()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientData {
                found: 5,
                required: 100
            }
        );
    }

    #[test]
    fn test_partial_axis_is_dropped() {
        let spine = stream(SensorRole::Spine, &range(0.0, 0.5, 21), |_| 1.0);
        let mut pelvis = stream(SensorRole::Pelvis, &range(0.0, 1.0, 11), |_| 1.0);
        pelvis.samples[4].angular_velocity.y = None;
        let pair = synchronize(&spine, &pelvis, &config()).unwrap();
        assert!(!pair.pelvis.has_axis(Channel::AngularVelocity, Axis::Y));
        assert!(pair.spine.has_axis(Channel::AngularVelocity, Axis::Y));
    }
}
