//! End-to-end analysis: two recordings in, one [`AnalysisReport`] out.
//!
//! Stages run in order and the first failure aborts the whole analysis.
//! Nothing here holds state between calls, so independent analyses can run
//! on separate threads.

use std::path::Path;

use crate::config::AnalysisConfig;
use crate::error::AnalysisResult;
use crate::fe::{analyze_fe, PerSensor};
use crate::ingest::{ingest_bytes, ingest_path};
use crate::report::AnalysisReport;
use crate::sit_to_stand::analyze_sit_to_stand;
use crate::statistics::calculate_statistics;
use crate::sync::synchronize;
use crate::types::{SensorRole, SensorStream};

/// Analyse two already ingested streams.
pub fn analyze_streams(
    spine: &SensorStream,
    pelvis: &SensorStream,
    config: &AnalysisConfig,
) -> AnalysisResult<AnalysisReport> {
    let pair = synchronize(spine, pelvis, config)?;
    let fe = analyze_fe(&pair)?;
    let statistics = calculate_statistics(&fe, config)?;
    let sit_to_stand = analyze_sit_to_stand(&pair)?;

    log::debug!(
        "analysed {} + {}: {} samples over {} s",
        spine.sensor_name,
        pelvis.sensor_name,
        fe.metadata.total_samples,
        fe.metadata.duration_sec
    );

    Ok(AnalysisReport::new(
        fe,
        statistics,
        sit_to_stand,
        PerSensor {
            spine: spine.summary(),
            pelvis: pelvis.summary(),
        },
    ))
}

/// Analyse two in-memory exports.
pub fn analyze_bytes(spine: &[u8], pelvis: &[u8], config: &AnalysisConfig) -> AnalysisResult<AnalysisReport> {
    let spine = ingest_bytes(spine, SensorRole::Spine, "spine", config)?;
    let pelvis = ingest_bytes(pelvis, SensorRole::Pelvis, "pelvis", config)?;
    analyze_streams(&spine, &pelvis, config)
}

/// Analyse two exports on disk (`.csv` or `.csv.gz`).
pub fn analyze_paths(spine: &Path, pelvis: &Path, config: &AnalysisConfig) -> AnalysisResult<AnalysisReport> {
    let spine = ingest_path(spine, SensorRole::Spine, config)?;
    let pelvis = ingest_path(pelvis, SensorRole::Pelvis, config)?;
    analyze_streams(&spine, &pelvis, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalysisError, FormatError};
    use crate::synthetic::SyntheticRecording;
    use approx::assert_abs_diff_eq;

    fn synthetic_pair() -> (String, String) {
        (SyntheticRecording::spine().to_csv(), SyntheticRecording::pelvis().to_csv())
    }

    #[test]
    fn test_end_to_end_synthetic() {
        let (spine, pelvis) = synthetic_pair();
        let report = analyze_bytes(spine.as_bytes(), pelvis.as_bytes(), &AnalysisConfig::default()).unwrap();

        assert_eq!(report.time_series.time.len(), 600);
        assert_eq!(report.time_series.relative_fe.len(), 600);
        assert_eq!(report.metadata.total_samples, 600);
        assert_abs_diff_eq!(report.metadata.duration_sec, 5.99, epsilon = 0.02);
        assert_eq!(report.sensors.spine.total_samples, 600);
        assert_eq!(report.sit_to_stand.lordosis_data.angles.len(), 600);

        let json = report.to_json(false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for key in [
            "time_series",
            "angular_velocity",
            "acceleration",
            "statistics",
            "sit_to_stand",
            "metadata",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value["statistics"]["coordination"]["contribution_ratio"]["spine"].is_number());
        assert!(value["sit_to_stand"]["scores"]["pelvic_rotation"].is_number());
    }

    #[test]
    fn test_missing_quaternion_column_aborts() {
        let (spine, pelvis) = synthetic_pair();
        let broken = spine.replacen("Quat_W", "Quat_Q", 1);
        let err = analyze_bytes(broken.as_bytes(), pelvis.as_bytes(), &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InvalidFormat(FormatError::MissingColumns(ref cols)) if cols == &["Quat_W"]
        ));
    }

    #[test]
    fn test_short_recording_aborts() {
        let short = SyntheticRecording {
            duration_sec: 0.5,
            ..SyntheticRecording::spine()
        }
        .to_csv();
        let (_, pelvis) = synthetic_pair();
        let err = analyze_bytes(short.as_bytes(), pelvis.as_bytes(), &AnalysisConfig::default()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientData {
                found: 50,
                required: 100
            }
        );
    }

    #[test]
    fn test_disjoint_recordings_abort() {
        let spine = SyntheticRecording::spine().to_csv();
        let pelvis = SyntheticRecording {
            start_time_us: 60_000_000.0,
            ..SyntheticRecording::pelvis()
        }
        .to_csv();
        let err = analyze_bytes(spine.as_bytes(), pelvis.as_bytes(), &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::NoOverlap { .. }));
        assert_eq!(err.code(), "E006");
    }

    #[test]
    fn test_paths_with_gzip() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let (spine, pelvis) = synthetic_pair();
        let dir = std::env::temp_dir().join(format!("lumbo_pelvic_pipeline_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let spine_path = dir.join("trial_spine.csv");
        std::fs::write(&spine_path, spine).unwrap();
        let pelvis_path = dir.join("trial_pelvis.csv.gz");
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(pelvis.as_bytes()).unwrap();
        std::fs::write(&pelvis_path, gz.finish().unwrap()).unwrap();

        let report = analyze_paths(&spine_path, &pelvis_path, &AnalysisConfig::default()).unwrap();
        assert_eq!(report.metadata.total_samples, 600);
        assert_eq!(report.sensors.pelvis.sensor_name, "trial_pelvis.csv");

        std::fs::remove_dir_all(&dir).ok();
    }
}
