//! Lumbo-pelvic coordination analysis from paired spine/pelvis IMU exports.
//!
//! The pipeline runs ingest, synchronization, FE extraction, statistics and
//! sit-to-stand scoring, in that order. Every stage is a plain function
//! returning [`AnalysisResult`]; [`pipeline`] chains them.

pub mod config;
pub mod error;
pub mod fe;
pub mod ingest;
pub mod orientation;
pub mod pipeline;
pub mod report;
pub mod signal;
pub mod sit_to_stand;
pub mod statistics;
pub mod sync;
pub mod synthetic;
pub mod types;

pub use config::{AnalysisConfig, TimeUnit};
pub use error::{AnalysisError, AnalysisResult, FormatError};
pub use pipeline::{analyze_bytes, analyze_paths, analyze_streams};
pub use report::AnalysisReport;
pub use types::{Sample, SensorRole, SensorStream, StreamSummary};
