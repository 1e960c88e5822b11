//! The structured result of one spine/pelvis analysis.

use serde::{Deserialize, Serialize};

use crate::fe::{AccelerationSeries, AngularVelocitySeries, FeAnalysis, FeMetadata, PerSensor, TimeSeries};
use crate::sit_to_stand::SitToStand;
use crate::statistics::Statistics;
use crate::types::StreamSummary;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub time_series: TimeSeries,
    pub angular_velocity: PerSensor<AngularVelocitySeries>,
    pub acceleration: PerSensor<AccelerationSeries>,
    pub statistics: Statistics,
    pub sit_to_stand: SitToStand,
    pub metadata: FeMetadata,
    /// Ingested files before synchronization
    pub sensors: PerSensor<StreamSummary>,
}

impl AnalysisReport {
    pub fn new(
        fe: FeAnalysis,
        statistics: Statistics,
        sit_to_stand: SitToStand,
        sensors: PerSensor<StreamSummary>,
    ) -> Self {
        AnalysisReport {
            time_series: fe.time_series,
            angular_velocity: fe.angular_velocity,
            acceleration: fe.acceleration,
            statistics,
            sit_to_stand,
            metadata: fe.metadata,
            sensors,
        }
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}
