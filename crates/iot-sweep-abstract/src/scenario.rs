use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// One grid point of a sweep. Immutable once built by the driver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScenarioParameters {
    /// Number of sensor nodes (the sink is extra)
    pub nodes: u32,
    pub sim_time_s: f64,
    pub tx_power_dbm: f64,
    pub packet_interval_s: f64,
    /// UDP payload size in bytes
    pub packet_size: u32,
}

impl ScenarioParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes == 0 {
            return Err(ConfigError::NoNodes);
        }
        if !(self.sim_time_s.is_finite() && self.sim_time_s > 0.0) {
            return Err(ConfigError::InvalidSimTime(self.sim_time_s));
        }
        if self.packet_size == 0 {
            return Err(ConfigError::EmptyPacket);
        }
        if !(self.packet_interval_s.is_finite() && self.packet_interval_s > 0.0) {
            return Err(ConfigError::InvalidInterval(self.packet_interval_s));
        }
        if !self.tx_power_dbm.is_finite() {
            return Err(ConfigError::InvalidTxPower(self.tx_power_dbm));
        }
        Ok(())
    }
}

/// Scenario-level summary averaged over active flows.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ScenarioResult {
    pub throughput_mbps: f64,
    pub delay_s: f64,
    pub pdr: f64,
    /// Number of flows that transmitted at least one packet
    pub flows: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    Completed(ScenarioResult),
    Failed { error: String },
}

impl ScenarioOutcome {
    /// Metrics to report for this grid point. Failed points report zeros.
    pub fn result_or_zero(&self) -> ScenarioResult {
        match self {
            ScenarioOutcome::Completed(result) => *result,
            ScenarioOutcome::Failed { .. } => ScenarioResult::default(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ScenarioOutcome::Failed { .. })
    }
}

/// A scenario outcome tagged with the parameters that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioRecord {
    pub params: ScenarioParameters,
    pub outcome: ScenarioOutcome,
}

/// All records of a sweep, in grid-iteration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SweepReport {
    pub records: Vec<ScenarioRecord>,
}

impl SweepReport {
    pub fn push(&mut self, record: ScenarioRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ScenarioRecord> {
        self.records.iter().filter(|r| r.outcome.is_failed())
    }
}
