use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SweepConfig {
    pub nodes: u32,
    pub sim_time_s: f64,
    pub packet_size: u32,
    pub tx_power_list: Vec<f64>,
    pub interval_list: Vec<f64>,
    pub output_path: PathBuf,
    /// Every scenario's RNG is seeded from this value
    pub seed: u64,
    /// Optional wall-clock budget per scenario, in seconds
    pub scenario_timeout_s: Option<f64>,
    /// Optional path for a JSON dump of the full sweep report
    pub report_json: Option<PathBuf>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            nodes: 30,
            sim_time_s: 30.0,
            packet_size: 100,
            tx_power_list: vec![10.0, 12.0, 14.0, 16.0],
            interval_list: vec![0.2, 0.5, 1.0],
            output_path: PathBuf::from("metrics.csv"),
            seed: 1,
            scenario_timeout_s: None,
            report_json: None,
        }
    }
}

impl SweepConfig {
    /// Checks every field before any scenario is run.
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
        if self.tx_power_list.is_empty() {
            return Err(ConfigError::EmptyAxis("txPowerList"));
        }
        if self.interval_list.is_empty() {
            return Err(ConfigError::EmptyAxis("intervalList"));
        }
        if let Some(&p) = self.tx_power_list.iter().find(|p| !p.is_finite()) {
            return Err(ConfigError::InvalidTxPower(p));
        }
        if let Some(&i) = self
            .interval_list
            .iter()
            .find(|i| !(i.is_finite() && **i > 0.0))
        {
            return Err(ConfigError::InvalidInterval(i));
        }
        if let Some(t) = self.scenario_timeout_s
            && !(t.is_finite() && t > 0.0)
        {
            return Err(ConfigError::InvalidTimeout(t));
        }
        Ok(())
    }
}

/// Partial configuration, as read from a TOML file or collected from CLI flags.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SweepConfigOverride {
    pub nodes: Option<u32>,
    pub sim_time: Option<f64>,
    pub packet_size: Option<u32>,
    pub tx_power_list: Option<Vec<f64>>,
    pub interval_list: Option<Vec<f64>>,
    pub output_path: Option<PathBuf>,
    pub seed: Option<u64>,
    pub scenario_timeout: Option<f64>,
    pub report_json: Option<PathBuf>,
}

impl SweepConfigOverride {
    pub fn apply_to(&self, config: &mut SweepConfig) {
        if let Some(v) = self.nodes {
            config.nodes = v;
        }
        if let Some(v) = self.sim_time {
            config.sim_time_s = v;
        }
        if let Some(v) = self.packet_size {
            config.packet_size = v;
        }
        if let Some(v) = &self.tx_power_list {
            config.tx_power_list = v.clone();
        }
        if let Some(v) = &self.interval_list {
            config.interval_list = v.clone();
        }
        if let Some(v) = &self.output_path {
            config.output_path = v.clone();
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(v) = self.scenario_timeout {
            config.scenario_timeout_s = Some(v);
        }
        if let Some(v) = &self.report_json {
            config.report_json = Some(v.clone());
        }
    }
}
