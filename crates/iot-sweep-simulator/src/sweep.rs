use crate::scenario_runner::ScenarioRunner;
use iot_sweep_abstract::{
    ScenarioOutcome, ScenarioParameters, ScenarioRecord, SweepConfig, SweepError, SweepReport,
};
use std::io;
use tracing::{info, warn};

/// Fields shared by every grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedParameters {
    pub nodes: u32,
    pub sim_time_s: f64,
    pub packet_size: u32,
}

/// Transmit power x packet interval grid, tx power being the outer axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrid {
    pub fixed: FixedParameters,
    pub tx_power_dbm: Vec<f64>,
    pub packet_interval_s: Vec<f64>,
}

impl ParameterGrid {
    pub fn from_config(config: &SweepConfig) -> Result<Self, SweepError> {
        config.validate()?;
        Ok(Self {
            fixed: FixedParameters {
                nodes: config.nodes,
                sim_time_s: config.sim_time_s,
                packet_size: config.packet_size,
            },
            tx_power_dbm: config.tx_power_list.clone(),
            packet_interval_s: config.interval_list.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.tx_power_dbm.len() * self.packet_interval_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grid points in row-major order: the interval varies fastest.
    pub fn points(&self) -> impl Iterator<Item = ScenarioParameters> + '_ {
        let fixed = self.fixed;
        self.tx_power_dbm.iter().flat_map(move |&tx_power_dbm| {
            self.packet_interval_s
                .iter()
                .map(move |&packet_interval_s| ScenarioParameters {
                    nodes: fixed.nodes,
                    sim_time_s: fixed.sim_time_s,
                    tx_power_dbm,
                    packet_interval_s,
                    packet_size: fixed.packet_size,
                })
        })
    }
}

/// Receives sweep progress as it happens.
pub trait ReportSink {
    /// Called before a grid point is run.
    fn scenario_started(&mut self, _index: usize, _params: &ScenarioParameters) {}

    /// Called once per grid point, failed ones included. An error aborts the sweep.
    fn scenario_finished(&mut self, record: &ScenarioRecord) -> io::Result<()>;

    /// Called after the last grid point.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run every grid point in order, streaming each record to `sink`.
///
/// Engine failures are recorded against their grid point and the sweep moves on;
/// sink failures abort it.
pub fn run_sweep(
    runner: &mut ScenarioRunner,
    grid: &ParameterGrid,
    sink: &mut dyn ReportSink,
) -> Result<SweepReport, SweepError> {
    let mut report = SweepReport::default();
    info!(
        "Sweeping {} scenarios on engine '{}'",
        grid.len(),
        runner.engine_name()
    );

    for (index, params) in grid.points().enumerate() {
        info!(
            "Running scenario: TxPower={} dBm, Interval={} s",
            params.tx_power_dbm, params.packet_interval_s
        );
        sink.scenario_started(index, &params);

        let outcome = match runner.run_scenario(params) {
            Ok(result) => ScenarioOutcome::Completed(result),
            Err(err) => {
                warn!(
                    "Scenario TxPower={} dBm, Interval={} s failed: {}",
                    params.tx_power_dbm, params.packet_interval_s, err
                );
                ScenarioOutcome::Failed {
                    error: err.to_string(),
                }
            }
        };

        let record = ScenarioRecord { params, outcome };
        sink.scenario_finished(&record)?;
        report.push(record);
    }

    sink.finish()?;
    Ok(report)
}
