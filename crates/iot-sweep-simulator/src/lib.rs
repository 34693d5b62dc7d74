pub mod aggregate;
pub mod channel;
pub mod engine;
pub mod monitor;
pub mod report;
pub mod scenario_runner;
pub mod sweep;

#[cfg(test)]
mod stub;

pub use aggregate::aggregate;
pub use engine::{WirelessEngine, WirelessScenario};
pub use report::{CsvReportSink, write_json_report};
pub use scenario_runner::ScenarioRunner;
pub use sweep::{FixedParameters, ParameterGrid, ReportSink, run_sweep};
