pub mod config;
pub mod error;
pub mod flow;
pub mod interface;
pub mod scenario;

pub use interface::{NetworkEngine, ScenarioEnvironment};
pub use flow::{FlowCounters, FlowKey, FlowSummary};

pub use config::{SweepConfig, SweepConfigOverride};
pub use error::{ConfigError, EngineError, SweepError};
pub use scenario::{
    ScenarioOutcome, ScenarioParameters, ScenarioRecord, ScenarioResult, SweepReport,
};
