use crate::error::EngineError;
use crate::flow::FlowCounters;
use crate::scenario::ScenarioParameters;

/// A network simulation backend.
/// The sweep only ever talks to the engine through this trait and [`ScenarioEnvironment`].
pub trait NetworkEngine {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Build a fresh, isolated environment for one scenario.
    /// Nothing created here may be shared with environments built by earlier calls.
    fn build(
        &mut self,
        params: &ScenarioParameters,
    ) -> Result<Box<dyn ScenarioEnvironment>, EngineError>;
}

/// A single scenario's private simulation state (clock, RNG, topology, flow monitor).
pub trait ScenarioEnvironment {
    /// Advance simulated time until `horizon_s` seconds.
    fn run_until(&mut self, horizon_s: f64) -> Result<(), EngineError>;

    /// Snapshot the counters of every flow observed so far.
    fn flow_counters(&mut self) -> Vec<FlowCounters>;

    /// Release every resource held by the environment.
    /// Must be safe to call more than once.
    fn teardown(&mut self);
}
