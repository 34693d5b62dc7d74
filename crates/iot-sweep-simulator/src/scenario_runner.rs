use crate::aggregate::aggregate;
use iot_sweep_abstract::{
    EngineError, NetworkEngine, ScenarioEnvironment, ScenarioParameters, ScenarioResult,
};
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Owns a scenario environment and tears it down when dropped, on every exit path.
struct EnvironmentGuard {
    env: Box<dyn ScenarioEnvironment>,
}

impl Deref for EnvironmentGuard {
    type Target = dyn ScenarioEnvironment;

    fn deref(&self) -> &Self::Target {
        self.env.as_ref()
    }
}

impl DerefMut for EnvironmentGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.env.as_mut()
    }
}

impl Drop for EnvironmentGuard {
    fn drop(&mut self) {
        self.env.teardown();
    }
}

/// Runs one grid point at a time against a [`NetworkEngine`].
pub struct ScenarioRunner {
    engine: Box<dyn NetworkEngine>,
}

impl ScenarioRunner {
    pub fn new(engine: Box<dyn NetworkEngine>) -> Self {
        Self { engine }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Build, run and tear down one isolated scenario, returning its aggregated metrics.
    pub fn run_scenario(
        &mut self,
        params: ScenarioParameters,
    ) -> Result<ScenarioResult, EngineError> {
        params.validate()?;

        let mut env = EnvironmentGuard {
            env: self.engine.build(&params)?,
        };
        env.run_until(params.sim_time_s)?;
        let counters = env.flow_counters();
        drop(env);

        debug!("Collected {} flows", counters.len());
        Ok(aggregate(&counters, params.sim_time_s))
    }
}
