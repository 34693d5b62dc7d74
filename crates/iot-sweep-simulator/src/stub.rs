//! Deterministic engine used to test the runner and sweep driver in isolation.

use iot_sweep_abstract::{
    EngineError, FlowCounters, FlowKey, NetworkEngine, ScenarioEnvironment, ScenarioParameters,
};
use std::cell::Cell;
use std::net::Ipv4Addr;
use std::rc::Rc;

type CounterFn = dyn Fn(&ScenarioParameters) -> Result<Vec<FlowCounters>, EngineError>;

/// Shared view of how many environments a [`StubEngine`] built and released.
#[derive(Clone, Default)]
pub struct StubStats {
    built: Rc<Cell<usize>>,
    torn_down: Rc<Cell<usize>>,
}

impl StubStats {
    pub fn built(&self) -> usize {
        self.built.get()
    }

    pub fn torn_down(&self) -> usize {
        self.torn_down.get()
    }

    pub fn live(&self) -> usize {
        self.built() - self.torn_down()
    }
}

pub struct StubEngine {
    counters: Box<CounterFn>,
    fail_run: bool,
    stats: StubStats,
}

impl StubEngine {
    /// `counters` decides what each scenario reports; an `Err` fails the build.
    pub fn new<F>(counters: F) -> Self
    where
        F: Fn(&ScenarioParameters) -> Result<Vec<FlowCounters>, EngineError> + 'static,
    {
        Self {
            counters: Box::new(counters),
            fail_run: false,
            stats: StubStats::default(),
        }
    }

    /// Every environment fails in `run_until` after being built.
    pub fn failing_run(mut self) -> Self {
        self.fail_run = true;
        self
    }

    pub fn stats(&self) -> StubStats {
        self.stats.clone()
    }
}

impl NetworkEngine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    fn build(
        &mut self,
        params: &ScenarioParameters,
    ) -> Result<Box<dyn ScenarioEnvironment>, EngineError> {
        let counters = (self.counters)(params)?;
        self.stats.built.set(self.stats.built() + 1);
        Ok(Box::new(StubEnvironment {
            counters,
            fail_run: self.fail_run,
            stats: self.stats.clone(),
            torn_down: false,
        }))
    }
}

struct StubEnvironment {
    counters: Vec<FlowCounters>,
    fail_run: bool,
    stats: StubStats,
    torn_down: bool,
}

impl ScenarioEnvironment for StubEnvironment {
    fn run_until(&mut self, _horizon_s: f64) -> Result<(), EngineError> {
        if self.torn_down {
            return Err(EngineError::TornDown);
        }
        if self.fail_run {
            return Err(EngineError::Backend("stub run failure".into()));
        }
        Ok(())
    }

    fn flow_counters(&mut self) -> Vec<FlowCounters> {
        self.counters.clone()
    }

    fn teardown(&mut self) {
        if !self.torn_down {
            self.torn_down = true;
            self.counters.clear();
            self.stats.torn_down.set(self.stats.torn_down() + 1);
        }
    }
}

pub fn counters_with_rx(
    host: u8,
    tx: u64,
    rx: u64,
    rx_bytes: u64,
    delay_sum_s: f64,
) -> FlowCounters {
    FlowCounters {
        tx_packets: tx,
        rx_packets: rx,
        rx_bytes,
        delay_sum_s,
        lost_packets: tx.saturating_sub(rx),
        ..FlowCounters::new(FlowKey::new(
            Ipv4Addr::new(10, 1, 1, host),
            49153,
            Ipv4Addr::new(10, 1, 1, 254),
            4000,
        ))
    }
}
