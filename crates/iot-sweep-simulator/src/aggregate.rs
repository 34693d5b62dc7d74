use iot_sweep_abstract::{FlowCounters, FlowSummary, ScenarioResult};

/// Reduce the flow counters of one run into a [`ScenarioResult`].
///
/// Flows that never transmitted are skipped rather than zero-filled, and the
/// delay is a plain mean of per-flow means. Each metric is summed in sorted
/// order so the outcome does not depend on the order of `counters`.
pub fn aggregate(counters: &[FlowCounters], duration_s: f64) -> ScenarioResult {
    let summaries: Vec<FlowSummary> = counters
        .iter()
        .filter_map(|c| FlowSummary::from_counters(c, duration_s))
        .collect();

    if summaries.is_empty() {
        return ScenarioResult::default();
    }

    let flows = summaries.len();
    let mean = |metric: fn(&FlowSummary) -> f64| {
        let mut values: Vec<f64> = summaries.iter().map(metric).collect();
        values.sort_by(f64::total_cmp);
        values.iter().sum::<f64>() / flows as f64
    };

    ScenarioResult {
        throughput_mbps: mean(|s| s.throughput_mbps),
        delay_s: mean(|s| s.mean_delay_s),
        pdr: mean(|s| s.pdr),
        flows: flows as u32,
    }
}
