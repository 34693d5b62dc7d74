use iot_sweep_abstract::{FlowCounters, FlowKey};
use std::collections::BTreeMap;

/// Per-flow packet accounting for one scenario.
///
/// Flows are created on their first transmitted packet and kept in key order,
/// so snapshots are deterministic.
#[derive(Debug, Default)]
pub struct FlowMonitor {
    flows: BTreeMap<FlowKey, FlowCounters>,
}

impl FlowMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tx(&mut self, key: FlowKey, ip_bytes: u32) {
        let flow = self
            .flows
            .entry(key)
            .or_insert_with(|| FlowCounters::new(key));
        flow.tx_packets += 1;
        flow.tx_bytes += u64::from(ip_bytes);
    }

    pub fn record_rx(&mut self, key: FlowKey, ip_bytes: u32, delay_ns: u64) {
        let flow = self
            .flows
            .entry(key)
            .or_insert_with(|| FlowCounters::new(key));
        flow.rx_packets += 1;
        flow.rx_bytes += u64::from(ip_bytes);
        flow.delay_sum_s += delay_ns as f64 * 1e-9;
    }

    /// Everything sent but not received so far is counted as lost.
    pub fn check_for_lost_packets(&mut self) {
        for flow in self.flows.values_mut() {
            flow.lost_packets = flow.tx_packets.saturating_sub(flow.rx_packets);
        }
    }

    pub fn snapshot(&self) -> Vec<FlowCounters> {
        self.flows.values().cloned().collect()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn clear(&mut self) {
        self.flows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn key(host: u8) -> FlowKey {
        FlowKey::new(Ipv4Addr::new(10, 1, 1, host), 49153, Ipv4Addr::new(10, 1, 1, 9), 4000)
    }

    #[test]
    fn counts_per_flow() {
        let mut monitor = FlowMonitor::new();
        monitor.record_tx(key(2), 128);
        monitor.record_tx(key(1), 128);
        monitor.record_tx(key(1), 128);
        monitor.record_rx(key(1), 128, 2_000_000);
        monitor.check_for_lost_packets();

        let flows = monitor.snapshot();
        assert_eq!(flows.len(), 2);
        assert_eq!(flows[0].key, key(1));
        assert_eq!(flows[0].tx_packets, 2);
        assert_eq!(flows[0].tx_bytes, 256);
        assert_eq!(flows[0].rx_bytes, 128);
        assert_eq!(flows[0].lost_packets, 1);
        assert!((flows[0].delay_sum_s - 0.002).abs() < 1e-12);
        assert_eq!(flows[1].rx_packets, 0);
        assert_eq!(flows[1].lost_packets, 1);
    }

    #[test]
    fn clear_forgets_flows() {
        let mut monitor = FlowMonitor::new();
        monitor.record_tx(key(1), 100);
        monitor.clear();
        assert!(monitor.is_empty());
    }
}
