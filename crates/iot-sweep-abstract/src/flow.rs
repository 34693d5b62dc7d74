use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Five-tuple style classifier key for a unidirectional UDP flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowKey {
    pub source: Ipv4Addr,
    pub source_port: u16,
    pub destination: Ipv4Addr,
    pub destination_port: u16,
}

impl FlowKey {
    pub fn new(
        source: Ipv4Addr,
        source_port: u16,
        destination: Ipv4Addr,
        destination_port: u16,
    ) -> Self {
        Self {
            source,
            source_port,
            destination,
            destination_port,
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.source, self.source_port, self.destination, self.destination_port
        )
    }
}

/// Raw counters recorded by an engine for one flow over one scenario run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowCounters {
    pub key: FlowKey,
    /// Packets handed to the network by the sending application
    pub tx_packets: u64,
    /// Packets that reached the receiving node
    pub rx_packets: u64,
    /// IP-level bytes sent (payload plus IP/UDP headers)
    pub tx_bytes: u64,
    /// IP-level bytes received
    pub rx_bytes: u64,
    /// Sum of end-to-end delays of all received packets, in seconds
    pub delay_sum_s: f64,
    /// Packets sent but never received by the end of the run
    pub lost_packets: u64,
}

impl FlowCounters {
    pub fn new(key: FlowKey) -> Self {
        Self {
            key,
            tx_packets: 0,
            rx_packets: 0,
            tx_bytes: 0,
            rx_bytes: 0,
            delay_sum_s: 0.0,
            lost_packets: 0,
        }
    }

    /// A flow counts towards scenario averages only once it has sent something.
    pub fn is_active(&self) -> bool {
        self.tx_packets > 0
    }
}

/// Per-flow metrics derived from [`FlowCounters`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct FlowSummary {
    pub throughput_mbps: f64,
    pub mean_delay_s: f64,
    /// Packet delivery ratio, received / transmitted
    pub pdr: f64,
}

impl FlowSummary {
    /// Returns `None` for flows that never transmitted.
    pub fn from_counters(counters: &FlowCounters, duration_s: f64) -> Option<Self> {
        if !counters.is_active() {
            return None;
        }
        let throughput_mbps = counters.rx_bytes as f64 * 8.0 / duration_s / 1e6;
        let mean_delay_s = if counters.rx_packets > 0 {
            counters.delay_sum_s / counters.rx_packets as f64
        } else {
            0.0
        };
        let pdr = counters.rx_packets as f64 / counters.tx_packets as f64;
        Some(Self {
            throughput_mbps,
            mean_delay_s,
            pdr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> FlowKey {
        FlowKey::new(Ipv4Addr::new(10, 1, 1, 1), 49153, Ipv4Addr::new(10, 1, 1, 2), 4000)
    }

    #[test]
    fn idle_flow_has_no_summary() {
        let counters = FlowCounters::new(key());
        assert!(FlowSummary::from_counters(&counters, 10.0).is_none());
    }

    #[test]
    fn flow_with_no_deliveries_reports_zero_delay() {
        let counters = FlowCounters {
            tx_packets: 4,
            tx_bytes: 512,
            lost_packets: 4,
            ..FlowCounters::new(key())
        };
        let summary = FlowSummary::from_counters(&counters, 10.0).unwrap();
        assert_eq!(summary.mean_delay_s, 0.0);
        assert_eq!(summary.pdr, 0.0);
        assert_eq!(summary.throughput_mbps, 0.0);
    }

    #[test]
    fn key_display() {
        assert_eq!(key().to_string(), "10.1.1.1:49153 -> 10.1.1.2:4000");
    }
}
