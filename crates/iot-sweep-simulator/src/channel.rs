//! Propagation and PHY timing models used by the built-in wireless engine.

const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Node position on the simulation plane, in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Log-distance path loss: `L(d) = L0 + 10 * n * log10(d / d0)`.
#[derive(Debug, Clone, Copy)]
pub struct LogDistanceLoss {
    pub exponent: f64,
    pub reference_distance_m: f64,
    pub reference_loss_db: f64,
}

impl Default for LogDistanceLoss {
    fn default() -> Self {
        Self {
            exponent: 3.0,
            reference_distance_m: 1.0,
            reference_loss_db: 46.6777,
        }
    }
}

impl LogDistanceLoss {
    pub fn rx_power_dbm(&self, tx_power_dbm: f64, distance_m: f64) -> f64 {
        // Inside the reference distance the loss is flat.
        if distance_m <= self.reference_distance_m {
            return tx_power_dbm - self.reference_loss_db;
        }
        let path_loss = 10.0 * self.exponent * (distance_m / self.reference_distance_m).log10();
        tx_power_dbm - self.reference_loss_db - path_loss
    }
}

/// Constant-speed propagation delay in nanoseconds.
pub fn propagation_delay_ns(distance_m: f64) -> u64 {
    (distance_m / SPEED_OF_LIGHT_M_S * 1e9).round() as u64
}

/// Timing and reception parameters of a fixed-rate 802.11 OFDM link.
#[derive(Debug, Clone)]
pub struct PhyProfile {
    pub data_rate_bps: f64,
    pub preamble_ns: u64,
    pub slot_ns: u64,
    pub sifs_ns: u64,
    pub bandwidth_hz: f64,
    pub noise_figure_db: f64,
    /// Minimum SNR needed to decode a frame at `data_rate_bps`
    pub min_snr_db: f64,
    /// MAC header, LLC/SNAP and FCS
    pub mac_overhead_bytes: u32,
    pub ack_bytes: u32,
    pub cw_min: u32,
    pub cw_max: u32,
    /// Retransmissions attempted before a frame is dropped
    pub retry_limit: u32,
    /// Per-node transmit queue capacity, in packets
    pub queue_limit: usize,
}

impl Default for PhyProfile {
    fn default() -> Self {
        Self {
            data_rate_bps: 6e6,
            preamble_ns: 20_000,
            slot_ns: 9_000,
            sifs_ns: 16_000,
            bandwidth_hz: 20e6,
            noise_figure_db: 7.0,
            min_snr_db: 5.0,
            mac_overhead_bytes: 36,
            ack_bytes: 14,
            cw_min: 15,
            cw_max: 1023,
            retry_limit: 7,
            queue_limit: 100,
        }
    }
}

impl PhyProfile {
    pub fn difs_ns(&self) -> u64 {
        self.sifs_ns + 2 * self.slot_ns
    }

    fn airtime_ns(&self, bytes: u32) -> u64 {
        let payload_ns = (bytes as f64 * 8.0 / self.data_rate_bps * 1e9).ceil() as u64;
        self.preamble_ns.saturating_add(payload_ns)
    }

    /// Airtime of a data frame carrying an IP packet of `ip_bytes`.
    pub fn data_airtime_ns(&self, ip_bytes: u32) -> u64 {
        self.airtime_ns(ip_bytes.saturating_add(self.mac_overhead_bytes))
    }

    /// Channel occupancy of one data frame plus its acknowledgement.
    pub fn exchange_ns(&self, ip_bytes: u32) -> u64 {
        self.data_airtime_ns(ip_bytes)
            .saturating_add(self.sifs_ns)
            .saturating_add(self.airtime_ns(self.ack_bytes))
    }

    /// Thermal noise floor over the channel bandwidth, in dBm.
    pub fn noise_floor_dbm(&self) -> f64 {
        -174.0 + 10.0 * self.bandwidth_hz.log10() + self.noise_figure_db
    }

    pub fn decodable(&self, rx_power_dbm: f64) -> bool {
        rx_power_dbm - self.noise_floor_dbm() >= self.min_snr_db
    }
}
