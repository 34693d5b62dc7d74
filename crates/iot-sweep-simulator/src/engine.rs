use crate::channel::{LogDistanceLoss, PhyProfile, Position, propagation_delay_ns};
use crate::monitor::FlowMonitor;
use iot_sweep_abstract::{
    EngineError, FlowCounters, FlowKey, NetworkEngine, ScenarioEnvironment, ScenarioParameters,
};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Simulated time in nanoseconds.
pub type SimTime = u64;

pub const SINK_PORT: u16 = 4000;
pub const CLIENT_PORT: u16 = 49153;
pub const SUBNET: &str = "10.1.1.0/24";
/// Usable host addresses in a /24.
const SUBNET_HOSTS: u32 = 254;
/// IPv4 (20) plus UDP (8) header bytes
const IP_UDP_HEADER_BYTES: u32 = 28;
/// Largest datagram the IPv4 total-length field can describe
const MAX_IP_PACKET_BYTES: u32 = 65_535;
const AREA_SIDE_M: f64 = 100.0;
const CLIENT_START_S: f64 = 1.0;
/// Events between two wall-clock deadline checks
const DEADLINE_CHECK_EVERY: u64 = 1024;

/// Saturates at `SimTime::MAX` for times beyond the clock's range.
pub fn seconds_to_sim_time(seconds: f64) -> SimTime {
    (seconds * 1e9).round() as SimTime
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventType {
    /// A sensor's UDP client generates its next packet
    AppSend { node: usize },
    /// Backoff expired, the sensor tries to seize the channel
    AccessAttempt { node: usize },
    /// The current channel exchange (data + ACK) is over
    TxEnd,
}

#[derive(Debug)]
struct Event {
    time: SimTime,
    event_type: EventType,
    id: u64, // Unique ID to differentiate events at same time
}

// Custom Ord for Min-Heap (smallest time pops first)
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

#[derive(Debug)]
struct QueuedPacket {
    created_at: SimTime,
}

#[derive(Debug)]
struct SensorNode {
    flow: FlowKey,
    /// Whether the sink can decode this sensor's frames at all
    reaches_sink: bool,
    propagation_ns: SimTime,
    queue: VecDeque<QueuedPacket>,
    cw: u32,
    retries: u32,
    contending: bool,
}

/// Shared channel state. Every sensor senses every other one.
#[derive(Debug, Default)]
struct Medium {
    busy_until: SimTime,
    started_at: SimTime,
    /// Non-empty while an exchange is in flight or its `TxEnd` is pending
    transmitters: Vec<usize>,
}

/// Builds [`WirelessScenario`]s: a star of UDP sensors around a single sink
/// sharing one CSMA/CA channel.
#[derive(Debug, Clone)]
pub struct WirelessEngine {
    seed: u64,
    phy: PhyProfile,
    loss: LogDistanceLoss,
    wall_clock_limit: Option<Duration>,
}

impl WirelessEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            phy: PhyProfile::default(),
            loss: LogDistanceLoss::default(),
            wall_clock_limit: None,
        }
    }

    /// Abort any scenario that takes longer than `limit` of real time.
    pub fn with_wall_clock_limit(mut self, limit: Duration) -> Self {
        self.wall_clock_limit = Some(limit);
        self
    }
}

impl NetworkEngine for WirelessEngine {
    fn name(&self) -> &str {
        "wireless-csma"
    }

    fn build(
        &mut self,
        params: &ScenarioParameters,
    ) -> Result<Box<dyn ScenarioEnvironment>, EngineError> {
        params.validate()?;
        let scenario = WirelessScenario::new(
            *params,
            self.seed,
            self.phy.clone(),
            self.loss,
            self.wall_clock_limit,
        )?;
        Ok(Box::new(scenario))
    }
}

/// Sensors get `.1..=.n`, the sink the next free host.
fn assign_addresses(nodes: u32) -> Result<(Vec<Ipv4Addr>, Ipv4Addr), EngineError> {
    let requested = nodes + 1;
    if requested > SUBNET_HOSTS {
        return Err(EngineError::AddressExhausted {
            subnet: SUBNET.to_string(),
            requested,
            available: SUBNET_HOSTS,
        });
    }
    let host = |i: u32| Ipv4Addr::new(10, 1, 1, i as u8);
    let sensors = (1..=nodes).map(host).collect();
    Ok((sensors, host(nodes + 1)))
}

/// One isolated run: its own clock, event queue, RNG stream, topology and flow monitor.
pub struct WirelessScenario {
    params: ScenarioParameters,
    phy: PhyProfile,
    time: SimTime,
    event_queue: BinaryHeap<Event>,
    event_id_counter: u64,
    rng: StdRng,
    sensors: Vec<SensorNode>,
    medium: Medium,
    monitor: FlowMonitor,
    /// IP-level size of every packet of this scenario
    ip_bytes: u32,
    stop_time: SimTime,
    interval: SimTime,
    wall_clock_limit: Option<Duration>,
    torn_down: bool,
}

impl WirelessScenario {
    pub fn new(
        params: ScenarioParameters,
        seed: u64,
        phy: PhyProfile,
        loss: LogDistanceLoss,
        wall_clock_limit: Option<Duration>,
    ) -> Result<Self, EngineError> {
        let ip_bytes = params
            .packet_size
            .checked_add(IP_UDP_HEADER_BYTES)
            .filter(|bytes| *bytes <= MAX_IP_PACKET_BYTES)
            .ok_or_else(|| {
                EngineError::Backend(format!(
                    "packet size {} B does not fit in an IPv4 datagram (max {} B payload)",
                    params.packet_size,
                    MAX_IP_PACKET_BYTES - IP_UDP_HEADER_BYTES
                ))
            })?;
        let interval = seconds_to_sim_time(params.packet_interval_s);
        if interval == 0 {
            return Err(EngineError::Backend(format!(
                "packet interval {} s is below the 1 ns clock resolution",
                params.packet_interval_s
            )));
        }
        let (sensor_addresses, sink_address) = assign_addresses(params.nodes)?;
        let mut rng = StdRng::seed_from_u64(seed);

        let place = |rng: &mut StdRng| {
            Position::new(
                rng.random_range(0.0..=AREA_SIDE_M),
                rng.random_range(0.0..=AREA_SIDE_M),
            )
        };
        let sensor_positions: Vec<Position> =
            sensor_addresses.iter().map(|_| place(&mut rng)).collect();
        let sink_position = place(&mut rng);

        let sensors: Vec<SensorNode> = sensor_addresses
            .into_iter()
            .zip(sensor_positions)
            .map(|(address, position)| {
                let distance = position.distance_to(&sink_position);
                let rx_power = loss.rx_power_dbm(params.tx_power_dbm, distance);
                SensorNode {
                    flow: FlowKey::new(address, CLIENT_PORT, sink_address, SINK_PORT),
                    reaches_sink: phy.decodable(rx_power),
                    propagation_ns: propagation_delay_ns(distance),
                    queue: VecDeque::new(),
                    cw: phy.cw_min,
                    retries: 0,
                    contending: false,
                }
            })
            .collect();

        info!(
            "Built scenario: {} sensors, sink at {}, {} of them within range at {} dBm",
            sensors.len(),
            sink_address,
            sensors.iter().filter(|s| s.reaches_sink).count(),
            params.tx_power_dbm
        );

        let mut scenario = Self {
            ip_bytes,
            stop_time: seconds_to_sim_time(params.sim_time_s),
            interval,
            params,
            phy,
            time: 0,
            event_queue: BinaryHeap::new(),
            event_id_counter: 0,
            rng,
            sensors,
            medium: Medium::default(),
            monitor: FlowMonitor::new(),
            wall_clock_limit,
            torn_down: false,
        };

        let start = seconds_to_sim_time(CLIENT_START_S);
        for node in 0..scenario.sensors.len() {
            scenario.push_event(start, EventType::AppSend { node });
        }
        Ok(scenario)
    }

    #[cfg(test)]
    fn current_time(&self) -> SimTime {
        self.time
    }

    #[cfg(test)]
    fn remaining_events(&self) -> usize {
        self.event_queue.len()
    }

    fn push_event(&mut self, time: SimTime, event_type: EventType) {
        self.event_queue.push(Event {
            time,
            event_type,
            id: self.event_id_counter,
        });
        self.event_id_counter += 1;
    }

    fn backoff_ns(&mut self, cw: u32) -> SimTime {
        let slots = self.rng.random_range(0..=cw);
        u64::from(slots) * self.phy.slot_ns
    }

    fn start_contention(&mut self, node: usize) {
        let cw = self.sensors[node].cw;
        let backoff = self.backoff_ns(cw);
        let at = self
            .time
            .max(self.medium.busy_until)
            .saturating_add(self.phy.difs_ns())
            .saturating_add(backoff);
        self.sensors[node].contending = true;
        self.push_event(at, EventType::AccessAttempt { node });
    }

    /// Process the next event. Returns false once the horizon or an empty queue is reached.
    fn step(&mut self, horizon: SimTime) -> bool {
        match self.event_queue.peek() {
            Some(e) if e.time < horizon => {}
            _ => return false,
        }
        let Some(event) = self.event_queue.pop() else {
            return false;
        };
        self.time = event.time;

        match event.event_type {
            EventType::AppSend { node } => self.on_app_send(node),
            EventType::AccessAttempt { node } => self.on_access_attempt(node),
            EventType::TxEnd => self.on_tx_end(),
        }
        true
    }

    fn on_app_send(&mut self, node: usize) {
        if self.time >= self.stop_time {
            return;
        }
        let flow = self.sensors[node].flow;
        self.monitor.record_tx(flow, self.ip_bytes);

        let sensor = &mut self.sensors[node];
        if sensor.queue.len() >= self.phy.queue_limit {
            debug!("Queue full at {}, dropping packet", flow.source);
        } else {
            sensor.queue.push_back(QueuedPacket {
                created_at: self.time,
            });
        }

        let next = self.time.saturating_add(self.interval);
        if next < self.stop_time {
            self.push_event(next, EventType::AppSend { node });
        }

        let sensor = &self.sensors[node];
        if !sensor.contending && !sensor.queue.is_empty() {
            self.start_contention(node);
        }
    }

    fn on_access_attempt(&mut self, node: usize) {
        let exchange = self.phy.exchange_ns(self.ip_bytes);

        if !self.medium.transmitters.is_empty() {
            if self.medium.started_at == self.time {
                // Same slot as the current transmitter: both frames collide.
                self.medium.transmitters.push(node);
                let end = self.time.saturating_add(exchange);
                self.medium.busy_until = self.medium.busy_until.max(end);
            } else {
                let backoff = self.backoff_ns(self.sensors[node].cw);
                let at = self
                    .medium
                    .busy_until
                    .saturating_add(self.phy.difs_ns())
                    .saturating_add(backoff);
                self.push_event(at, EventType::AccessAttempt { node });
            }
            return;
        }

        self.medium.started_at = self.time;
        self.medium.busy_until = self.time.saturating_add(exchange);
        self.medium.transmitters.push(node);
        let end = self.medium.busy_until;
        self.push_event(end, EventType::TxEnd);
    }

    fn on_tx_end(&mut self) {
        if self.time < self.medium.busy_until {
            let end = self.medium.busy_until;
            self.push_event(end, EventType::TxEnd);
            return;
        }

        let transmitters = std::mem::take(&mut self.medium.transmitters);
        let collided = transmitters.len() > 1;
        if collided {
            debug!("Collision of {} frames at {} ns", transmitters.len(), self.time);
        }
        let airtime = self.phy.data_airtime_ns(self.ip_bytes);

        for node in transmitters {
            let sensor = &mut self.sensors[node];
            sensor.contending = false;

            if !collided && sensor.reaches_sink {
                if let Some(packet) = sensor.queue.pop_front() {
                    let arrival = self
                        .medium
                        .started_at
                        .saturating_add(airtime)
                        .saturating_add(sensor.propagation_ns);
                    let delay = arrival - packet.created_at;
                    self.monitor.record_rx(sensor.flow, self.ip_bytes, delay);
                }
                sensor.cw = self.phy.cw_min;
                sensor.retries = 0;
            } else {
                sensor.retries += 1;
                if sensor.retries > self.phy.retry_limit {
                    debug!("Retry limit reached at {}, dropping frame", sensor.flow.source);
                    sensor.queue.pop_front();
                    sensor.cw = self.phy.cw_min;
                    sensor.retries = 0;
                } else {
                    sensor.cw = (sensor.cw * 2 + 1).min(self.phy.cw_max);
                }
            }

            if !self.sensors[node].queue.is_empty() {
                self.start_contention(node);
            }
        }
    }
}

impl ScenarioEnvironment for WirelessScenario {
    fn run_until(&mut self, horizon_s: f64) -> Result<(), EngineError> {
        if self.torn_down {
            return Err(EngineError::TornDown);
        }
        let horizon = seconds_to_sim_time(horizon_s);
        let started = Instant::now();
        let mut processed: u64 = 0;

        while self.step(horizon) {
            processed += 1;
            if let Some(limit) = self.wall_clock_limit
                && processed % DEADLINE_CHECK_EVERY == 0
                && started.elapsed() > limit
            {
                return Err(EngineError::DeadlineExceeded(limit));
            }
        }
        self.time = self.time.max(horizon);
        debug!(
            "Reached horizon {} ns after {} events ({} pending)",
            horizon,
            processed,
            self.event_queue.len()
        );
        Ok(())
    }

    fn flow_counters(&mut self) -> Vec<FlowCounters> {
        self.monitor.check_for_lost_packets();
        self.monitor.snapshot()
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.event_queue.clear();
        self.sensors.clear();
        self.medium = Medium::default();
        self.monitor.clear();
        self.torn_down = true;
        debug!(
            "Torn down scenario TxPower={} dBm, Interval={} s",
            self.params.tx_power_dbm, self.params.packet_interval_s
        );
    }
}
