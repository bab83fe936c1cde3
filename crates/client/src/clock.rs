use std::collections::HashMap;

use vanguard::ClientMessage;

/// Render this far behind the estimated server time, on top of measured
/// latency, to absorb network jitter.
pub const FIXED_SIMULATION_DELAY_SEC: f64 = 0.08;

/// Smoothing factor for latency and offset estimates.
const EMA_ALPHA: f64 = 0.125;

/// Ping-based clock synchronisation. The server answers pings with its
/// game time (sub-tick precise); each round trip updates a smoothed
/// latency and a smoothed server-minus-local offset.
#[derive(Debug)]
pub struct ClockSync {
    fixed_delay: f64,
    latency: f64,
    offset: f64,
    initialized: bool,
    outstanding: HashMap<u32, f64>,
    next_ping_id: u32,
}

impl ClockSync {
    pub fn new() -> Self {
        Self::with_delay(FIXED_SIMULATION_DELAY_SEC)
    }

    pub fn with_delay(fixed_delay: f64) -> Self {
        Self {
            fixed_delay,
            latency: 0.0,
            offset: 0.0,
            initialized: false,
            outstanding: HashMap::new(),
            next_ping_id: 0,
        }
    }

    pub fn is_synchronised(&self) -> bool {
        self.initialized
    }

    pub fn latency(&self) -> f64 {
        self.latency
    }

    /// Builds the next ping, remembering the local send time for the
    /// round-trip measurement.
    pub fn make_ping(&mut self, local_time: f64) -> ClientMessage {
        let id = self.next_ping_id;
        self.next_ping_id = self.next_ping_id.wrapping_add(1);
        self.outstanding.insert(id, local_time);
        ClientMessage::Ping { id }
    }

    /// Feeds a pong back in. Unknown ids (stale or duplicated pongs on the
    /// unreliable channel) are ignored.
    pub fn on_pong(&mut self, id: u32, server_time: f64, local_time: f64) {
        let Some(sent_at) = self.outstanding.remove(&id) else {
            return;
        };
        let rtt = (local_time - sent_at).max(0.0);
        let latency_sample = rtt / 2.0;
        // The server stamped the reply roughly one half-trip ago.
        let offset_sample = server_time + latency_sample - local_time;

        if self.initialized {
            self.latency += EMA_ALPHA * (latency_sample - self.latency);
            self.offset += EMA_ALPHA * (offset_sample - self.offset);
        } else {
            self.latency = latency_sample;
            self.offset = offset_sample;
            self.initialized = true;
        }
    }

    pub fn server_time_estimate(&self, local_time: f64) -> f64 {
        local_time + self.offset
    }

    /// The timeline playback position: estimated server time, pulled back
    /// by latency plus the fixed delay.
    pub fn simulation_time(&self, local_time: f64) -> f64 {
        self.server_time_estimate(local_time) - self.latency - self.fixed_delay
    }
}

impl Default for ClockSync {
    fn default() -> Self {
        Self::new()
    }
}
