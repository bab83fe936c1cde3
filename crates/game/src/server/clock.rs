use std::time::{Duration, Instant};

use crate::math::Kahan;

/// The game clock and tick schedule. Game time accumulates tick deltas
/// through a Kahan sum; the schedule absorbs late timer fires without
/// letting the server lag permanently behind.
#[derive(Debug)]
pub struct TickClock {
    interval: Duration,
    game_time: Kahan,
    last_tick_start: Instant,
    next_scheduled: Instant,
}

impl TickClock {
    pub fn new(tick_rate: u32, now: Instant) -> Self {
        let interval = Duration::from_secs_f64(1.0 / tick_rate as f64);
        Self {
            interval,
            game_time: Kahan::new(),
            last_tick_start: now,
            next_scheduled: now + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts a tick: returns the elapsed seconds since the previous tick
    /// start and records this one.
    pub fn begin_tick(&mut self, now: Instant) -> f64 {
        let dt = now.duration_since(self.last_tick_start).as_secs_f64();
        self.last_tick_start = now;
        dt
    }

    /// Adds a tick's delta to game time. Called once, at the end of the
    /// tick, so mid-tick readers all see the same timestamp.
    pub fn advance(&mut self, dt: f64) {
        self.game_time.add(dt);
    }

    pub fn game_time(&self) -> f64 {
        self.game_time.get()
    }

    /// Sub-tick seconds since the current tick started; added to ping
    /// replies so clock sync keeps sub-tick precision.
    pub fn time_since_last_tick(&self, now: Instant) -> f64 {
        now.duration_since(self.last_tick_start).as_secs_f64()
    }

    /// Returns how long to wait before the next tick. A late fire runs
    /// immediately and resets the schedule from `now`; an on-time fire keeps
    /// the fixed cadence.
    pub fn next_tick_delay(&mut self, now: Instant) -> Duration {
        if self.next_scheduled <= now {
            self.next_scheduled = now + self.interval;
            Duration::ZERO
        } else {
            let delay = self.next_scheduled - now;
            self.next_scheduled += self.interval;
            delay
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dt_measured_between_tick_starts() {
        let start = Instant::now();
        let mut clock = TickClock::new(30, start);

        let dt = clock.begin_tick(start + Duration::from_millis(33));
        assert!((dt - 0.033).abs() < 1e-9);

        let dt = clock.begin_tick(start + Duration::from_millis(70));
        assert!((dt - 0.037).abs() < 1e-9);
    }

    #[test]
    fn on_time_fires_keep_cadence() {
        let start = Instant::now();
        // 50 Hz gives an interval with a whole number of nanoseconds, so the
        // schedule arithmetic below is exact.
        let mut clock = TickClock::new(50, start);
        let interval = clock.interval();

        // Fire slightly early: the delay is the remainder and the schedule
        // slides one interval forward.
        let delay = clock.next_tick_delay(start + interval / 2);
        assert_eq!(delay, interval / 2);

        let delay = clock.next_tick_delay(start + interval + interval / 4);
        assert_eq!(delay, interval * 3 / 4);
    }

    #[test]
    fn late_fire_runs_immediately_and_resets() {
        let start = Instant::now();
        let mut clock = TickClock::new(50, start);
        let interval = clock.interval();

        let late = start + interval * 3;
        assert_eq!(clock.next_tick_delay(late), Duration::ZERO);
        // Schedule restarted from the late fire, not from the backlog.
        let delay = clock.next_tick_delay(late + interval / 2);
        assert_eq!(delay, interval / 2);
    }

    #[test]
    fn game_time_accumulates_precisely() {
        let start = Instant::now();
        let mut clock = TickClock::new(30, start);

        let dt = 1.0 / 30.0;
        for _ in 0..90_000 {
            clock.advance(dt);
        }
        assert!((clock.game_time() - 3_000.0).abs() < 1e-8);
    }
}
