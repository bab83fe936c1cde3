use std::collections::{HashMap, HashSet};

use glam::DVec2;

use vanguard::math::u16_to_angle;
use vanguard::{DeltaRecord, FullRecord, GameEvent, GameUpdateFrame, ServerMessage, WireError};

use crate::timeline::{InterpolatedTimeline, Interpolation, SteppedTimeline};

/// Decodes a JSON control message from the server.
pub fn parse_control(text: &str) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_str(text)
}

/// The client-side mirror of one unit, rebuilt from full and delta records.
/// Positions step and are dead-reckoned in between; angles and speed are
/// interpolated; acceleration step-holds for the dead reckoning.
#[derive(Debug)]
pub struct ClientUnit {
    pub id: u16,
    pub player: u8,
    pub x: f64,
    pub y: f64,
    pub debug_state: u8,
    position: SteppedTimeline<(f64, f64)>,
    speed: InterpolatedTimeline,
    acceleration: InterpolatedTimeline,
    platform_angle: InterpolatedTimeline,
    turret_offset_angle: InterpolatedTimeline,
}

impl ClientUnit {
    fn from_full(time: f64, record: &FullRecord) -> Self {
        let mut unit = Self {
            id: record.id,
            player: record.player,
            x: record.x as f64,
            y: record.y as f64,
            debug_state: record.debug_state.unwrap_or(0),
            position: SteppedTimeline::new(),
            speed: InterpolatedTimeline::new(Interpolation::Linear),
            acceleration: InterpolatedTimeline::new(Interpolation::None),
            platform_angle: InterpolatedTimeline::new(Interpolation::Angular),
            turret_offset_angle: InterpolatedTimeline::new(Interpolation::Angular),
        };
        unit.apply_full(time, record);
        unit
    }

    fn apply_full(&mut self, time: f64, record: &FullRecord) {
        self.position
            .add(time, (record.x as f64, record.y as f64));
        self.speed.add(time, record.speed as f64);
        self.acceleration.add(time, record.acceleration as f64);
        self.platform_angle
            .add(time, u16_to_angle(record.platform_angle));
        self.turret_offset_angle
            .add(time, u16_to_angle(record.turret_offset_angle));
        if let Some(debug) = record.debug_state {
            self.debug_state = debug;
        }
    }

    fn apply_delta(&mut self, time: f64, record: &DeltaRecord) {
        if let Some((x, y)) = record.position {
            self.position.add(time, (x as f64, y as f64));
        }
        if let Some(speed) = record.speed {
            self.speed.add(time, speed as f64);
        }
        if let Some(acceleration) = record.acceleration {
            self.acceleration.add(time, acceleration as f64);
        }
        if let Some(angle) = record.platform_angle {
            self.platform_angle.add(time, u16_to_angle(angle));
        }
        if let Some(angle) = record.turret_offset_angle {
            self.turret_offset_angle.add(time, u16_to_angle(angle));
        }
        if let Some(debug) = record.debug_state {
            self.debug_state = debug;
        }
    }

    /// Advances the rendered position: dead-reckon along the interpolated
    /// heading at the interpolated speed, then snap to any position step
    /// that has come due.
    pub fn update(&mut self, sim_time: f64, dt: f64) {
        let speed = self.speed.get(sim_time).unwrap_or(0.0);
        let accel = self.acceleration.get(sim_time).unwrap_or(0.0);
        let angle = self.platform_angle.get(sim_time).unwrap_or(0.0);
        let travelled = speed * dt + 0.5 * accel * dt * dt;
        let (sin_a, cos_a) = angle.sin_cos();
        self.x += cos_a * travelled;
        self.y += sin_a * travelled;

        while let Some((_, (x, y))) = self.position.pop_before(sim_time) {
            self.x = x;
            self.y = y;
        }
    }

    pub fn position(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    pub fn speed_at(&mut self, sim_time: f64) -> f64 {
        self.speed.get(sim_time).unwrap_or(0.0)
    }

    pub fn platform_angle_at(&mut self, sim_time: f64) -> f64 {
        self.platform_angle.get(sim_time).unwrap_or(0.0)
    }

    /// Rendered turret angle: platform heading plus the turret offset.
    pub fn turret_angle_at(&mut self, sim_time: f64) -> f64 {
        let platform = self.platform_angle.get(sim_time).unwrap_or(0.0);
        let offset = self.turret_offset_angle.get(sim_time).unwrap_or(0.0);
        (platform + offset).rem_euclid(std::f64::consts::TAU)
    }
}

/// The received world: unit mirrors plus the event timeline. Frames arrive
/// on the reliable-unordered channel, so duplicates and reordering are
/// expected and handled by the per-frame timestamp.
#[derive(Debug)]
pub struct ClientWorld {
    debug_enabled: bool,
    units: HashMap<u16, ClientUnit>,
    seen_frame_times: HashSet<u64>,
    events: SteppedTimeline<GameEvent>,
}

impl ClientWorld {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            units: HashMap::new(),
            seen_frame_times: HashSet::new(),
            events: SteppedTimeline::new(),
        }
    }

    pub fn unit(&self, id: u16) -> Option<&ClientUnit> {
        self.units.get(&id)
    }

    pub fn unit_mut(&mut self, id: u16) -> Option<&mut ClientUnit> {
        self.units.get_mut(&id)
    }

    pub fn units(&self) -> impl Iterator<Item = &ClientUnit> {
        self.units.values()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Decodes one binary frame into the timelines. Returns the frame's
    /// server timestamp, or `None` for a duplicate.
    pub fn apply_frame(&mut self, data: &[u8]) -> Result<Option<f64>, WireError> {
        let frame = GameUpdateFrame::parse(data, self.debug_enabled)?;
        if !self.seen_frame_times.insert(frame.time.to_bits()) {
            return Ok(None);
        }

        for record in &frame.fulls {
            match self.units.get_mut(&record.id) {
                Some(unit) => unit.apply_full(frame.time, record),
                None => {
                    self.units
                        .insert(record.id, ClientUnit::from_full(frame.time, record));
                }
            }
        }

        for record in &frame.deltas {
            // A delta for a unit we have never seen a full update for is
            // unusable; the periodic full resync will introduce it.
            match self.units.get_mut(&record.id) {
                Some(unit) => unit.apply_delta(frame.time, record),
                None => log::debug!("delta for unknown unit {}", record.id),
            }
        }

        for event in frame.events {
            self.events.add(frame.time, event);
        }

        Ok(Some(frame.time))
    }

    /// Steps the world to `sim_time`: applies every event that has come due
    /// (late events apply immediately on the next update) and advances the
    /// unit mirrors. Returns the applied events for presentation.
    pub fn update(&mut self, sim_time: f64, dt: f64) -> Vec<GameEvent> {
        let mut fired = Vec::new();
        while let Some((_, event)) = self.events.pop_before(sim_time) {
            self.apply_event(&event);
            fired.push(event);
        }

        for unit in self.units.values_mut() {
            unit.update(sim_time, dt);
        }

        fired
    }

    fn apply_event(&mut self, event: &GameEvent) {
        if let GameEvent::UnitDestroyed { id } = event {
            self.units.remove(id);
        }
    }
}
