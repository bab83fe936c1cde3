use std::collections::{HashSet, VecDeque};

use crate::events::GameEvent;
use crate::units::{DeltaFlags, UnitMap};

use super::commands::ClientMessage;
use super::frame::{DeltaRecord, FullRecord, GameUpdateFrame};
use super::wire::WireWriter;

/// Composes the per-tick game-update frame and paces full updates so every
/// unit is resynchronised at least once per period, whatever the population.
pub struct MessageHandler {
    scratch: Vec<u8>,
    scratch_capacity: usize,
    tick_rate: u32,
    full_update_period: f64,
    debug_enabled: bool,
    pending_full: VecDeque<u16>,
    pending_delta: HashSet<u16>,
    full_rate: usize,
}

impl MessageHandler {
    pub fn new(
        tick_rate: u32,
        full_update_period: f64,
        scratch_capacity: usize,
        debug_enabled: bool,
    ) -> Self {
        Self {
            scratch: Vec::with_capacity(scratch_capacity),
            scratch_capacity,
            tick_rate,
            full_update_period,
            debug_enabled,
            pending_full: VecDeque::new(),
            pending_delta: HashSet::new(),
            full_rate: 0,
        }
    }

    pub fn parse_client_message(text: &str) -> Result<ClientMessage, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Queues a unit whose delta flags became non-empty this tick.
    pub fn mark_delta(&mut self, id: u16) {
        self.pending_delta.insert(id);
    }

    pub fn on_unit_destroyed(&mut self, id: u16) {
        // The full queue is cleaned lazily; dead ids are skipped on draw.
        self.pending_delta.remove(&id);
    }

    fn full_rate_for(&self, population: usize) -> usize {
        if population == 0 {
            return 0;
        }
        let window = self.tick_rate as f64 * self.full_update_period;
        (population as f64 / window).ceil() as usize
    }

    fn refill_pending_full(&mut self, units: &UnitMap, exclude: &[u16]) {
        let mut ids: Vec<u16> = units.keys().copied().collect();
        ids.sort_unstable();
        self.pending_full
            .extend(ids.into_iter().filter(|id| !exclude.contains(id)));
        self.full_rate = self.full_rate_for(units.len());
    }

    /// Draws this tick's share of full updates. When the pending set runs
    /// dry mid-draw it is repopulated from the live registry and the rate
    /// recomputed, adapting to population changes.
    fn draw_full_ids(&mut self, units: &UnitMap) -> Vec<u16> {
        let mut drawn = Vec::new();
        if units.is_empty() {
            return drawn;
        }

        if self.pending_full.is_empty() {
            self.refill_pending_full(units, &[]);
        }

        while drawn.len() < self.full_rate {
            match self.pending_full.pop_front() {
                Some(id) => {
                    if units.contains_key(&id) && !drawn.contains(&id) {
                        drawn.push(id);
                    }
                }
                None => {
                    self.refill_pending_full(units, &drawn);
                    if self.pending_full.is_empty() {
                        break;
                    }
                }
            }
        }
        drawn
    }

    /// Builds this tick's frame into the scratch buffer and returns it, or
    /// `None` when all three sections are empty (frame skipped) or the
    /// scratch capacity is exceeded (frame dropped, state kept for next
    /// tick).
    pub fn compose_frame(
        &mut self,
        time: f64,
        units: &mut UnitMap,
        events: &[GameEvent],
    ) -> Option<&[u8]> {
        let full_ids = self.draw_full_ids(units);

        let mut delta_ids: Vec<u16> = self
            .pending_delta
            .iter()
            .copied()
            .filter(|id| !full_ids.contains(id))
            .filter(|id| {
                units
                    .get(id)
                    .is_some_and(|unit| !unit.delta_flags().is_empty())
            })
            .collect();
        delta_ids.sort_unstable();

        let deltas: Vec<DeltaRecord> = delta_ids
            .iter()
            .map(|id| {
                let mut record = DeltaRecord::from_unit(&units[id]);
                if !self.debug_enabled {
                    record.flags.remove(DeltaFlags::DEBUG_STATE);
                    record.debug_state = None;
                }
                record
            })
            .filter(|record| !record.flags.is_empty())
            .collect();

        if full_ids.is_empty() && deltas.is_empty() && events.is_empty() {
            return None;
        }

        let frame = GameUpdateFrame {
            time,
            fulls: full_ids
                .iter()
                .map(|id| FullRecord::from_unit(&units[id], self.debug_enabled))
                .collect(),
            deltas,
            events: events.to_vec(),
        };

        let mut writer = WireWriter::new(&mut self.scratch, self.scratch_capacity);
        if let Err(err) = frame.write(&mut writer) {
            log::error!("dropping game-update frame: {err}");
            // Nothing was emitted; requeue the drawn fulls so the period
            // guarantee degrades no further than one tick.
            for id in full_ids.into_iter().rev() {
                self.pending_full.push_front(id);
            }
            return None;
        }

        for id in &full_ids {
            if let Some(unit) = units.get_mut(id) {
                unit.clear_delta_flags();
            }
            self.pending_delta.remove(id);
        }
        for id in &delta_ids {
            if let Some(unit) = units.get_mut(id) {
                unit.clear_delta_flags();
            }
        }
        self.pending_delta.clear();

        Some(&self.scratch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::CollisionGrid;
    use crate::objects::tank;
    use crate::units::Unit;
    use glam::DVec2;
    use std::collections::HashMap;
    use std::sync::Arc;

    const LAYOUT: DVec2 = DVec2::new(35_000.0, 13_000.0);

    fn world_with_units(count: u16) -> (CollisionGrid, UnitMap) {
        let mut grid = CollisionGrid::new(LAYOUT.x, LAYOUT.y, 2_000.0);
        let mut units = UnitMap::new();
        let tank = Arc::new(tank());
        for id in 0..count {
            let unit = Unit::new(
                id,
                (id % 2) as u32,
                &tank,
                DVec2::new(500.0 + id as f64 * 200.0, 1_000.0),
                0.0,
                LAYOUT,
                &mut grid,
            );
            units.insert(id, unit);
        }
        (grid, units)
    }

    #[test]
    fn every_unit_gets_a_full_update_each_period() {
        let (_grid, mut units) = world_with_units(60);
        let mut handler = MessageHandler::new(30, 2.0, 262_144, false);

        let mut seen: HashMap<u16, usize> = HashMap::new();
        for _ in 0..60 {
            let data = handler
                .compose_frame(0.0, &mut units, &[])
                .expect("frame with units should not be skipped")
                .to_vec();
            let frame = GameUpdateFrame::parse(&data, false).unwrap();
            for full in frame.fulls {
                *seen.entry(full.id).or_default() += 1;
            }
        }

        for id in 0..60u16 {
            assert_eq!(seen.get(&id), Some(&1), "unit {id}");
        }
    }

    #[test]
    fn full_rate_adapts_to_population() {
        let (_grid, mut units) = world_with_units(120);
        let mut handler = MessageHandler::new(30, 2.0, 262_144, false);

        let data = handler.compose_frame(0.0, &mut units, &[]).unwrap().to_vec();
        let frame = GameUpdateFrame::parse(&data, false).unwrap();
        assert_eq!(frame.fulls.len(), 2);
    }

    #[test]
    fn deltas_carry_only_flagged_fields_and_reset() {
        let (mut grid, mut units) = world_with_units(30);
        let mut handler = MessageHandler::new(30, 2.0, 262_144, false);

        // Consume the first frame so unit 5 is not in its full section.
        handler.compose_frame(0.0, &mut units, &[]).unwrap();

        units.get_mut(&5).unwrap().platform_mut().set_angle(1.0, &mut grid);
        handler.mark_delta(5);

        let data = handler.compose_frame(0.0, &mut units, &[]).unwrap().to_vec();
        let frame = GameUpdateFrame::parse(&data, false).unwrap();
        let delta = frame
            .deltas
            .iter()
            .find(|d| d.id == 5)
            .expect("missing delta for unit 5");
        assert!(delta.platform_angle.is_some());
        assert!(delta.position.is_none());
        assert!(delta.speed.is_none());

        assert!(units[&5].delta_flags().is_empty());
    }

    #[test]
    fn full_update_clears_pending_delta() {
        let (mut grid, mut units) = world_with_units(1);
        let mut handler = MessageHandler::new(30, 2.0, 262_144, false);

        units.get_mut(&0).unwrap().platform_mut().set_angle(1.0, &mut grid);
        handler.mark_delta(0);

        let data = handler.compose_frame(0.0, &mut units, &[]).unwrap().to_vec();
        let frame = GameUpdateFrame::parse(&data, false).unwrap();
        assert_eq!(frame.fulls.len(), 1);
        assert!(frame.deltas.is_empty());
    }

    #[test]
    fn empty_frame_skipped_but_events_still_sent() {
        let mut units = UnitMap::new();
        let mut handler = MessageHandler::new(30, 2.0, 262_144, false);

        assert!(handler.compose_frame(0.0, &mut units, &[]).is_none());

        let events = [GameEvent::UnitDestroyed { id: 1 }];
        let data = handler.compose_frame(0.0, &mut units, &events).unwrap().to_vec();
        let frame = GameUpdateFrame::parse(&data, false).unwrap();
        assert_eq!(frame.events.len(), 1);
    }

    #[test]
    fn oversized_frame_dropped_and_retried() {
        let (_grid, mut units) = world_with_units(4);
        // Too small for even the header plus one full record.
        let mut handler = MessageHandler::new(30, 2.0, 16, false);

        assert!(handler.compose_frame(0.0, &mut units, &[]).is_none());
        // The drawn ids went back to the queue; the handler keeps limping
        // tick after tick instead of wedging.
        assert!(handler.compose_frame(0.0, &mut units, &[]).is_none());
    }
}
