mod clock;

pub use clock::TickClock;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use glam::DVec2;

use crate::collision::CollisionGrid;
use crate::config::GameConfig;
use crate::events::{EventBuffer, GameEvent};
use crate::math::angle_to_u16;
use crate::net::{
    quantize_u16, Channel, ClientMessage, MessageHandler, MoveUnitsEntry, PlayerId, ServerMessage,
    Transport,
};
use crate::objects::{self, ObjectError, ObjectRegistry, UnitType};
use crate::path::{PathOracle, PathRequestId};
use crate::projectile::Projectile;
use crate::units::{MoveContext, TurretFire, Unit, UnitMap};

/// Distance between initial roster rows, in pixels.
const ROSTER_SPACING: f64 = 400.0;
/// Initial roster distance from the layout edge.
const ROSTER_MARGIN: f64 = 2_000.0;

/// The authoritative match simulation: owns the unit and projectile
/// registries, drives them on a fixed tick, and streams frames through the
/// transport. Hosts call [`tick`](Self::tick) and sleep for
/// [`next_tick_delay`](Self::next_tick_delay) in between.
pub struct GameServer<T: Transport> {
    config: GameConfig,
    transport: T,
    oracle: Box<dyn PathOracle>,
    objects: ObjectRegistry,
    units: UnitMap,
    projectiles: HashMap<u16, Projectile>,
    grid: CollisionGrid,
    handler: MessageHandler,
    events: EventBuffer,
    clock: TickClock,
    next_unit_id: u16,
    next_projectile_id: u16,
    pending_paths: HashMap<PathRequestId, u16>,
    game_over: Option<i32>,
    running: bool,
    ticks: u64,
    last_stats_time: f64,
}

impl<T: Transport> GameServer<T> {
    pub fn new(
        config: GameConfig,
        transport: T,
        oracle: Box<dyn PathOracle>,
        now: Instant,
    ) -> Result<Self, ObjectError> {
        let mut registry = ObjectRegistry::new();
        let tank = registry.register(objects::tank())?;

        let mut server = Self {
            grid: CollisionGrid::new(
                config.layout_size.x,
                config.layout_size.y,
                config.collision_cell_size,
            ),
            handler: MessageHandler::new(
                config.tick_rate,
                config.full_update_period_sec,
                config.scratch_buffer_bytes,
                config.debug_state_enabled,
            ),
            clock: TickClock::new(config.tick_rate, now),
            transport,
            oracle,
            objects: registry,
            units: UnitMap::new(),
            projectiles: HashMap::new(),
            events: EventBuffer::new(),
            next_unit_id: 0,
            next_projectile_id: 0,
            pending_paths: HashMap::new(),
            game_over: None,
            running: true,
            ticks: 0,
            last_stats_time: 0.0,
            config,
        };

        server.spawn_initial_roster(&tank);
        let layout = server.config.layout_size;
        server.broadcast_control(&ServerMessage::CreateInitialState {
            layout_size: [layout.x, layout.y],
        });

        Ok(server)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    pub fn units(&self) -> &UnitMap {
        &self.units
    }

    pub fn unit(&self, id: u16) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn projectiles(&self) -> &HashMap<u16, Projectile> {
        &self.projectiles
    }

    pub fn game_time(&self) -> f64 {
        self.clock.game_time()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn game_over(&self) -> Option<i32> {
        self.game_over
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Runs one full simulation tick: drain commands and path responses,
    /// advance projectiles, tick units, emit the frame, check for game end,
    /// then push the game clock forward.
    pub fn tick(&mut self, now: Instant) {
        let dt = self.clock.begin_tick(now);

        self.drain_inbound();
        self.drain_path_responses();
        self.tick_projectiles(dt);
        self.tick_units(dt);
        self.send_frame();
        self.check_game_end();
        self.maybe_send_stats();

        self.clock.advance(dt);
        self.ticks += 1;
    }

    pub fn next_tick_delay(&mut self, now: Instant) -> Duration {
        self.clock.next_tick_delay(now)
    }

    fn spawn_initial_roster(&mut self, tank: &std::sync::Arc<UnitType>) {
        let layout = self.config.layout_size;
        let count = self.config.units_per_player;
        let first_y = layout.y / 2.0 - (count.saturating_sub(1) as f64) * ROSTER_SPACING / 2.0;

        for player in 0..2u32 {
            let (x, angle) = if player == 0 {
                (ROSTER_MARGIN, 0.0)
            } else {
                (layout.x - ROSTER_MARGIN, std::f64::consts::PI)
            };
            for row in 0..count {
                let id = self.allocate_unit_id();
                let pos = DVec2::new(x, first_y + row as f64 * ROSTER_SPACING);
                let unit = Unit::new(id, player, tank, pos, angle, layout, &mut self.grid);
                self.units.insert(id, unit);
            }
        }
    }

    /// Allocates the next free unit id, wrapping at 2^16 and skipping ids
    /// still alive in the registry.
    fn allocate_unit_id(&mut self) -> u16 {
        loop {
            let id = self.next_unit_id;
            self.next_unit_id = self.next_unit_id.wrapping_add(1);
            if !self.units.contains_key(&id) {
                return id;
            }
        }
    }

    fn allocate_projectile_id(&mut self) -> u16 {
        loop {
            let id = self.next_projectile_id;
            self.next_projectile_id = self.next_projectile_id.wrapping_add(1);
            if !self.projectiles.contains_key(&id) {
                return id;
            }
        }
    }

    fn drain_inbound(&mut self) {
        for message in self.transport.poll() {
            match MessageHandler::parse_client_message(&message.text) {
                Ok(command) => self.handle_message(message.player, command),
                Err(err) => {
                    log::debug!(
                        "dropping malformed message from player {}: {err}",
                        message.player
                    );
                }
            }
        }
    }

    fn handle_message(&mut self, player: PlayerId, command: ClientMessage) {
        match command {
            ClientMessage::Ping { id } => {
                let time =
                    self.clock.game_time() + self.clock.time_since_last_tick(Instant::now());
                let reply = ServerMessage::Pong { id, time };
                self.transport.send_text(
                    Channel::Unreliable,
                    Some(player),
                    &encode_message(&reply),
                );
            }
            ClientMessage::MoveUnits { units } => {
                // New orders are ignored once the match has been decided.
                if self.game_over.is_none() {
                    self.handle_move_units(player, units);
                }
            }
            ClientMessage::Release => {
                if player == 0 {
                    log::info!("release received from host player; shutting down");
                    self.running = false;
                }
            }
        }
    }

    fn handle_move_units(&mut self, player: PlayerId, entries: Vec<MoveUnitsEntry>) {
        let mut movers: Vec<(u16, DVec2, DVec2)> = Vec::with_capacity(entries.len());
        for entry in entries {
            // Unknown ids and units of other players are dropped entry by
            // entry; the rest of the command still applies.
            let Some(unit) = self.units.get(&entry.id) else {
                continue;
            };
            if unit.player() != player {
                continue;
            }
            movers.push((
                entry.id,
                unit.platform().position(),
                DVec2::new(entry.x, entry.y),
            ));
        }
        if movers.is_empty() {
            return;
        }

        let grouped = movers.len() > self.config.path_group_max_workers as usize;
        if grouped {
            self.oracle.start_group(
                self.config.path_group_base_cost,
                self.config.path_group_cell_spread,
                self.config.path_group_max_workers,
            );
        }

        for (id, from, target) in quadrant_interleave(movers) {
            let Some(unit) = self.units.get_mut(&id) else {
                continue;
            };
            let target = unit.platform().clamp_to_layout(target);
            if let Some(controller) = unit.platform_mut().movement.as_mut() {
                controller.stop();
            }
            let request = self.oracle.request(from, target);
            unit.pending_path = Some(request);
            self.pending_paths.insert(request, id);
        }

        if grouped {
            self.oracle.end_group();
        }
    }

    fn drain_path_responses(&mut self) {
        for response in self.oracle.drain_responses() {
            let Some(unit_id) = self.pending_paths.remove(&response.id) else {
                continue;
            };
            let Some(unit) = self.units.get_mut(&unit_id) else {
                continue;
            };
            if unit.pending_path != Some(response.id) {
                // A newer move command superseded this request.
                continue;
            }
            unit.pending_path = None;

            match response.path {
                Some(path) if !path.is_empty() => unit.start_moving_along_waypoints(path),
                _ => log::debug!("no path for unit {unit_id}; leaving it halted"),
            }
        }
    }

    fn tick_projectiles(&mut self, dt: f64) {
        let mut hits: Vec<(u16, f64)> = Vec::new();
        let mut destroyed: Vec<u16> = Vec::new();

        for (&id, projectile) in &mut self.projectiles {
            if let Some(hit) = projectile.tick(dt, &self.grid, &self.units) {
                let pos = projectile.position();
                self.events.push(GameEvent::ProjectileHit {
                    id,
                    x: quantize_u16(pos.x),
                    y: quantize_u16(pos.y),
                });
                hits.push((hit.unit_id, projectile.damage()));
            }
            if projectile.should_destroy() {
                destroyed.push(id);
            }
        }

        for id in destroyed {
            self.projectiles.remove(&id);
        }
        for (unit_id, damage) in hits {
            if let Some(unit) = self.units.get_mut(&unit_id) {
                if unit.apply_damage(damage) {
                    self.destroy_unit(unit_id);
                }
            }
        }
    }

    fn tick_units(&mut self, dt: f64) {
        let mut ids: Vec<u16> = self.units.keys().copied().collect();
        ids.sort_unstable();

        for id in ids {
            // The unit leaves the registry while it ticks so its collision
            // and targeting queries see every platform except itself.
            let Some(mut unit) = self.units.remove(&id) else {
                continue;
            };
            let player = unit.player();
            let fire = {
                let mut ctx = MoveContext {
                    dt,
                    game_time: self.clock.game_time(),
                    self_id: id,
                    grid: &mut self.grid,
                    others: &self.units,
                };
                unit.tick(&mut ctx)
            };
            self.units.insert(id, unit);

            if let Some(fire) = fire {
                self.spawn_projectile(player, fire);
            }
        }

        for (&id, unit) in &self.units {
            if !unit.delta_flags().is_empty() {
                self.handler.mark_delta(id);
            }
        }
    }

    fn spawn_projectile(&mut self, player: PlayerId, fire: TurretFire) {
        let id = self.allocate_projectile_id();
        self.events.push(GameEvent::FireProjectile {
            id,
            x: quantize_u16(fire.position.x),
            y: quantize_u16(fire.position.y),
            angle: angle_to_u16(fire.angle),
            speed: quantize_u16(fire.speed),
            range: quantize_u16(fire.range),
            distance_travelled: 0,
        });
        self.projectiles.insert(
            id,
            Projectile::new(
                id,
                player,
                fire.position,
                fire.angle,
                fire.speed,
                fire.range,
                fire.damage,
            ),
        );
    }

    /// Tears a unit down exactly once: grid release, destruction event,
    /// removal from the pending update sets.
    fn destroy_unit(&mut self, id: u16) {
        if let Some(mut unit) = self.units.remove(&id) {
            unit.release(&mut self.grid);
            self.events.push(GameEvent::UnitDestroyed { id });
            self.handler.on_unit_destroyed(id);
        }
    }

    fn send_frame(&mut self) {
        let events = self.events.drain();
        let time = self.clock.game_time();
        if let Some(data) = self.handler.compose_frame(time, &mut self.units, &events) {
            self.transport
                .send_binary(Channel::ReliableUnordered, None, data);
        }
    }

    fn check_game_end(&mut self) {
        if self.game_over.is_some() {
            return;
        }
        let player0_alive = self.units.values().any(|u| u.player() == 0);
        let player1_alive = self.units.values().any(|u| u.player() == 1);

        let winner = match (player0_alive, player1_alive) {
            (true, true) => return,
            (true, false) => 0,
            (false, true) => 1,
            (false, false) => -1,
        };

        self.game_over = Some(winner);
        log::info!("game over; winning player {winner}");
        self.broadcast_control(&ServerMessage::GameOver {
            winning_player: winner,
        });
    }

    fn maybe_send_stats(&mut self) {
        let game_time = self.clock.game_time();
        if game_time - self.last_stats_time < self.config.stats_period_sec {
            return;
        }
        self.last_stats_time = game_time;

        let stats = ServerMessage::Stats {
            ticks: self.ticks,
            units: self.units.len(),
            projectiles: self.projectiles.len(),
            bytes_sent: self.transport.stats().bytes_sent,
            game_time,
        };
        self.broadcast_control(&stats);
    }

    fn broadcast_control(&mut self, message: &ServerMessage) {
        self.transport
            .send_text(Channel::ReliableOrdered, None, &encode_message(message));
    }
}

fn encode_message(message: &ServerMessage) -> String {
    // Serialising our own plain enums cannot fail.
    serde_json::to_string(message).expect("server message encoding")
}

/// Orders simultaneous path requests so consecutive ones start far apart:
/// split left/right on current x, split each half top/bottom on current y,
/// then take one unit from each quadrant in turn.
fn quadrant_interleave(mut movers: Vec<(u16, DVec2, DVec2)>) -> Vec<(u16, DVec2, DVec2)> {
    if movers.len() < 4 {
        return movers;
    }

    movers.sort_by(|a, b| a.1.x.total_cmp(&b.1.x));
    let right = movers.split_off(movers.len() / 2);
    let left = movers;

    let split_vertically = |mut half: Vec<(u16, DVec2, DVec2)>| {
        half.sort_by(|a, b| a.1.y.total_cmp(&b.1.y));
        let bottom = half.split_off(half.len() / 2);
        (half, bottom)
    };
    let (left_top, left_bottom) = split_vertically(left);
    let (right_top, right_bottom) = split_vertically(right);

    let mut queues = [
        left_top.into_iter(),
        right_top.into_iter(),
        left_bottom.into_iter(),
        right_bottom.into_iter(),
    ];
    let mut ordered = Vec::with_capacity(queues.iter().map(|q| q.len()).sum());
    loop {
        let mut exhausted = true;
        for queue in &mut queues {
            if let Some(mover) = queue.next() {
                ordered.push(mover);
                exhausted = false;
            }
        }
        if exhausted {
            break;
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadrant_interleave_round_robins() {
        let at = |id: u16, x: f64, y: f64| (id, DVec2::new(x, y), DVec2::ZERO);
        let movers = vec![
            at(1, 0.0, 0.0),
            at(2, 0.0, 100.0),
            at(3, 100.0, 0.0),
            at(4, 100.0, 100.0),
            at(5, 10.0, 10.0),
            at(6, 110.0, 10.0),
            at(7, 10.0, 110.0),
            at(8, 110.0, 110.0),
        ];

        let ordered = quadrant_interleave(movers);
        assert_eq!(ordered.len(), 8);

        // The first four come one from each quadrant.
        let first_ids: Vec<u16> = ordered[..4].iter().map(|m| m.0).collect();
        assert_eq!(first_ids, vec![1, 3, 2, 4]);
    }

    #[test]
    fn small_groups_keep_their_order() {
        let at = |id: u16, x: f64| (id, DVec2::new(x, 0.0), DVec2::ZERO);
        let movers = vec![at(9, 50.0), at(3, 10.0)];
        let ordered = quadrant_interleave(movers);
        assert_eq!(ordered[0].0, 9);
        assert_eq!(ordered[1].0, 3);
    }
}
