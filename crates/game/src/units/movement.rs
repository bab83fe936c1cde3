use std::collections::VecDeque;
use std::f64::consts::PI;

use glam::DVec2;

use crate::collision::CollisionGrid;
use crate::math::{angle_difference, angle_rotate, angle_to, distance_squared};

use super::platform::UnitPlatform;
use super::{platform_collides, UnitMap};

/// Waypoint arrival snap for intermediate waypoints, in pixels.
const WAYPOINT_ARRIVE_MIN: f64 = 10.0;
/// Arrival snap at the final waypoint, in pixels.
const FINAL_ARRIVE_MIN: f64 = 2.0;
/// Angles closer than this count as aligned.
const ANGLE_SNAP: f64 = 0.01 * PI / 180.0;
/// Nearly-collinear waypoints are discarded instead of solved as a turn.
const COLLINEAR_DISCARD: f64 = 2.0 * PI / 180.0;
/// The turn-circle reachability reset only applies beyond this squared
/// distance, so a unit sitting on its destination cannot oscillate.
const UNREACHABLE_EPSILON_SQ: f64 = FINAL_ARRIVE_MIN * FINAL_ARRIVE_MIN;
/// Reversing runs at this fraction of max speed.
const REVERSE_SPEED_FACTOR: f64 = 0.5;

/// State entered when a reverse manoeuvre completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReverseFollowUp {
    Stopping,
    RotateFirst,
    Moving,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MoveState {
    Stopping,
    RotateFirst,
    Moving,
    Reverse { until: f64, then: ReverseFollowUp },
    Released,
}

impl MoveState {
    fn debug_byte(self) -> u8 {
        match self {
            MoveState::Stopping => 1,
            MoveState::RotateFirst => 2,
            MoveState::Moving => 3,
            MoveState::Reverse { .. } => 4,
            MoveState::Released => 0,
        }
    }
}

pub struct MoveContext<'a> {
    pub dt: f64,
    pub game_time: f64,
    pub self_id: u16,
    pub grid: &'a mut CollisionGrid,
    pub others: &'a UnitMap,
}

/// Per-unit movement state machine. A state may request its successor;
/// the transition latches and is applied after the current state's logic
/// completes for the tick.
#[derive(Debug)]
pub struct MovementController {
    state: MoveState,
    next_state: Option<MoveState>,
    waypoints: VecDeque<DVec2>,
    /// Temporary speed cap imposed ahead of lookahead turns. Infinity means
    /// uncapped; the effective target is always limited by the platform.
    cur_max_speed: f64,
}

impl MovementController {
    pub fn new() -> Self {
        Self {
            state: MoveState::Stopping,
            next_state: None,
            waypoints: VecDeque::new(),
            cur_max_speed: f64::INFINITY,
        }
    }

    /// Replaces the waypoint queue and enters `stopping`, so a unit already
    /// under way brakes before turning onto the new path.
    pub fn start_moving_along_waypoints(&mut self, path: Vec<DVec2>) {
        self.waypoints = path.into();
        self.state = MoveState::Stopping;
        self.next_state = None;
        self.cur_max_speed = f64::INFINITY;
    }

    /// Drops the current path; the unit brakes and releases.
    pub fn stop(&mut self) {
        self.waypoints.clear();
        self.state = MoveState::Stopping;
        self.next_state = None;
        self.cur_max_speed = f64::INFINITY;
    }

    /// Backs up at half speed until `duration` elapses on the game clock,
    /// then enters `then`.
    pub fn start_reverse(&mut self, game_time: f64, duration: f64, then: ReverseFollowUp) {
        self.state = MoveState::Reverse {
            until: game_time + duration,
            then,
        };
        self.next_state = None;
    }

    pub fn is_released(&self) -> bool {
        self.state == MoveState::Released
    }

    pub fn waypoints_remaining(&self) -> usize {
        self.waypoints.len()
    }

    /// Runs one tick of the current state, applies any latched transition,
    /// and returns the debug byte of the state that ran.
    pub fn tick(&mut self, platform: &mut UnitPlatform, ctx: &mut MoveContext<'_>) -> u8 {
        let debug = self.state.debug_byte();

        match self.state {
            MoveState::Stopping => self.tick_stopping(platform, ctx),
            MoveState::RotateFirst => self.tick_rotate_first(platform, ctx),
            MoveState::Moving => self.tick_moving(platform, ctx),
            MoveState::Reverse { until, then } => self.tick_reverse(platform, ctx, until, then),
            MoveState::Released => {}
        }

        if let Some(next) = self.next_state.take() {
            self.state = next;
        }

        debug
    }

    fn request(&mut self, state: MoveState) {
        self.next_state = Some(state);
    }

    /// Accelerates or brakes towards `target_speed` and integrates the
    /// position along the platform angle. Returns the distance moved.
    fn step_movement(
        &mut self,
        platform: &mut UnitPlatform,
        grid: &mut CollisionGrid,
        dt: f64,
        target_speed: f64,
    ) -> f64 {
        let target_speed = target_speed.min(platform.max_speed());
        let speed = platform.speed();

        let acceleration = if speed < target_speed {
            platform.max_acceleration()
        } else if speed > target_speed {
            -platform.max_deceleration()
        } else {
            0.0
        };
        platform.set_acceleration(acceleration);
        let acceleration = platform.acceleration();

        if (target_speed - speed).abs() <= (acceleration * dt).abs() {
            platform.set_speed(target_speed);
        } else {
            platform.set_speed(speed + acceleration * dt);
        }

        let cap = platform.max_speed() * dt;
        let distance =
            (speed * dt + 0.5 * acceleration * dt * dt).clamp(-cap, cap);

        let (sin_a, cos_a) = platform.angle().sin_cos();
        let pos = platform.position();
        platform.set_position(pos.x + cos_a * distance, pos.y + sin_a * distance, grid);
        distance
    }

    fn tick_stopping(&mut self, platform: &mut UnitPlatform, ctx: &mut MoveContext<'_>) {
        let saved = platform.position();
        self.step_movement(platform, ctx.grid, ctx.dt, 0.0);

        if platform_collides(platform, ctx.self_id, ctx.grid, ctx.others) {
            platform.set_position(saved.x, saved.y, ctx.grid);
            platform.set_speed(0.0);
            platform.mark_position_changed();
        }

        if platform.speed() == 0.0 {
            platform.set_acceleration(0.0);
            if self.waypoints.is_empty() {
                self.request(MoveState::Released);
            } else {
                self.request(MoveState::RotateFirst);
            }
        }
    }

    fn tick_rotate_first(&mut self, platform: &mut UnitPlatform, ctx: &mut MoveContext<'_>) {
        let Some(&waypoint) = self.waypoints.front() else {
            self.request(MoveState::Released);
            return;
        };

        let pos = platform.position();
        let target = angle_to(pos.x, pos.y, waypoint.x, waypoint.y);
        let old_angle = platform.angle();
        let new_angle = angle_rotate(old_angle, target, platform.rotate_speed() * ctx.dt);
        platform.set_angle(new_angle, ctx.grid);

        if platform_collides(platform, ctx.self_id, ctx.grid, ctx.others) {
            // Blocked rotations still advance, otherwise a unit pinned by
            // stationary neighbours never leaves this state.
            platform.set_angle(old_angle, ctx.grid);
            self.request(MoveState::Moving);
        } else if angle_difference(new_angle, target) <= ANGLE_SNAP {
            self.request(MoveState::Moving);
        }
    }

    fn tick_moving(&mut self, platform: &mut UnitPlatform, ctx: &mut MoveContext<'_>) {
        if self.waypoints.len() >= 2 {
            self.tick_moving_intermediate(platform, ctx);
        } else if self.waypoints.len() == 1 {
            self.tick_moving_final(platform, ctx);
        } else {
            self.request(MoveState::Released);
        }
    }

    fn tick_moving_intermediate(&mut self, platform: &mut UnitPlatform, ctx: &mut MoveContext<'_>) {
        let pos = platform.position();
        let w1 = self.waypoints[0];
        let w2 = self.waypoints[1];

        let to_w1 = angle_to(pos.x, pos.y, w1.x, w1.y);
        let onward = angle_to(w1.x, w1.y, w2.x, w2.y);
        if angle_difference(to_w1, onward) <= COLLINEAR_DISCARD {
            // Nearly straight through; solving the turn circle here divides
            // by ~zero, and skipping the waypoint loses nothing.
            self.waypoints.pop_front();
            return;
        }

        self.rotate_towards_angle(platform, ctx, to_w1, distance_squared(pos.x, pos.y, w1.x, w1.y));

        // Interior angle at w1 between the approach and departure legs.
        let back = angle_to(w1.x, w1.y, pos.x, pos.y);
        let interior = angle_difference(back, onward);
        let half_tan = (interior / 2.0).tan();

        let radius = platform.speed() / platform.rotate_speed();
        let mut turn_dist = if half_tan > 1e-9 {
            radius / half_tan
        } else {
            f64::INFINITY
        };

        let next_leg_half = distance_squared(w1.x, w1.y, w2.x, w2.y).sqrt() / 2.0;
        if turn_dist > next_leg_half {
            // The turn would overrun the next leg; cap the entry distance and
            // brake to the speed whose turn circle fits it.
            turn_dist = next_leg_half;
            let slow = turn_dist * half_tan * platform.rotate_speed();
            let brake_dist = (platform.max_speed() - slow).powi(2)
                / (2.0 * platform.max_deceleration());
            let slowdown_dist = turn_dist + brake_dist;
            if distance_squared(pos.x, pos.y, w1.x, w1.y) <= slowdown_dist * slowdown_dist {
                self.cur_max_speed = slow;
            }
        }

        self.step_movement(platform, ctx.grid, ctx.dt, self.cur_max_speed);

        let arrive = turn_dist
            .max(2.0 * platform.speed() * ctx.dt)
            .max(WAYPOINT_ARRIVE_MIN);
        let now = platform.position();
        if distance_squared(now.x, now.y, w1.x, w1.y) <= arrive * arrive {
            self.waypoints.pop_front();
        }
    }

    fn tick_moving_final(&mut self, platform: &mut UnitPlatform, ctx: &mut MoveContext<'_>) {
        let waypoint = self.waypoints[0];
        let pos = platform.position();
        let sq_dist = distance_squared(pos.x, pos.y, waypoint.x, waypoint.y);

        let arrive = (platform.speed().abs() * ctx.dt).max(FINAL_ARRIVE_MIN);
        if arrive * arrive >= sq_dist {
            platform.set_position(waypoint.x, waypoint.y, ctx.grid);
            platform.mark_position_changed();
            platform.set_speed(0.0);
            platform.set_acceleration(0.0);
            self.waypoints.clear();
            self.request(MoveState::Released);
            return;
        }

        let dist = sq_dist.sqrt();
        let mut target_speed = self.cur_max_speed;
        let stop_dist =
            platform.speed() * platform.speed() / (2.0 * platform.max_deceleration());
        if dist <= stop_dist {
            target_speed = target_speed.min((2.0 * platform.max_deceleration() * dist).sqrt());
        }

        let target_angle = angle_to(pos.x, pos.y, waypoint.x, waypoint.y);
        self.rotate_towards_angle(platform, ctx, target_angle, sq_dist);
        self.step_movement(platform, ctx.grid, ctx.dt, target_speed);
    }

    /// Rotates the platform towards `target_angle`, reverting on collision,
    /// and requests `stopping` when the turn circle at the current speed can
    /// no longer reach the target.
    fn rotate_towards_angle(
        &mut self,
        platform: &mut UnitPlatform,
        ctx: &mut MoveContext<'_>,
        target_angle: f64,
        sq_dist: f64,
    ) {
        let diff = angle_difference(platform.angle(), target_angle);
        if diff <= ANGLE_SNAP {
            self.cur_max_speed = f64::INFINITY;
            platform.set_angle(target_angle, ctx.grid);
            return;
        }

        let old_angle = platform.angle();
        let new_angle = angle_rotate(old_angle, target_angle, platform.rotate_speed() * ctx.dt);
        platform.set_angle(new_angle, ctx.grid);

        if platform_collides(platform, ctx.self_id, ctx.grid, ctx.others) {
            platform.set_angle(old_angle, ctx.grid);
            self.cur_max_speed = f64::INFINITY;
            return;
        }

        if sq_dist > UNREACHABLE_EPSILON_SQ
            && platform.speed() * (diff / platform.rotate_speed()) > sq_dist.sqrt()
        {
            self.request(MoveState::Stopping);
        }
    }

    fn tick_reverse(
        &mut self,
        platform: &mut UnitPlatform,
        ctx: &mut MoveContext<'_>,
        until: f64,
        then: ReverseFollowUp,
    ) {
        let saved = platform.position();
        self.step_movement(
            platform,
            ctx.grid,
            ctx.dt,
            -platform.max_speed() * REVERSE_SPEED_FACTOR,
        );

        let mut done = ctx.game_time >= until;
        if platform_collides(platform, ctx.self_id, ctx.grid, ctx.others) {
            platform.set_position(saved.x, saved.y, ctx.grid);
            platform.set_speed(0.0);
            platform.mark_position_changed();
            done = true;
        }

        if done {
            self.request(match then {
                ReverseFollowUp::Stopping => MoveState::Stopping,
                ReverseFollowUp::RotateFirst => MoveState::RotateFirst,
                ReverseFollowUp::Moving => MoveState::Moving,
                ReverseFollowUp::Released => MoveState::Released,
            });
        }
    }
}

impl Default for MovementController {
    fn default() -> Self {
        Self::new()
    }
}
