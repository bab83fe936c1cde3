use glam::DVec2;

use crate::math::{
    angle_difference, angle_rotate, angle_to, angle_to_u16, distance_squared, to_radians,
    wrap_angle,
};
use crate::objects::UnitStats;

use super::platform::UnitPlatform;
use super::UnitMap;

/// Alignment tolerance before the turret fires.
const FIRE_ALIGN_TOLERANCE_DEG: f64 = 1.0;

/// Spawn parameters for a projectile, produced when a turret fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurretFire {
    pub position: DVec2,
    pub angle: f64,
    pub speed: f64,
    pub range: f64,
    pub damage: f64,
}

/// A unit's turret. Position and angle are stored relative to the platform,
/// so the aimed direction stays stable while the platform rotates under it.
#[derive(Debug)]
pub struct UnitTurret {
    offset_pos: DVec2,
    offset_angle: f64,
    last_offset_u16: u16,
    target_id: Option<u16>,
    range: f64,
    rotate_speed: f64,
    fire_period: f64,
    cooldown: f64,
    projectile_speed: f64,
    projectile_range: f64,
    projectile_damage: f64,
    pub(super) dirty: bool,
}

impl UnitTurret {
    pub fn new(stats: &UnitStats) -> Self {
        Self {
            offset_pos: DVec2::ZERO,
            offset_angle: 0.0,
            last_offset_u16: 0,
            target_id: None,
            range: stats.turret_range,
            rotate_speed: stats.turret_rotate_speed,
            fire_period: stats.fire_period,
            cooldown: 0.0,
            projectile_speed: stats.projectile_speed,
            projectile_range: stats.projectile_range,
            projectile_damage: stats.projectile_damage,
            dirty: false,
        }
    }

    pub fn offset_angle(&self) -> f64 {
        self.offset_angle
    }

    pub fn target_id(&self) -> Option<u16> {
        self.target_id
    }

    pub fn range(&self) -> f64 {
        self.range
    }

    pub fn world_angle(&self, platform: &UnitPlatform) -> f64 {
        wrap_angle(platform.angle() + self.offset_angle)
    }

    pub fn world_position(&self, platform: &UnitPlatform) -> DVec2 {
        let (sin_a, cos_a) = platform.angle().sin_cos();
        let rotated = DVec2::new(
            self.offset_pos.x * cos_a - self.offset_pos.y * sin_a,
            self.offset_pos.y * cos_a + self.offset_pos.x * sin_a,
        );
        platform.position() + rotated
    }

    fn set_offset_angle(&mut self, offset: f64) {
        let offset = wrap_angle(offset);
        self.offset_angle = offset;
        let as_u16 = angle_to_u16(offset);
        if as_u16 != self.last_offset_u16 {
            self.last_offset_u16 = as_u16;
            self.dirty = true;
        }
    }

    /// Runs targeting and firing for one tick. The platform has already
    /// moved this tick, so spawn positions use the fresh transform.
    pub fn tick(
        &mut self,
        dt: f64,
        platform: &UnitPlatform,
        own_player: u32,
        others: &UnitMap,
    ) -> Option<TurretFire> {
        self.cooldown = (self.cooldown - dt).max(0.0);

        let own_pos = platform.position();

        if self.target_id.is_none() {
            self.acquire_target(own_pos, own_player, others);
        }

        let Some(target_id) = self.target_id else {
            // Idle: swing back to face along the platform.
            let returned = angle_rotate(self.offset_angle, 0.0, self.rotate_speed * dt);
            self.set_offset_angle(returned);
            return None;
        };

        // Refetch by id each tick; the target may be gone or out of range.
        let target_pos = match others.get(&target_id) {
            Some(target) => target.platform().position(),
            None => {
                self.target_id = None;
                return None;
            }
        };
        if distance_squared(own_pos.x, own_pos.y, target_pos.x, target_pos.y)
            > self.range * self.range
        {
            self.target_id = None;
            return None;
        }

        let turret_pos = self.world_position(platform);
        let desired = angle_to(turret_pos.x, turret_pos.y, target_pos.x, target_pos.y);
        let world = self.world_angle(platform);
        let rotated = angle_rotate(world, desired, self.rotate_speed * dt);
        self.set_offset_angle(rotated - platform.angle());

        if self.cooldown == 0.0
            && angle_difference(rotated, desired) <= to_radians(FIRE_ALIGN_TOLERANCE_DEG)
        {
            self.cooldown = self.fire_period;
            return Some(TurretFire {
                position: turret_pos,
                angle: rotated,
                speed: self.projectile_speed,
                range: self.projectile_range,
                damage: self.projectile_damage,
            });
        }

        None
    }

    /// Linear scan for the first enemy in range. Brute force over the whole
    /// registry; acceptable at current unit counts.
    fn acquire_target(&mut self, own_pos: DVec2, own_player: u32, others: &UnitMap) {
        let range_sq = self.range * self.range;
        for (&id, other) in others {
            if other.player() == own_player {
                continue;
            }
            let pos = other.platform().position();
            if distance_squared(own_pos.x, own_pos.y, pos.x, pos.y) <= range_sq {
                self.target_id = Some(id);
                return;
            }
        }
    }
}
