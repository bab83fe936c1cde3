use glam::DVec2;

use crate::collision::CollisionGrid;
use crate::units::UnitMap;

/// A hit found while advancing a projectile, reported back to the server
/// which applies the damage and emits the events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileHit {
    pub unit_id: u16,
}

/// Ballistic point travelling along a fixed angle until it hits something
/// or runs out its range.
#[derive(Debug)]
pub struct Projectile {
    id: u16,
    player: u32,
    pos: DVec2,
    angle: f64,
    speed: f64,
    range: f64,
    distance_travelled: f64,
    damage: f64,
    did_hit: bool,
}

impl Projectile {
    pub fn new(id: u16, player: u32, pos: DVec2, angle: f64, speed: f64, range: f64, damage: f64) -> Self {
        Self {
            id,
            player,
            pos,
            angle,
            speed,
            range,
            distance_travelled: 0.0,
            damage,
            did_hit: false,
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn player(&self) -> u32 {
        self.player
    }

    pub fn position(&self) -> DVec2 {
        self.pos
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn range(&self) -> f64 {
        self.range
    }

    pub fn distance_travelled(&self) -> f64 {
        self.distance_travelled
    }

    pub fn damage(&self) -> f64 {
        self.damage
    }

    /// Advances by `speed * dt` and tests the new position against nearby
    /// platforms. Friendly platforms are skipped; the first full-shape
    /// containment wins.
    pub fn tick(&mut self, dt: f64, grid: &CollisionGrid, units: &UnitMap) -> Option<ProjectileHit> {
        let step = self.speed * dt;
        let (sin_a, cos_a) = self.angle.sin_cos();
        self.pos.x += cos_a * step;
        self.pos.y += sin_a * step;
        self.distance_travelled += step;

        let mut hit = None;
        grid.for_each_in_area(self.pos.x, self.pos.y, self.pos.x, self.pos.y, |id| {
            let Some(unit) = units.get(&id) else {
                return false;
            };
            if unit.player() == self.player {
                return false;
            }
            if unit.platform().contains_point_full(self.pos.x, self.pos.y) {
                hit = Some(ProjectileHit { unit_id: id });
                return true;
            }
            false
        });

        if hit.is_some() {
            self.did_hit = true;
        }
        hit
    }

    pub fn should_destroy(&self) -> bool {
        self.did_hit || self.distance_travelled > self.range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::tank;
    use crate::units::Unit;
    use std::sync::Arc;

    const LAYOUT: DVec2 = DVec2::new(35_000.0, 13_000.0);

    fn spawn(grid: &mut CollisionGrid, map: &mut UnitMap, id: u16, player: u32, x: f64, y: f64) {
        let unit = Unit::new(id, player, &Arc::new(tank()), DVec2::new(x, y), 0.0, LAYOUT, grid);
        map.insert(id, unit);
    }

    #[test]
    fn hits_enemy_platform() {
        let mut grid = CollisionGrid::new(LAYOUT.x, LAYOUT.y, 2_000.0);
        let mut map = UnitMap::new();
        spawn(&mut grid, &mut map, 5, 1, 900.0, 500.0);

        let mut projectile =
            Projectile::new(1, 0, DVec2::new(500.0, 500.0), 0.0, 600.0, 1_000.0, 10.0);

        let mut hit = None;
        for _ in 0..30 {
            hit = projectile.tick(1.0 / 30.0, &grid, &map);
            if hit.is_some() {
                break;
            }
        }

        assert_eq!(hit, Some(ProjectileHit { unit_id: 5 }));
        assert!(projectile.should_destroy());
        assert!(projectile.position().x >= 840.0);
    }

    #[test]
    fn never_hits_own_player() {
        let mut grid = CollisionGrid::new(LAYOUT.x, LAYOUT.y, 2_000.0);
        let mut map = UnitMap::new();
        spawn(&mut grid, &mut map, 5, 0, 900.0, 500.0);

        let mut projectile =
            Projectile::new(1, 0, DVec2::new(500.0, 500.0), 0.0, 600.0, 1_000.0, 10.0);

        for _ in 0..60 {
            assert_eq!(projectile.tick(1.0 / 30.0, &grid, &map), None);
        }
    }

    #[test]
    fn expires_past_range() {
        let grid = CollisionGrid::new(LAYOUT.x, LAYOUT.y, 2_000.0);
        let map = UnitMap::new();

        let mut projectile =
            Projectile::new(1, 0, DVec2::new(500.0, 500.0), 0.0, 600.0, 1_000.0, 10.0);

        assert!(!projectile.should_destroy());
        for _ in 0..60 {
            projectile.tick(1.0 / 30.0, &grid, &map);
        }
        assert!(projectile.distance_travelled() > projectile.range());
        assert!(projectile.should_destroy());
    }
}
