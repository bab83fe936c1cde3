use std::sync::Arc;

use glam::DVec2;

use crate::collision::CollisionGrid;
use crate::objects::UnitType;
use crate::path::PathRequestId;

use super::movement::{MoveContext, MovementController};
use super::platform::UnitPlatform;
use super::turret::{TurretFire, UnitTurret};
use super::DeltaFlags;

pub const DEFAULT_HEALTH: f64 = 100.0;

/// One unit: the platform that drives, the turret that aims, and the wire
/// bookkeeping that decides what the next frame says about it.
#[derive(Debug)]
pub struct Unit {
    id: u16,
    player: u32,
    health: f64,
    platform: UnitPlatform,
    turret: UnitTurret,
    debug_state: u8,
    debug_dirty: bool,
    /// Current outstanding path request; responses with any other id are
    /// stale and ignored.
    pub(crate) pending_path: Option<PathRequestId>,
    unit_type: Arc<UnitType>,
}

impl Unit {
    pub fn new(
        id: u16,
        player: u32,
        unit_type: &Arc<UnitType>,
        pos: DVec2,
        angle: f64,
        layout: DVec2,
        grid: &mut CollisionGrid,
    ) -> Self {
        Self {
            id,
            player,
            health: DEFAULT_HEALTH,
            platform: UnitPlatform::new(id, unit_type, pos, angle, layout, grid),
            turret: UnitTurret::new(&unit_type.stats),
            debug_state: 0,
            debug_dirty: false,
            pending_path: None,
            unit_type: Arc::clone(unit_type),
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn player(&self) -> u32 {
        self.player
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn unit_type(&self) -> &Arc<UnitType> {
        &self.unit_type
    }

    pub fn platform(&self) -> &UnitPlatform {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut UnitPlatform {
        &mut self.platform
    }

    pub fn turret(&self) -> &UnitTurret {
        &self.turret
    }

    pub fn debug_state(&self) -> u8 {
        self.debug_state
    }

    pub fn set_debug_state(&mut self, state: u8) {
        if state != self.debug_state {
            self.debug_state = state;
            self.debug_dirty = true;
        }
    }

    /// Applies damage; returns true when the unit is destroyed. The caller
    /// performs the actual teardown exactly once.
    pub fn apply_damage(&mut self, amount: f64) -> bool {
        self.health -= amount;
        self.health <= 0.0
    }

    /// Union of all pending wire changes for this unit.
    pub fn delta_flags(&self) -> DeltaFlags {
        let mut flags = self.platform.dirty;
        if self.turret.dirty {
            flags |= DeltaFlags::TURRET_OFFSET_ANGLE;
        }
        if self.debug_dirty {
            flags |= DeltaFlags::DEBUG_STATE;
        }
        flags
    }

    /// Called after the unit is written to a frame, full or delta.
    pub fn clear_delta_flags(&mut self) {
        self.platform.dirty = DeltaFlags::empty();
        self.turret.dirty = false;
        self.debug_dirty = false;
    }

    /// Lazily creates the movement controller and points it along `path`.
    pub fn start_moving_along_waypoints(&mut self, path: Vec<DVec2>) {
        self.platform
            .movement
            .get_or_insert_with(MovementController::new)
            .start_moving_along_waypoints(path);
    }

    /// Ticks the platform (movement) and then the turret, so projectile
    /// spawns see the freshly moved transform. Any fire intent is returned
    /// for the caller to realise.
    pub fn tick(&mut self, ctx: &mut MoveContext<'_>) -> Option<TurretFire> {
        if let Some(mut controller) = self.platform.movement.take() {
            let debug = controller.tick(&mut self.platform, ctx);
            if controller.is_released() {
                // The controller releases itself and clears the debug state.
                self.set_debug_state(0);
            } else {
                self.set_debug_state(debug);
                self.platform.movement = Some(controller);
            }
        }

        self.turret
            .tick(ctx.dt, &self.platform, self.player, ctx.others)
    }

    /// Releases grid membership on destruction.
    pub fn release(&mut self, grid: &mut CollisionGrid) {
        self.platform.release(grid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::tank;
    use crate::units::UnitMap;

    const LAYOUT: DVec2 = DVec2::new(35_000.0, 13_000.0);

    fn unit(grid: &mut CollisionGrid) -> Unit {
        Unit::new(
            1,
            0,
            &Arc::new(tank()),
            DVec2::new(1_000.0, 1_000.0),
            0.0,
            LAYOUT,
            grid,
        )
    }

    #[test]
    fn damage_reports_destruction_once_health_depleted() {
        let mut grid = CollisionGrid::new(LAYOUT.x, LAYOUT.y, 2_000.0);
        let mut u = unit(&mut grid);

        assert!(!u.apply_damage(60.0));
        assert!(u.apply_damage(40.0));
    }

    #[test]
    fn controller_created_lazily_and_dropped_on_release() {
        let mut grid = CollisionGrid::new(LAYOUT.x, LAYOUT.y, 2_000.0);
        let others = UnitMap::new();
        let mut u = unit(&mut grid);
        assert!(!u.platform().has_movement());

        u.start_moving_along_waypoints(vec![DVec2::new(1_010.0, 1_000.0)]);
        assert!(u.platform().has_movement());

        let dt = 1.0 / 30.0;
        for _ in 0..120 {
            let mut ctx = MoveContext {
                dt,
                game_time: 0.0,
                self_id: 1,
                grid: &mut grid,
                others: &others,
            };
            u.tick(&mut ctx);
            if !u.platform().has_movement() {
                break;
            }
        }

        assert!(!u.platform().has_movement());
        assert_eq!(u.debug_state(), 0);
    }

    #[test]
    fn debug_state_changes_flag_delta() {
        let mut grid = CollisionGrid::new(LAYOUT.x, LAYOUT.y, 2_000.0);
        let mut u = unit(&mut grid);

        u.set_debug_state(3);
        assert!(u.delta_flags().contains(DeltaFlags::DEBUG_STATE));

        u.clear_delta_flags();
        u.set_debug_state(3);
        assert!(u.delta_flags().is_empty());
    }
}
