mod movement;
mod platform;
mod turret;
mod unit;

use std::collections::HashMap;

pub use movement::{MoveContext, MovementController, ReverseFollowUp};
pub use platform::UnitPlatform;
pub use turret::{TurretFire, UnitTurret};
pub use unit::Unit;

use crate::collision::CollisionGrid;

bitflags::bitflags! {
    /// Pending per-unit wire changes. Flags accumulate across a tick and
    /// reset when the unit is written, full or delta. Bit order matches the
    /// field order of the delta record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DeltaFlags: u8 {
        const POSITION = 1 << 0;
        const SPEED = 1 << 1;
        const ACCELERATION = 1 << 2;
        const PLATFORM_ANGLE = 1 << 3;
        const TURRET_OFFSET_ANGLE = 1 << 4;
        const DEBUG_STATE = 1 << 7;
    }
}

pub type UnitMap = HashMap<u16, Unit>;

/// True if `platform` currently overlaps any other platform's obstacle
/// shape. The grid visit may yield an id several times; the first confirmed
/// overlap short-circuits the scan.
pub fn platform_collides(
    platform: &UnitPlatform,
    self_id: u16,
    grid: &CollisionGrid,
    others: &UnitMap,
) -> bool {
    let pos = platform.position();
    let bounds = platform.obstacle_shape().bounds();

    let mut hit = false;
    grid.for_each_in_area(
        pos.x + bounds.left,
        pos.y + bounds.top,
        pos.x + bounds.right,
        pos.y + bounds.bottom,
        |id| {
            if id == self_id {
                return false;
            }
            let Some(other) = others.get(&id) else {
                return false;
            };
            let other_platform = other.platform();
            let other_pos = other_platform.position();
            if platform.obstacle_shape().intersects_other(
                other_platform.obstacle_shape(),
                other_pos.x - pos.x,
                other_pos.y - pos.y,
            ) {
                hit = true;
                return true;
            }
            false
        },
    );
    hit
}
