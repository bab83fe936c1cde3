use glam::DVec2;

use crate::collision::{CollisionBox, CollisionGrid, CollisionShape};
use crate::math::{angle_to_u16, wrap_angle};
use crate::objects::UnitType;

use super::movement::MovementController;
use super::DeltaFlags;

/// The mobile chassis of a unit: kinematic state, the collision shapes
/// derived from the unit type, and the grid membership box. All setters
/// enforce the platform invariants (speed and acceleration limits, wrapped
/// angle, position inside the layout).
#[derive(Debug)]
pub struct UnitPlatform {
    pos: DVec2,
    angle: f64,
    speed: f64,
    acceleration: f64,

    max_speed: f64,
    max_acceleration: f64,
    max_deceleration: f64,
    rotate_speed: f64,

    layout: DVec2,

    // Quantised last-sent values, so rotations that do not change the wire
    // representation emit no delta.
    last_angle_u16: u16,
    last_speed: f64,

    full_shape: CollisionShape,
    obstacle_shape: CollisionShape,
    collision_box: CollisionBox,

    pub(crate) movement: Option<MovementController>,
    pub(super) dirty: DeltaFlags,
}

impl UnitPlatform {
    pub fn new(
        id: u16,
        unit_type: &UnitType,
        pos: DVec2,
        angle: f64,
        layout: DVec2,
        grid: &mut CollisionGrid,
    ) -> Self {
        let angle = wrap_angle(angle);
        let mut full_shape = CollisionShape::new(unit_type.data.full_poly().clone());
        let mut obstacle_shape = CollisionShape::new(unit_type.data.obstacle_poly().clone());
        full_shape.update(angle);
        obstacle_shape.update(angle);

        let mut platform = Self {
            pos: pos.clamp(DVec2::ZERO, layout),
            angle,
            speed: 0.0,
            acceleration: 0.0,
            max_speed: unit_type.stats.max_speed,
            max_acceleration: unit_type.stats.max_acceleration,
            max_deceleration: unit_type.stats.max_deceleration,
            rotate_speed: unit_type.stats.rotate_speed,
            layout,
            last_angle_u16: angle_to_u16(angle),
            last_speed: 0.0,
            full_shape,
            obstacle_shape,
            collision_box: CollisionBox::new(id),
            movement: None,
            dirty: DeltaFlags::empty(),
        };
        platform.refresh_grid(grid);
        platform
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

    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn max_acceleration(&self) -> f64 {
        self.max_acceleration
    }

    pub fn max_deceleration(&self) -> f64 {
        self.max_deceleration
    }

    pub fn rotate_speed(&self) -> f64 {
        self.rotate_speed
    }

    pub fn full_shape(&self) -> &CollisionShape {
        &self.full_shape
    }

    pub fn obstacle_shape(&self) -> &CollisionShape {
        &self.obstacle_shape
    }

    pub fn layout(&self) -> DVec2 {
        self.layout
    }

    pub fn clamp_to_layout(&self, target: DVec2) -> DVec2 {
        target.clamp(DVec2::ZERO, self.layout)
    }

    pub fn has_movement(&self) -> bool {
        self.movement.is_some()
    }

    /// Moves the platform. Movement integration does not flag a position
    /// delta; clients dead-reckon from speed, acceleration and angle, and
    /// resync from the periodic full update or an explicit
    /// [`Self::mark_position_changed`].
    pub fn set_position(&mut self, x: f64, y: f64, grid: &mut CollisionGrid) {
        let clamped = DVec2::new(x, y).clamp(DVec2::ZERO, self.layout);
        if clamped == self.pos {
            return;
        }
        self.pos = clamped;
        self.refresh_grid(grid);
    }

    pub fn mark_position_changed(&mut self) {
        self.dirty |= DeltaFlags::POSITION;
    }

    pub fn set_angle(&mut self, angle: f64, grid: &mut CollisionGrid) {
        let angle = wrap_angle(angle);
        if angle == self.angle {
            return;
        }
        self.angle = angle;
        self.full_shape.update(angle);
        self.obstacle_shape.update(angle);
        self.refresh_grid(grid);

        let as_u16 = angle_to_u16(angle);
        if as_u16 != self.last_angle_u16 {
            self.last_angle_u16 = as_u16;
            self.dirty |= DeltaFlags::PLATFORM_ANGLE;
        }
    }

    /// Clamps into `[-max_speed, max_speed]`. Plain acceleration-driven
    /// speed changes emit no delta; crossing zero in either direction flags
    /// both position and speed so the client resynchronises the resting
    /// point promptly.
    pub fn set_speed(&mut self, speed: f64) {
        let speed = speed.clamp(-self.max_speed, self.max_speed);
        if (self.last_speed == 0.0) != (speed == 0.0) {
            self.dirty |= DeltaFlags::POSITION | DeltaFlags::SPEED;
        }
        self.speed = speed;
        self.last_speed = speed;
    }

    pub fn set_acceleration(&mut self, acceleration: f64) {
        let acceleration = acceleration.clamp(-self.max_deceleration, self.max_acceleration);
        if acceleration != self.acceleration {
            self.dirty |= DeltaFlags::ACCELERATION;
        }
        self.acceleration = acceleration;
    }

    /// Point containment against the full collision polygon, in world
    /// coordinates. Used by projectile hit tests.
    pub fn contains_point_full(&self, x: f64, y: f64) -> bool {
        self.full_shape
            .contains_point(x - self.pos.x, y - self.pos.y)
    }

    /// World AABB of the full collision shape.
    pub fn world_bounds(&self) -> (f64, f64, f64, f64) {
        let b = self.full_shape.bounds();
        (
            self.pos.x + b.left,
            self.pos.y + b.top,
            self.pos.x + b.right,
            self.pos.y + b.bottom,
        )
    }

    fn refresh_grid(&mut self, grid: &mut CollisionGrid) {
        let (left, top, right, bottom) = {
            let b = self.full_shape.bounds();
            (
                self.pos.x + b.left,
                self.pos.y + b.top,
                self.pos.x + b.right,
                self.pos.y + b.bottom,
            )
        };
        self.collision_box.update(grid, left, top, right, bottom);
    }

    /// Removes the platform from the collision grid. Called exactly once,
    /// on unit destruction.
    pub fn release(&mut self, grid: &mut CollisionGrid) {
        self.collision_box.release(grid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::tank;

    fn test_platform(grid: &mut CollisionGrid) -> UnitPlatform {
        UnitPlatform::new(
            1,
            &tank(),
            DVec2::new(1_000.0, 1_000.0),
            0.0,
            DVec2::new(35_000.0, 13_000.0),
            grid,
        )
    }

    #[test]
    fn speed_clamped_and_edge_flagged() {
        let mut grid = CollisionGrid::new(35_000.0, 13_000.0, 2_000.0);
        let mut platform = test_platform(&mut grid);

        platform.set_speed(9_999.0);
        assert_eq!(platform.speed(), platform.max_speed());
        assert!(platform
            .dirty
            .contains(DeltaFlags::POSITION | DeltaFlags::SPEED));

        platform.dirty = DeltaFlags::empty();
        platform.set_speed(100.0);
        assert!(platform.dirty.is_empty());

        platform.set_speed(0.0);
        assert!(platform
            .dirty
            .contains(DeltaFlags::POSITION | DeltaFlags::SPEED));
    }

    #[test]
    fn acceleration_clamped_asymmetrically() {
        let mut grid = CollisionGrid::new(35_000.0, 13_000.0, 2_000.0);
        let mut platform = test_platform(&mut grid);

        platform.set_acceleration(10_000.0);
        assert_eq!(platform.acceleration(), platform.max_acceleration());
        platform.set_acceleration(-10_000.0);
        assert_eq!(platform.acceleration(), -platform.max_deceleration());
    }

    #[test]
    fn sub_quantum_rotation_emits_no_delta() {
        let mut grid = CollisionGrid::new(35_000.0, 13_000.0, 2_000.0);
        let mut platform = test_platform(&mut grid);

        platform.set_angle(crate::math::ANGLE_QUANTUM * 0.2, &mut grid);
        assert!(!platform.dirty.contains(DeltaFlags::PLATFORM_ANGLE));

        platform.set_angle(0.5, &mut grid);
        assert!(platform.dirty.contains(DeltaFlags::PLATFORM_ANGLE));
    }

    #[test]
    fn position_clamped_to_layout() {
        let mut grid = CollisionGrid::new(35_000.0, 13_000.0, 2_000.0);
        let mut platform = test_platform(&mut grid);

        platform.set_position(-50.0, 99_999.0, &mut grid);
        assert_eq!(platform.position(), DVec2::new(0.0, 13_000.0));
    }

    #[test]
    fn release_clears_grid_membership() {
        let mut grid = CollisionGrid::new(35_000.0, 13_000.0, 2_000.0);
        let mut platform = test_platform(&mut grid);
        assert!(!grid.cells_containing(1).is_empty());

        platform.release(&mut grid);
        assert!(grid.cells_containing(1).is_empty());
    }

    #[test]
    fn projectile_point_test_uses_full_shape() {
        let mut grid = CollisionGrid::new(35_000.0, 13_000.0, 2_000.0);
        let platform = test_platform(&mut grid);

        assert!(platform.contains_point_full(1_000.0, 1_000.0));
        assert!(platform.contains_point_full(1_055.0, 1_035.0));
        assert!(!platform.contains_point_full(1_070.0, 1_000.0));
    }
}
