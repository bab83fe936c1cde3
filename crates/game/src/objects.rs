use std::collections::HashMap;
use std::sync::Arc;

use glam::DVec2;

/// Immutable per-type geometry, registered once at match start. Polygon
/// points are in pixels relative to the origin, wound clockwise.
#[derive(Debug, Clone)]
pub struct ObjectData {
    name: String,
    size: DVec2,
    origin: DVec2,
    image_point: DVec2,
    full_poly: Arc<Vec<DVec2>>,
    obstacle_poly: Arc<Vec<DVec2>>,
}

impl ObjectData {
    pub fn new(
        name: &str,
        size: DVec2,
        origin: DVec2,
        image_point: DVec2,
        full_poly: Vec<DVec2>,
        obstacle_poly: Vec<DVec2>,
    ) -> Self {
        Self {
            name: name.to_string(),
            size,
            origin,
            image_point,
            full_poly: Arc::new(full_poly),
            obstacle_poly: Arc::new(obstacle_poly),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> DVec2 {
        self.size
    }

    pub fn origin(&self) -> DVec2 {
        self.origin
    }

    /// Offset from the origin to the image point (e.g. a turret muzzle),
    /// in unrotated pixels.
    pub fn image_point(&self) -> DVec2 {
        self.image_point
    }

    pub fn full_poly(&self) -> &Arc<Vec<DVec2>> {
        &self.full_poly
    }

    pub fn obstacle_poly(&self) -> &Arc<Vec<DVec2>> {
        &self.obstacle_poly
    }
}

/// Movement and combat parameters for a unit type. Speeds are pixels per
/// second, rotation speeds radians per second.
#[derive(Debug, Clone, Copy)]
pub struct UnitStats {
    pub max_speed: f64,
    pub max_acceleration: f64,
    pub max_deceleration: f64,
    pub rotate_speed: f64,
    pub turret_range: f64,
    pub turret_rotate_speed: f64,
    pub fire_period: f64,
    pub projectile_speed: f64,
    pub projectile_range: f64,
    pub projectile_damage: f64,
}

#[derive(Debug, Clone)]
pub struct UnitType {
    pub data: ObjectData,
    pub stats: UnitStats,
}

#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error("object type {0:?} is already registered")]
    Duplicate(String),
    #[error("object type {0:?} has projectile range {1} beyond the wire maximum of 65535")]
    RangeOverflow(String, f64),
}

#[derive(Debug, Default)]
pub struct ObjectRegistry {
    types: HashMap<String, Arc<UnitType>>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, unit_type: UnitType) -> Result<Arc<UnitType>, ObjectError> {
        let name = unit_type.data.name().to_string();
        if self.types.contains_key(&name) {
            return Err(ObjectError::Duplicate(name));
        }
        // Projectile range and travelled distance go on the wire as u16.
        if unit_type.stats.projectile_range > 65535.0 {
            return Err(ObjectError::RangeOverflow(
                name,
                unit_type.stats.projectile_range,
            ));
        }
        let entry = Arc::new(unit_type);
        self.types.insert(name, Arc::clone(&entry));
        Ok(entry)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<UnitType>> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// The built-in tank definition used for the initial roster.
pub fn tank() -> UnitType {
    let size = DVec2::new(120.0, 80.0);
    let full_poly = vec![
        DVec2::new(-60.0, -40.0),
        DVec2::new(60.0, -40.0),
        DVec2::new(60.0, 40.0),
        DVec2::new(-60.0, 40.0),
    ];
    // Slightly inset so stationary units can sit close without the movement
    // collision tests treating adjacency as overlap.
    let obstacle_poly = vec![
        DVec2::new(-52.0, -34.0),
        DVec2::new(52.0, -34.0),
        DVec2::new(52.0, 34.0),
        DVec2::new(-52.0, 34.0),
    ];

    UnitType {
        data: ObjectData::new(
            "tank",
            size,
            DVec2::new(0.5, 0.5),
            DVec2::new(30.0, 0.0),
            full_poly,
            obstacle_poly,
        ),
        stats: UnitStats {
            max_speed: 250.0,
            max_acceleration: 250.0,
            max_deceleration: 500.0,
            rotate_speed: std::f64::consts::FRAC_PI_2,
            turret_range: 1400.0,
            turret_rotate_speed: std::f64::consts::FRAC_PI_2,
            fire_period: 2.0,
            projectile_speed: 600.0,
            projectile_range: 1000.0,
            projectile_damage: 10.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = ObjectRegistry::new();
        registry.register(tank()).unwrap();
        assert!(matches!(
            registry.register(tank()),
            Err(ObjectError::Duplicate(_))
        ));
    }

    #[test]
    fn oversized_projectile_range_rejected() {
        let mut registry = ObjectRegistry::new();
        let mut t = tank();
        t.stats.projectile_range = 70_000.0;
        assert!(matches!(
            registry.register(t),
            Err(ObjectError::RangeOverflow(_, _))
        ));
    }

    #[test]
    fn lookup_by_name() {
        let mut registry = ObjectRegistry::new();
        registry.register(tank()).unwrap();
        let entry = registry.get("tank").unwrap();
        assert_eq!(entry.data.size(), DVec2::new(120.0, 80.0));
        assert!(registry.get("zeppelin").is_none());
    }
}
