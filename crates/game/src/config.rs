use glam::DVec2;

/// Match configuration supplied by the hosting process. The library has no
/// CLI of its own.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub tick_rate: u32,
    pub full_update_period_sec: f64,
    pub path_group_max_workers: u32,
    pub path_group_base_cost: u32,
    pub path_group_cell_spread: u32,
    pub collision_cell_size: f64,
    pub scratch_buffer_bytes: usize,
    pub layout_size: DVec2,
    pub units_per_player: usize,
    pub stats_period_sec: f64,
    /// Include the movement debug byte in wire records.
    pub debug_state_enabled: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate: 30,
            full_update_period_sec: 2.0,
            path_group_max_workers: 4,
            path_group_base_cost: 1,
            path_group_cell_spread: 3,
            collision_cell_size: 2_000.0,
            scratch_buffer_bytes: 262_144,
            layout_size: DVec2::new(35_000.0, 13_000.0),
            units_per_player: 12,
            stats_period_sec: 1.0,
            debug_state_enabled: false,
        }
    }
}

impl GameConfig {
    pub fn tick_interval_sec(&self) -> f64 {
        1.0 / self.tick_rate as f64
    }
}
