use std::collections::HashSet;

/// Uniform spatial hash over the layout plane. Cells hold the ids of unit
/// platforms whose world AABB overlaps them; membership is maintained by
/// each platform's [`super::CollisionBox`].
#[derive(Debug)]
pub struct CollisionGrid {
    cell_size: f64,
    cells_x: i32,
    cells_y: i32,
    cells: Vec<HashSet<u16>>,
}

impl CollisionGrid {
    pub fn new(layout_width: f64, layout_height: f64, cell_size: f64) -> Self {
        let cells_x = (layout_width / cell_size).ceil().max(1.0) as i32;
        let cells_y = (layout_height / cell_size).ceil().max(1.0) as i32;
        Self {
            cell_size,
            cells_x,
            cells_y,
            cells: vec![HashSet::new(); (cells_x * cells_y) as usize],
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn position_to_cell(&self, x: f64, y: f64) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    fn cell_index(&self, cx: i32, cy: i32) -> Option<usize> {
        if cx < 0 || cy < 0 || cx >= self.cells_x || cy >= self.cells_y {
            return None;
        }
        Some((cy * self.cells_x + cx) as usize)
    }

    /// Adds `id` to every cell in the inclusive cell rectangle.
    pub fn add(&mut self, id: u16, left: i32, top: i32, right: i32, bottom: i32) {
        for cy in top..=bottom {
            for cx in left..=right {
                if let Some(index) = self.cell_index(cx, cy) {
                    self.cells[index].insert(id);
                }
            }
        }
    }

    /// Removes `id` from every cell in the inclusive cell rectangle.
    pub fn remove(&mut self, id: u16, left: i32, top: i32, right: i32, bottom: i32) {
        for cy in top..=bottom {
            for cx in left..=right {
                if let Some(index) = self.cell_index(cx, cy) {
                    self.cells[index].remove(&id);
                }
            }
        }
    }

    /// Visits every id in every cell overlapping the world-space rectangle,
    /// stopping early when the callback returns true. An id spanning several
    /// cells is visited once per cell; callers must tolerate duplicates.
    pub fn for_each_in_area(
        &self,
        left: f64,
        top: f64,
        right: f64,
        bottom: f64,
        mut callback: impl FnMut(u16) -> bool,
    ) {
        let (cell_left, cell_top) = self.position_to_cell(left, top);
        let (cell_right, cell_bottom) = self.position_to_cell(right, bottom);

        let cell_left = cell_left.clamp(0, self.cells_x - 1);
        let cell_right = cell_right.clamp(0, self.cells_x - 1);
        let cell_top = cell_top.clamp(0, self.cells_y - 1);
        let cell_bottom = cell_bottom.clamp(0, self.cells_y - 1);

        for cy in cell_top..=cell_bottom {
            for cx in cell_left..=cell_right {
                let index = (cy * self.cells_x + cx) as usize;
                for &id in &self.cells[index] {
                    if callback(id) {
                        return;
                    }
                }
            }
        }
    }

    #[cfg(test)]
    pub fn cells_containing(&self, id: u16) -> Vec<(i32, i32)> {
        let mut result = Vec::new();
        for cy in 0..self.cells_y {
            for cx in 0..self.cells_x {
                if self.cells[(cy * self.cells_x + cx) as usize].contains(&id) {
                    result.push((cx, cy));
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_to_cell_floors() {
        let grid = CollisionGrid::new(10_000.0, 6_000.0, 2_000.0);
        assert_eq!(grid.position_to_cell(0.0, 0.0), (0, 0));
        assert_eq!(grid.position_to_cell(1_999.9, 1_999.9), (0, 0));
        assert_eq!(grid.position_to_cell(2_000.0, 4_100.0), (1, 2));
    }

    #[test]
    fn add_remove_membership() {
        let mut grid = CollisionGrid::new(10_000.0, 6_000.0, 2_000.0);
        grid.add(7, 0, 0, 1, 1);
        assert_eq!(grid.cells_containing(7).len(), 4);

        grid.remove(7, 0, 0, 1, 1);
        assert!(grid.cells_containing(7).is_empty());
    }

    #[test]
    fn area_iteration_clamps_to_grid() {
        let mut grid = CollisionGrid::new(10_000.0, 6_000.0, 2_000.0);
        grid.add(1, 0, 0, 0, 0);

        let mut seen = Vec::new();
        grid.for_each_in_area(-5_000.0, -5_000.0, 50_000.0, 50_000.0, |id| {
            seen.push(id);
            false
        });
        assert_eq!(seen, vec![1]);
    }

    #[test]
    fn area_iteration_short_circuits() {
        let mut grid = CollisionGrid::new(10_000.0, 6_000.0, 2_000.0);
        grid.add(1, 0, 0, 0, 0);
        grid.add(2, 1, 0, 1, 0);

        let mut visits = 0;
        grid.for_each_in_area(0.0, 0.0, 9_999.0, 1_000.0, |_| {
            visits += 1;
            true
        });
        assert_eq!(visits, 1);
    }

    #[test]
    fn spanning_id_visited_once_per_cell() {
        let mut grid = CollisionGrid::new(10_000.0, 6_000.0, 2_000.0);
        grid.add(9, 0, 0, 1, 0);

        let mut visits = 0;
        grid.for_each_in_area(0.0, 0.0, 3_999.0, 1_000.0, |id| {
            assert_eq!(id, 9);
            visits += 1;
            false
        });
        assert_eq!(visits, 2);
    }
}
