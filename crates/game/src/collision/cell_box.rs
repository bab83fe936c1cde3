use super::grid::CollisionGrid;

/// Keeps one platform's grid membership in sync with its world AABB. The
/// occupied cell rectangle is diffed so unchanged moves touch nothing.
#[derive(Debug, Clone)]
pub struct CollisionBox {
    id: u16,
    cell_range: Option<(i32, i32, i32, i32)>,
}

impl CollisionBox {
    pub fn new(id: u16) -> Self {
        Self {
            id,
            cell_range: None,
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    /// Re-derives the occupied cell rectangle from the world AABB corners
    /// and applies a remove/add pair only when the rectangle changed.
    pub fn update(&mut self, grid: &mut CollisionGrid, left: f64, top: f64, right: f64, bottom: f64) {
        let (cell_left, cell_top) = grid.position_to_cell(left, top);
        let (cell_right, cell_bottom) = grid.position_to_cell(right, bottom);
        let range = (cell_left, cell_top, cell_right, cell_bottom);

        if self.cell_range == Some(range) {
            return;
        }

        if let Some((l, t, r, b)) = self.cell_range {
            grid.remove(self.id, l, t, r, b);
        }
        grid.add(self.id, cell_left, cell_top, cell_right, cell_bottom);
        self.cell_range = Some(range);
    }

    /// Removes the owner from its last cell range. Safe to call twice.
    pub fn release(&mut self, grid: &mut CollisionGrid) {
        if let Some((l, t, r, b)) = self.cell_range.take() {
            grid.remove(self.id, l, t, r, b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_tracks_moves() {
        let mut grid = CollisionGrid::new(10_000.0, 6_000.0, 2_000.0);
        let mut cbox = CollisionBox::new(3);

        cbox.update(&mut grid, 100.0, 100.0, 300.0, 300.0);
        assert_eq!(grid.cells_containing(3), vec![(0, 0)]);

        cbox.update(&mut grid, 1_900.0, 100.0, 2_100.0, 300.0);
        assert_eq!(grid.cells_containing(3), vec![(0, 0), (1, 0)]);

        cbox.update(&mut grid, 4_100.0, 4_100.0, 4_200.0, 4_200.0);
        assert_eq!(grid.cells_containing(3), vec![(2, 2)]);
    }

    #[test]
    fn same_rect_is_noop() {
        let mut grid = CollisionGrid::new(10_000.0, 6_000.0, 2_000.0);
        let mut cbox = CollisionBox::new(3);

        cbox.update(&mut grid, 100.0, 100.0, 300.0, 300.0);
        // A move within the same cells must not churn membership.
        cbox.update(&mut grid, 150.0, 150.0, 350.0, 350.0);
        assert_eq!(grid.cells_containing(3), vec![(0, 0)]);
    }

    #[test]
    fn release_clears_membership() {
        let mut grid = CollisionGrid::new(10_000.0, 6_000.0, 2_000.0);
        let mut cbox = CollisionBox::new(3);

        cbox.update(&mut grid, 100.0, 100.0, 2_100.0, 300.0);
        cbox.release(&mut grid);
        assert!(grid.cells_containing(3).is_empty());

        cbox.release(&mut grid);
        assert!(grid.cells_containing(3).is_empty());
    }
}
