mod cell_box;
mod grid;
mod shape;

pub use cell_box::CollisionBox;
pub use grid::CollisionGrid;
pub use shape::{Aabb, CollisionShape};
