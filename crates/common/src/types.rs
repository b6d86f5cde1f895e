use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::model::Model;

/// Integer coordinate of a cell in the unbounded tile grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct CellCoord {
    pub x: i32,
    pub z: i32,
}

impl CellCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// World-space centre of the cell on the ground plane.
    pub fn to_world(self, tile_size: f32) -> Vec3 {
        Vec3::new(self.x as f32 * tile_size, 0.0, self.z as f32 * tile_size)
    }
}

/// Half-open rectangle of cells: `[min.x, max.x) × [min.z, max.z)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CellRect {
    pub min: CellCoord,
    pub max: CellCoord,
}

impl CellRect {
    pub fn new(min: CellCoord, max: CellCoord) -> Self {
        Self { min, max }
    }

    /// Rectangle with the given origin and dimensions (negative sizes clamp to zero).
    pub fn from_origin(origin: CellCoord, width: i32, height: i32) -> Self {
        Self {
            min: origin,
            max: CellCoord::new(origin.x + width.max(0), origin.z + height.max(0)),
        }
    }

    pub fn width(&self) -> i32 {
        (self.max.x - self.min.x).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.max.z - self.min.z).max(0)
    }

    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.x >= self.min.x && cell.x < self.max.x && cell.z >= self.min.z && cell.z < self.max.z
    }

    /// Iterate every cell, x outer and z inner.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> + use<> {
        let (min, max) = (self.min, self.max);
        (min.x..max.x).flat_map(move |x| (min.z..max.z).map(move |z| CellCoord::new(x, z)))
    }
}

/// Axis-aligned rectangle on the ground plane in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GroundRect {
    pub x1: f32,
    pub z1: f32,
    pub x2: f32,
    pub z2: f32,
}

impl GroundRect {
    pub fn new(x1: f32, z1: f32, x2: f32, z2: f32) -> Self {
        Self { x1, z1, x2, z2 }
    }

    /// Smallest rectangle containing every point.
    pub fn enclosing(points: &[Vec2]) -> Self {
        let mut rect = Self::new(f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
        for p in points {
            rect.x1 = rect.x1.min(p.x);
            rect.z1 = rect.z1.min(p.y);
            rect.x2 = rect.x2.max(p.x);
            rect.z2 = rect.z2.max(p.y);
        }
        rect
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn depth(&self) -> f32 {
        self.z2 - self.z1
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new((self.x1 + self.x2) * 0.5, (self.z1 + self.z2) * 0.5)
    }

    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.x1 && x <= self.x2 && z >= self.z1 && z <= self.z2
    }

    /// Cells touched by this rectangle, rounded outwards to whole tiles.
    pub fn to_cells(&self, tile_size: f32) -> CellRect {
        assert!(tile_size > 0.0, "tile_size must be positive");
        let min = CellCoord::new(
            (self.x1 / tile_size).floor() as i32,
            (self.z1 / tile_size).floor() as i32,
        );
        let max = CellCoord::new(
            ((self.x2 / tile_size).ceil() as i32).max(min.x),
            ((self.z2 / tile_size).ceil() as i32).max(min.z),
        );
        CellRect { min, max }
    }
}

/// One persisted tile: a model placed at a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRecord {
    pub model: Model,
    pub cell: CellCoord,
}

impl TileRecord {
    pub fn new(model: Model, x: i32, z: i32) -> Self {
        Self {
            model,
            cell: CellCoord::new(x, z),
        }
    }
}

/// Viewer state restored across sessions: selected model and camera focus.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SavedPosition {
    pub model: Model,
    pub x: f32,
    pub z: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_rect_dimensions() {
        let rect = CellRect::from_origin(CellCoord::new(-2, 3), 4, 5);
        assert_eq!(rect.width(), 4);
        assert_eq!(rect.height(), 5);
        assert_eq!(rect.area(), 20);
        assert!(rect.contains(CellCoord::new(-2, 3)));
        assert!(rect.contains(CellCoord::new(1, 7)));
        assert!(!rect.contains(CellCoord::new(2, 7)));
        assert!(!rect.contains(CellCoord::new(1, 8)));
    }

    #[test]
    fn cell_rect_iterates_x_outer() {
        let rect = CellRect::from_origin(CellCoord::new(0, 0), 2, 2);
        let cells: Vec<CellCoord> = rect.cells().collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(0, 0),
                CellCoord::new(0, 1),
                CellCoord::new(1, 0),
                CellCoord::new(1, 1),
            ]
        );
    }

    #[test]
    fn empty_rect_has_no_cells() {
        let rect = CellRect::from_origin(CellCoord::new(5, 5), 0, 3);
        assert!(rect.is_empty());
        assert_eq!(rect.cells().count(), 0);
    }

    #[test]
    fn ground_rect_rounds_outwards() {
        let rect = GroundRect::new(-17.0, 3.0, 33.0, 64.0);
        let cells = rect.to_cells(16.0);
        assert_eq!(cells.min, CellCoord::new(-2, 0));
        assert_eq!(cells.max, CellCoord::new(3, 4));
    }

    #[test]
    fn inverted_ground_rect_collapses() {
        let rect = GroundRect::new(40.0, 40.0, -40.0, -40.0);
        let cells = rect.to_cells(16.0);
        assert!(cells.is_empty());
        assert_eq!(cells.min, CellCoord::new(2, 2));
    }

    #[test]
    fn enclosing_orders_corners() {
        let rect = GroundRect::enclosing(&[
            Vec2::new(3.0, -1.0),
            Vec2::new(-5.0, 4.0),
            Vec2::new(1.0, 9.0),
        ]);
        assert_eq!(rect, GroundRect::new(-5.0, -1.0, 3.0, 9.0));
        assert_eq!(rect.center(), Vec2::new(-1.0, 4.0));
    }

    #[test]
    fn cell_world_position() {
        let p = CellCoord::new(2, -3).to_world(16.0);
        assert_eq!(p, Vec3::new(32.0, 0.0, -48.0));
    }
}
