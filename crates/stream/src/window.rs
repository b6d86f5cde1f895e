use tilescape_common::{CellCoord, CellRect, Model};

/// What changed when the window was moved onto a new rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowChange {
    /// Width or height differ from the previous window.
    pub resized: bool,
    /// The origin cell differs from the previous window.
    pub moved: bool,
}

/// Dense grid of model ids covering a rectangle of cells.
///
/// Cells are stored x-major (`index = dx * height + dz`), which is also the
/// iteration order. Storage is reallocated only when the cell count changes.
#[derive(Debug, Clone, Default)]
pub struct WindowGrid {
    rect: CellRect,
    cells: Vec<Model>,
}

impl WindowGrid {
    /// An empty window at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rect(&self) -> CellRect {
        self.rect
    }

    pub fn origin(&self) -> CellCoord {
        self.rect.min
    }

    /// Move the window onto `rect` and reset every cell to the default model.
    pub fn reposition(&mut self, rect: CellRect) -> WindowChange {
        let change = WindowChange {
            resized: rect.width() != self.rect.width() || rect.height() != self.rect.height(),
            moved: rect.min != self.rect.min,
        };
        let area = rect.area();
        if area != self.cells.len() {
            self.cells = vec![Model::default(); area];
        } else {
            self.cells.fill(Model::default());
        }
        self.rect = CellRect::from_origin(rect.min, rect.width(), rect.height());
        change
    }

    /// Model at `cell`, or `None` when the cell lies outside the window.
    pub fn get(&self, cell: CellCoord) -> Option<Model> {
        self.index(cell).map(|i| self.cells[i])
    }

    /// Store `model` at `cell`. Returns false (and changes nothing) when the
    /// cell lies outside the window.
    pub fn set(&mut self, cell: CellCoord, model: Model) -> bool {
        match self.index(cell) {
            Some(i) => {
                self.cells[i] = model;
                true
            }
            None => false,
        }
    }

    /// Every cell with its model, x outer and z inner.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, Model)> + '_ {
        self.rect.cells().zip(self.cells.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.rect.contains(cell) {
            return None;
        }
        let dx = (cell.x - self.rect.min.x) as usize;
        let dz = (cell.z - self.rect.min.z) as usize;
        Some(dx * self.rect.height() as usize + dz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: i32, z: i32, w: i32, h: i32) -> CellRect {
        CellRect::from_origin(CellCoord::new(x, z), w, h)
    }

    #[test]
    fn new_window_is_empty() {
        let grid = WindowGrid::new();
        assert!(grid.is_empty());
        assert_eq!(grid.get(CellCoord::new(0, 0)), None);
    }

    #[test]
    fn reposition_reports_changes() {
        let mut grid = WindowGrid::new();
        let change = grid.reposition(rect(0, 0, 4, 4));
        assert_eq!(
            change,
            WindowChange {
                resized: true,
                moved: false
            }
        );
        assert_eq!(grid.len(), 16);

        let change = grid.reposition(rect(1, 0, 4, 4));
        assert!(change.moved && !change.resized);

        let change = grid.reposition(rect(1, 0, 2, 8));
        assert!(change.resized && !change.moved);
        assert_eq!(grid.len(), 16);
    }

    #[test]
    fn get_and_set_inside_only() {
        let mut grid = WindowGrid::new();
        grid.reposition(rect(-2, -2, 4, 3));
        assert!(grid.set(CellCoord::new(1, 0), Model::Lava));
        assert_eq!(grid.get(CellCoord::new(1, 0)), Some(Model::Lava));
        assert_eq!(grid.get(CellCoord::new(-2, -2)), Some(Model::Dirt));

        assert!(!grid.set(CellCoord::new(2, 0), Model::Lava));
        assert_eq!(grid.get(CellCoord::new(2, 0)), None);
        assert_eq!(grid.get(CellCoord::new(0, 1)), None);
    }

    #[test]
    fn reposition_clears_cells() {
        let mut grid = WindowGrid::new();
        grid.reposition(rect(0, 0, 2, 2));
        grid.set(CellCoord::new(1, 1), Model::Sand);
        grid.reposition(rect(0, 0, 2, 2));
        assert_eq!(grid.get(CellCoord::new(1, 1)), Some(Model::Dirt));
    }

    #[test]
    fn iteration_matches_storage() {
        let mut grid = WindowGrid::new();
        grid.reposition(rect(10, 20, 3, 2));
        grid.set(CellCoord::new(11, 21), Model::Water);
        grid.set(CellCoord::new(12, 20), Model::Grass);
        for (cell, model) in grid.iter() {
            assert_eq!(grid.get(cell), Some(model));
        }
        let order: Vec<CellCoord> = grid.iter().map(|(c, _)| c).collect();
        assert_eq!(order[0], CellCoord::new(10, 20));
        assert_eq!(order[1], CellCoord::new(10, 21));
        assert_eq!(order[5], CellCoord::new(12, 21));
    }
}
