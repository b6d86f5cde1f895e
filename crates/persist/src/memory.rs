use std::collections::BTreeMap;
use std::convert::Infallible;

use tilescape_common::{CellCoord, CellRect, Model, SavedPosition, TilePersistence, TileRecord};

/// Records stored in `tiles` whose cell lies in `area`.
pub(crate) fn records_in(
    tiles: &BTreeMap<CellCoord, Model>,
    area: CellRect,
) -> Box<dyn Iterator<Item = TileRecord> + '_> {
    if area.is_empty() {
        return Box::new(std::iter::empty());
    }
    // Keys order by x then z, so the x range is one contiguous span.
    let start = CellCoord::new(area.min.x, i32::MIN);
    let end = CellCoord::new(area.max.x, i32::MIN);
    Box::new(
        tiles
            .range(start..end)
            .filter(move |(cell, _)| area.contains(**cell))
            .map(|(&cell, &model)| TileRecord { model, cell }),
    )
}

/// Apply an upsert: the default model clears the cell.
pub(crate) fn apply_upsert(tiles: &mut BTreeMap<CellCoord, Model>, record: TileRecord) {
    if record.model == Model::default() {
        tiles.remove(&record.cell);
    } else {
        tiles.insert(record.cell, record.model);
    }
}

/// Volatile tile store for tests and headless tools.
#[derive(Debug, Clone, Default)]
pub struct MemoryTiles {
    tiles: BTreeMap<CellCoord, Model>,
    position: SavedPosition,
    queries: usize,
}

impl MemoryTiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `query_tiles` calls served so far.
    pub fn query_count(&self) -> usize {
        self.queries
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl FromIterator<TileRecord> for MemoryTiles {
    fn from_iter<I: IntoIterator<Item = TileRecord>>(iter: I) -> Self {
        let mut store = Self::new();
        for record in iter {
            apply_upsert(&mut store.tiles, record);
        }
        store
    }
}

impl TilePersistence for MemoryTiles {
    type Error = Infallible;

    fn query_tiles(
        &mut self,
        area: CellRect,
    ) -> Result<Box<dyn Iterator<Item = TileRecord> + '_>, Self::Error> {
        self.queries += 1;
        Ok(records_in(&self.tiles, area))
    }

    fn upsert_tile(&mut self, record: TileRecord) -> Result<(), Self::Error> {
        apply_upsert(&mut self.tiles, record);
        Ok(())
    }

    fn saved_position(&self) -> SavedPosition {
        self.position
    }

    fn set_saved_position(&mut self, position: SavedPosition) -> Result<(), Self::Error> {
        self.position = position;
        Ok(())
    }
}
