use crate::types::{CellRect, SavedPosition, TileRecord};

/// Persistence collaborator consulted by the tile store.
///
/// Queries return a lazy sequence that may contain duplicates for the same
/// cell (the last one wins) and carries no ordering guarantee. Cells with no
/// record take the default model.
pub trait TilePersistence {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Every stored record whose cell lies inside `area`.
    fn query_tiles(
        &mut self,
        area: CellRect,
    ) -> Result<Box<dyn Iterator<Item = TileRecord> + '_>, Self::Error>;

    /// Insert or replace the record for `record.cell`.
    fn upsert_tile(&mut self, record: TileRecord) -> Result<(), Self::Error>;

    /// Last saved viewer position, or the default when none was saved.
    fn saved_position(&self) -> SavedPosition;

    fn set_saved_position(&mut self, position: SavedPosition) -> Result<(), Self::Error>;
}
