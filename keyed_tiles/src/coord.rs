/// Identifies the tile in the rendering surface's own tile grid.
///
/// Rows follow the surface's convention: they are counted from the top edge and are negative,
/// starting at `-1` for the topmost row. Columns may fall outside the grid when the world is
/// wrapped horizontally, see [`crate::TileGrid::wrap`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileCoord {
    /// Zoom level, where 0 means no zoom.
    pub zoom: u8,

    /// Column of the tile.
    pub x: i64,

    /// Row of the tile.
    pub y: i64,
}

impl TileCoord {
    pub fn new(zoom: u8, x: i64, y: i64) -> Self {
        Self { zoom, x, y }
    }
}

impl From<(u8, i64, i64)> for TileCoord {
    fn from((zoom, x, y): (u8, i64, i64)) -> Self {
        Self { zoom, x, y }
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}
