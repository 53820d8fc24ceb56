use crate::{Error, TileCoord};

/// Highest zoom level a [`TileGrid`] can be configured with.
pub const MAX_ZOOM: u8 = 30;

/// Square tile pyramid of the rendering surface: one tile at zoom 0, four at zoom 1, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileGrid {
    /// Size of each tile, should be a multiple of 256.
    pub tile_size: u32,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self {
            tile_size: 256,
            min_zoom: 0,
            // Mapnik supports zooms up to 19.
            // https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames#Zoom_levels
            max_zoom: 19,
        }
    }
}

impl TileGrid {
    /// Number of columns (and rows) at given zoom level.
    pub fn columns(zoom: u8) -> i64 {
        1 << zoom.min(MAX_ZOOM)
    }

    /// Whether the tile exists in this grid. Rows are valid from `-1` (top) down to
    /// `-columns`.
    pub fn contains(&self, coord: TileCoord) -> bool {
        let columns = Self::columns(coord.zoom);
        (self.min_zoom..=self.max_zoom).contains(&coord.zoom)
            && (0..columns).contains(&coord.x)
            && (-columns..0).contains(&coord.y)
    }

    /// Bring the column back into the grid, as the world repeats horizontally.
    pub fn wrap(&self, coord: TileCoord) -> TileCoord {
        TileCoord {
            x: coord.x.rem_euclid(Self::columns(coord.zoom)),
            ..coord
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.tile_size == 0 || self.tile_size % 256 != 0 {
            return Err(Error::invalid(
                "tile_size",
                format!("{} is not a multiple of 256", self.tile_size),
            ));
        }

        if self.max_zoom > MAX_ZOOM {
            return Err(Error::invalid(
                "max_zoom",
                format!("{} exceeds {MAX_ZOOM}", self.max_zoom),
            ));
        }

        if self.min_zoom > self.max_zoom {
            return Err(Error::invalid(
                "min_zoom",
                format!("{} is above max_zoom {}", self.min_zoom, self.max_zoom),
            ));
        }

        Ok(())
    }
}
