use std::sync::Arc;

use egui::Context;
use lru::LruCache;

use crate::coordinator::{LoadCoordinator, LoadHandler, LoadStats};
use crate::key::{FlippedRowKey, KeyFunction};
use crate::options::{Attribution, TileSourceOptions};
use crate::{Error, LookupKey, Tile, TileCoord, TileState, TileUrlCache};

/// Generic tile-image source. Tiles are keyed by `K` and loaded by `L`. It must persist between
/// frames.
pub struct TileImageSource<K, L> {
    options: TileSourceOptions,
    key_function: K,
    load_handler: L,
    tiles: LruCache<TileCoord, Tile>,
}

/// Tile source resolving tile URLs through a [`TileUrlCache`].
pub type UrlCacheTiles = TileImageSource<FlippedRowKey, LoadCoordinator>;

impl<K, L> TileImageSource<K, L>
where
    K: KeyFunction,
    L: LoadHandler,
{
    pub fn new(
        options: TileSourceOptions,
        key_function: K,
        load_handler: L,
    ) -> Result<Self, Error> {
        options.validate()?;
        Ok(Self::assemble(options, key_function, load_handler))
    }

    /// Put the parts together. Options must be already validated.
    fn assemble(options: TileSourceOptions, key_function: K, load_handler: L) -> Self {
        Self {
            tiles: LruCache::new(options.cache_size),
            options,
            key_function,
            load_handler,
        }
    }

    /// Key of the tile, with the world wrapped if enabled.
    pub fn key(&self, coord: TileCoord) -> LookupKey {
        self.key_function.key(self.normalize(coord))
    }

    /// Get the tile, starting its load if it was not requested before. Returns `None` for
    /// coordinates outside the tile grid.
    pub fn tile(&mut self, coord: TileCoord) -> Option<Tile> {
        let coord = self.normalize(coord);
        if !self.options.tile_grid.contains(coord) {
            return None;
        }

        let tile = self.tiles.get_or_insert(coord, || Tile::new(coord)).clone();
        if tile.state() == TileState::Idle {
            self.start(tile.clone());
        }

        Some(tile)
    }

    /// Start a new load attempt of a failed tile. Does nothing for other tiles.
    pub fn retry(&mut self, coord: TileCoord) -> Option<Tile> {
        let coord = self.normalize(coord);
        let tile = self.tiles.get(&coord)?.clone();
        if tile.state() == TileState::Error {
            self.start(tile.clone());
        }
        Some(tile)
    }

    /// Forget all tiles, so they are loaded again when requested.
    pub fn refresh(&mut self) {
        log::debug!("Dropping {} tiles.", self.tiles.len());
        self.tiles.clear();
    }

    /// Apply results of lookups that finished since the last call. Should be called every frame.
    /// Returns tiles with freshly assigned image source.
    pub fn poll(&mut self) -> Vec<Tile> {
        self.load_handler.poll()
    }

    pub fn options(&self) -> &TileSourceOptions {
        &self.options
    }

    pub fn attribution(&self) -> Attribution {
        self.options.attribution.clone()
    }

    pub fn tile_size(&self) -> u32 {
        self.options.tile_grid.tile_size
    }

    pub fn load_handler(&self) -> &L {
        &self.load_handler
    }

    pub fn load_handler_mut(&mut self) -> &mut L {
        &mut self.load_handler
    }

    fn normalize(&self, coord: TileCoord) -> TileCoord {
        if self.options.wrap_x {
            self.options.tile_grid.wrap(coord)
        } else {
            coord
        }
    }

    fn start(&mut self, tile: Tile) {
        let key = self.key_function.key(tile.coord());
        tile.set_state(TileState::Loading);
        self.load_handler.load(tile, key);
    }
}

impl UrlCacheTiles {
    pub fn builder() -> UrlCacheTilesBuilder {
        UrlCacheTilesBuilder::default()
    }

    pub fn stats(&self) -> LoadStats {
        self.load_handler.stats()
    }

    pub fn failures(&self) -> u64 {
        self.load_handler.failures()
    }

    pub fn reset_failures(&mut self) {
        self.load_handler.reset_failures();
    }
}

/// Builds [`UrlCacheTiles`]. The URL cache is mandatory.
#[derive(Default)]
pub struct UrlCacheTilesBuilder {
    url_cache: Option<Arc<dyn TileUrlCache>>,
    options: TileSourceOptions,
}

impl UrlCacheTilesBuilder {
    pub fn url_cache(mut self, url_cache: Arc<dyn TileUrlCache>) -> Self {
        self.url_cache = Some(url_cache);
        self
    }

    pub fn options(mut self, options: TileSourceOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate the configuration and start the lookup thread. Nothing is started when the
    /// configuration is invalid.
    pub fn build(self, egui_ctx: Context) -> Result<UrlCacheTiles, Error> {
        let url_cache = self.url_cache.ok_or(Error::MissingUrlCache)?;
        self.options.validate()?;

        Ok(TileImageSource::assemble(
            self.options,
            FlippedRowKey,
            LoadCoordinator::new(url_cache, egui_ctx),
        ))
    }
}
