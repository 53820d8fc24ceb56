use std::collections::HashMap;
use std::sync::Arc;

use egui::Context;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};

use crate::io::resolve::{LoadId, Request, Resolution, resolve_continuously};
use crate::io::runtime::Runtime;
use crate::{LookupKey, Tile, TileState, TileUrlCache};

/// Starts loading tiles on behalf of [`crate::TileImageSource`].
pub trait LoadHandler {
    /// Begin a load attempt of a tile, which is in [`TileState::Loading`]. Must not block.
    fn load(&mut self, tile: Tile, key: LookupKey);

    /// Apply results which arrived since the last call. Returns tiles which got their image
    /// source assigned and are ready for the image loader.
    fn poll(&mut self) -> Vec<Tile> {
        Vec::new()
    }
}

/// Number of keys which resolved to no URL.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FailureCounter(u64);

impl FailureCounter {
    pub fn get(&self) -> u64 {
        self.0
    }

    fn increment(&mut self) {
        self.0 = self.0.saturating_add(1);
    }

    fn reset(&mut self) {
        self.0 = 0;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Number of tiles waiting for the URL cache.
    pub pending: usize,

    /// Number of keys which resolved to no URL since the creation or the last reset.
    pub failures: u64,
}

/// Bridges tile loads to the [`TileUrlCache`]. Lookups run on the IO runtime, while their
/// results are applied to tiles in [`LoadHandler::poll`], on the caller's thread.
pub struct LoadCoordinator {
    /// Lookups to be done by the IO thread.
    request_tx: UnboundedSender<Request>,

    /// Lookups that were answered and should be applied to tiles.
    resolution_rx: UnboundedReceiver<Resolution>,

    pending: HashMap<LoadId, Tile>,
    next_id: LoadId,
    failures: FailureCounter,

    #[allow(dead_code)] // Significant Drop
    runtime: Runtime,
}

impl LoadCoordinator {
    pub fn new(url_cache: Arc<dyn TileUrlCache>, egui_ctx: Context) -> Self {
        let (request_tx, request_rx) = unbounded();
        let (resolution_tx, resolution_rx) = unbounded();

        // This will run concurrently in a loop, doing the lookups and talk with us via channels.
        let runtime = Runtime::new(resolve_continuously(
            url_cache,
            request_rx,
            resolution_tx,
            egui_ctx,
        ));

        Self {
            request_tx,
            resolution_rx,
            pending: HashMap::new(),
            next_id: 0,
            failures: FailureCounter::default(),
            runtime,
        }
    }

    pub fn failures(&self) -> u64 {
        self.failures.get()
    }

    pub fn reset_failures(&mut self) {
        self.failures.reset();
    }

    pub fn stats(&self) -> LoadStats {
        LoadStats {
            pending: self.pending.len(),
            failures: self.failures.get(),
        }
    }

    /// Apply a single resolution to its tile. Returns the tile if it got an image source.
    fn apply(&mut self, resolution: Resolution) -> Option<Tile> {
        let Some(tile) = self.pending.remove(&resolution.id) else {
            log::warn!("Got a resolution of {} nobody asked for.", resolution.key);
            return None;
        };

        match resolution.url {
            Some(url) => {
                log::trace!("{} resolved to {}.", resolution.key, url);
                tile.set_src(url);
                Some(tile)
            }
            None => {
                log::debug!("No URL for {}.", resolution.key);
                tile.set_state(TileState::Error);
                self.failures.increment();
                None
            }
        }
    }
}

impl LoadHandler for LoadCoordinator {
    fn load(&mut self, tile: Tile, key: LookupKey) {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        log::trace!("Requesting {} for {}.", key, tile.coord());
        match self.request_tx.unbounded_send(Request { id, key }) {
            Ok(()) => {
                self.pending.insert(id, tile);
            }
            Err(err) => {
                log::error!("IO thread is dead, {} cannot be loaded.", err.into_inner().key);
                tile.set_state(TileState::Error);
            }
        }
    }

    fn poll(&mut self) -> Vec<Tile> {
        let mut resolved = Vec::new();

        loop {
            match self.resolution_rx.try_next() {
                Ok(Some(resolution)) => resolved.extend(self.apply(resolution)),
                Err(_) => {
                    // Just ignore. It means that nothing new was resolved.
                    break;
                }
                Ok(None) => {
                    if !self.pending.is_empty() {
                        log::error!("IO thread is dead");
                    }
                    break;
                }
            }
        }

        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TileCoord, UrlFuture, derive_key};
    use futures::FutureExt;
    use futures::future::{pending, ready};
    use std::time::Duration;

    fn url_cache(urls: &[(&'static str, &'static str)]) -> Arc<dyn TileUrlCache> {
        let urls: HashMap<_, _> = urls.iter().copied().collect();
        Arc::new(move |key: &LookupKey| -> UrlFuture {
            ready(urls.get(key.as_str()).map(|url| url.to_string())).boxed()
        })
    }

    fn loading_tile(coord: TileCoord) -> Tile {
        let tile = Tile::new(coord);
        tile.set_state(TileState::Loading);
        tile
    }

    async fn poll_until_idle(coordinator: &mut LoadCoordinator) -> Vec<Tile> {
        let mut resolved = Vec::new();
        while coordinator.stats().pending > 0 {
            resolved.extend(coordinator.poll());
            // Need to yield to the runtime for things to move.
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        resolved
    }

    #[tokio::test]
    async fn resolved_url_becomes_tile_source() {
        let _ = env_logger::try_init();

        let coord = TileCoord::new(5, 3, -2);
        let mut coordinator = LoadCoordinator::new(
            url_cache(&[("/5/x3/y1", "http://x/y.png")]),
            Context::default(),
        );

        let tile = loading_tile(coord);
        coordinator.load(tile.clone(), derive_key(coord));
        assert_eq!(1, coordinator.stats().pending);

        let resolved = poll_until_idle(&mut coordinator).await;

        assert_eq!(Some("http://x/y.png".to_owned()), tile.src());
        assert_eq!(TileState::Loading, tile.state());
        assert_eq!(1, resolved.len());
        assert!(resolved[0].same(&tile));
        assert_eq!(0, coordinator.failures());
    }

    #[tokio::test]
    async fn missing_url_fails_the_tile() {
        let _ = env_logger::try_init();

        let coord = TileCoord::new(5, 3, -2);
        let mut coordinator = LoadCoordinator::new(url_cache(&[]), Context::default());

        let tile = loading_tile(coord);
        coordinator.load(tile.clone(), derive_key(coord));

        assert!(poll_until_idle(&mut coordinator).await.is_empty());
        assert_eq!(TileState::Error, tile.state());
        assert_eq!(None, tile.src());
        assert_eq!(1, coordinator.failures());
    }

    #[tokio::test]
    async fn failures_are_counted_and_can_be_reset() {
        let _ = env_logger::try_init();

        let mut coordinator = LoadCoordinator::new(
            url_cache(&[("/1/x0/y0", "http://x/0.png")]),
            Context::default(),
        );

        let coords = [
            TileCoord::new(1, 0, -1),
            TileCoord::new(1, 1, -1),
            TileCoord::new(1, 0, -2),
            TileCoord::new(1, 1, -2),
        ];
        let tiles: Vec<_> = coords.iter().map(|coord| loading_tile(*coord)).collect();
        for tile in &tiles {
            coordinator.load(tile.clone(), derive_key(tile.coord()));
        }

        assert_eq!(1, poll_until_idle(&mut coordinator).await.len());
        assert_eq!(
            LoadStats {
                pending: 0,
                failures: 3
            },
            coordinator.stats()
        );

        coordinator.reset_failures();
        assert_eq!(0, coordinator.failures());
    }

    #[tokio::test]
    async fn tile_waits_for_url_cache_forever() {
        let _ = env_logger::try_init();

        let url_cache: Arc<dyn TileUrlCache> =
            Arc::new(|_: &LookupKey| -> UrlFuture { pending().boxed() });
        let mut coordinator = LoadCoordinator::new(url_cache, Context::default());

        let coord = TileCoord::new(0, 0, -1);
        let tile = loading_tile(coord);
        coordinator.load(tile.clone(), derive_key(coord));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(coordinator.poll().is_empty());
        assert_eq!(TileState::Loading, tile.state());
        assert_eq!(1, coordinator.stats().pending);
        assert_eq!(0, coordinator.failures());
    }

    #[tokio::test]
    async fn tile_fails_at_once_if_io_thread_is_gone() {
        let _ = env_logger::try_init();

        let mut coordinator = LoadCoordinator::new(
            url_cache(&[("/0/x0/y0", "http://x/0.png")]),
            Context::default(),
        );
        coordinator.request_tx.close_channel();

        let coord = TileCoord::new(0, 0, -1);
        let tile = loading_tile(coord);
        coordinator.load(tile.clone(), derive_key(coord));

        assert_eq!(TileState::Error, tile.state());
        assert_eq!(None, tile.src());
        assert_eq!(
            LoadStats {
                pending: 0,
                failures: 0
            },
            coordinator.stats()
        );

        // Nothing comes later either.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(coordinator.poll().is_empty());
        assert_eq!(0, coordinator.failures());
    }

    #[test]
    fn each_resolution_is_applied_once() {
        let coord = TileCoord::new(2, 1, -1);
        let mut coordinator = LoadCoordinator::new(url_cache(&[]), Context::default());

        let tile = loading_tile(coord);
        coordinator.pending.insert(42, tile.clone());

        let resolution = || Resolution {
            id: 42,
            key: derive_key(coord),
            url: None,
        };

        assert!(coordinator.apply(resolution()).is_none());
        assert!(coordinator.apply(resolution()).is_none());
        assert_eq!(TileState::Error, tile.state());
        assert_eq!(1, coordinator.failures());
    }
}
