#![doc = include_str!("../README.md")]
#![deny(clippy::unwrap_used, rustdoc::broken_intra_doc_links)]

mod coord;
mod coordinator;
mod error;
mod grid;
mod io;
mod key;
mod options;
mod resolver;
mod source;
mod tile;
pub mod upstream;

pub use coord::TileCoord;
pub use coordinator::{FailureCounter, LoadCoordinator, LoadHandler, LoadStats};
pub use error::Error;
pub use grid::{MAX_ZOOM, TileGrid};
pub use key::{FlippedRowKey, KeyFunction, LookupKey, derive_key, flip_row};
pub use options::{Attribution, CrossOrigin, Projection, TileSourceOptions};
pub use resolver::{CallbackUrlCache, Responder, TileUrlCache, UrlFuture, url_future};
pub use source::{TileImageSource, UrlCacheTiles, UrlCacheTilesBuilder};
pub use tile::{Tile, TileState};
