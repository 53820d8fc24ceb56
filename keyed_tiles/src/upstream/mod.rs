//! Ready-made [`crate::TileUrlCache`] implementations. Using them is optional, any other
//! implementation works with [`crate::UrlCacheTiles`] just as well.

pub mod http;
pub mod memo;

pub use http::{HttpOptions, HttpUrlCache, LookupError};
pub use memo::{MemoOptions, MemoizedUrlCache};
