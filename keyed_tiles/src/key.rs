//! Translation of tile coordinates into keys understood by the URL cache.

use crate::TileCoord;

/// Opaque key under which the [`crate::TileUrlCache`] knows a tile.
///
/// It has the form `/{z}/x{x}/y{y}`, where the row is counted from the opposite edge of the grid
/// than the one used by [`TileCoord`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct LookupKey(String);

impl LookupKey {
    /// Wrap a key made by a custom [`KeyFunction`].
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LookupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LookupKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<LookupKey> for String {
    fn from(key: LookupKey) -> Self {
        key.0
    }
}

/// Translate a row between the rendering surface's convention and the key space's one.
///
/// Equals `-row - 1`, computed as a bitwise complement so it is defined for every `i64`.
/// Applying it twice gives back the original row.
pub fn flip_row(row: i64) -> i64 {
    !row
}

/// Derive the [`LookupKey`] of a tile.
pub fn derive_key(coord: TileCoord) -> LookupKey {
    LookupKey(format!(
        "/{}/x{}/y{}",
        coord.zoom,
        coord.x,
        flip_row(coord.y)
    ))
}

/// Maps tile coordinates to lookup keys. Must be pure, since the URL cache relies on identical
/// keys for identical tiles.
pub trait KeyFunction {
    fn key(&self, coord: TileCoord) -> LookupKey;
}

impl<F> KeyFunction for F
where
    F: Fn(TileCoord) -> LookupKey,
{
    fn key(&self, coord: TileCoord) -> LookupKey {
        self(coord)
    }
}

/// [`KeyFunction`] using [`derive_key`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FlippedRowKey;

impl KeyFunction for FlippedRowKey {
    fn key(&self, coord: TileCoord) -> LookupKey {
        derive_key(coord)
    }
}
