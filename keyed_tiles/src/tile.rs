use std::cell::RefCell;
use std::rc::Rc;

use crate::TileCoord;

/// Load state of a [`Tile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error,
}

#[derive(Debug)]
struct Inner {
    coord: TileCoord,
    state: TileState,
    src: Option<String>,
}

/// Single image cell of the map, owned by the rendering pipeline.
///
/// This is a handle. Clones refer to the same tile, which lets a pending load hold on to it until
/// the URL cache responds. It is meant to be used from the pipeline's thread only.
#[derive(Debug, Clone)]
pub struct Tile(Rc<RefCell<Inner>>);

impl Tile {
    pub fn new(coord: TileCoord) -> Self {
        Self(Rc::new(RefCell::new(Inner {
            coord,
            state: TileState::Idle,
            src: None,
        })))
    }

    pub fn coord(&self) -> TileCoord {
        self.0.borrow().coord
    }

    pub fn state(&self) -> TileState {
        self.0.borrow().state
    }

    pub fn set_state(&self, state: TileState) {
        self.0.borrow_mut().state = state;
    }

    /// URL of the image, once resolved.
    pub fn src(&self) -> Option<String> {
        self.0.borrow().src.clone()
    }

    /// Set the URL of the image. Loading the image itself is up to the pipeline.
    pub fn set_src(&self, src: impl Into<String>) {
        self.0.borrow_mut().src = Some(src.into());
    }

    /// Whether both handles refer to the same tile.
    pub fn same(&self, other: &Tile) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let tile = Tile::new(TileCoord::new(1, 0, -1));
        let clone = tile.clone();

        assert_eq!(TileState::Idle, clone.state());
        tile.set_state(TileState::Loading);
        tile.set_src("http://x/y.png");

        assert_eq!(TileState::Loading, clone.state());
        assert_eq!(Some("http://x/y.png".to_owned()), clone.src());
        assert!(tile.same(&clone));
        assert!(!tile.same(&Tile::new(tile.coord())));
    }
}
