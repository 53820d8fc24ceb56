use std::num::NonZeroUsize;
use std::time::Duration;

use crate::{Error, TileGrid};

/// Attribution of the imagery. Typically, this should be displayed somewhere on the top of the
/// map widget.
#[derive(Clone, Default)]
pub struct Attribution {
    pub text: &'static str,
    pub url: &'static str,
    pub logo_light: Option<egui::ImageSource<'static>>,
    pub logo_dark: Option<egui::ImageSource<'static>>,
}

impl std::fmt::Debug for Attribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribution")
            .field("text", &self.text)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

/// Projection the tile grid is laid out in. The source only passes it on to the rendering
/// pipeline, the tile grid itself is the same square pyramid for every projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Projection {
    /// Spherical Mercator, EPSG:3857.
    #[default]
    WebMercator,
    /// Plain longitude and latitude, EPSG:4326.
    Geographic,
}

impl Projection {
    /// EPSG code of the projection, as the rendering pipeline knows it.
    pub fn code(&self) -> &'static str {
        match self {
            Self::WebMercator => "EPSG:3857",
            Self::Geographic => "EPSG:4326",
        }
    }
}

/// Cross-origin policy the pipeline should use when fetching the images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CrossOrigin {
    #[default]
    None,
    Anonymous,
    UseCredentials,
}

/// Controls how the [`crate::TileImageSource`] presents itself to the rendering pipeline.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TileSourceOptions {
    pub projection: Projection,
    pub tile_grid: TileGrid,

    /// Ratio between the image's pixels and the tile grid's pixels, e.g. 2 for retina tiles.
    pub tile_pixel_ratio: f32,

    /// Number of tiles kept by the source.
    pub cache_size: NonZeroUsize,

    pub cross_origin: CrossOrigin,

    /// Repeat the world horizontally.
    pub wrap_x: bool,

    /// Duration of the opacity transition when a tile appears.
    pub transition: Duration,

    #[cfg_attr(feature = "serde", serde(skip))]
    pub attribution: Attribution,
}

/// Just arbitrary value which seemed right.
const DEFAULT_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(size) => size,
    None => unreachable!(),
};

impl Default for TileSourceOptions {
    fn default() -> Self {
        Self {
            projection: Projection::default(),
            tile_grid: TileGrid::default(),
            tile_pixel_ratio: 1.,
            cache_size: DEFAULT_CACHE_SIZE,
            cross_origin: CrossOrigin::default(),
            wrap_x: true,
            transition: Duration::from_millis(250),
            attribution: Attribution::default(),
        }
    }
}

impl TileSourceOptions {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        self.tile_grid.validate()?;

        if !self.tile_pixel_ratio.is_finite() || self.tile_pixel_ratio <= 0. {
            return Err(Error::invalid(
                "tile_pixel_ratio",
                format!("{} is not a positive number", self.tile_pixel_ratio),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(Ok(()), TileSourceOptions::default().validate());
    }

    #[test]
    fn pixel_ratio_must_be_positive() {
        for tile_pixel_ratio in [0., -1., f32::NAN, f32::INFINITY] {
            let options = TileSourceOptions {
                tile_pixel_ratio,
                ..Default::default()
            };
            assert!(matches!(
                options.validate(),
                Err(Error::InvalidOption {
                    option: "tile_pixel_ratio",
                    ..
                })
            ));
        }
    }

    #[test]
    fn projection_codes() {
        assert_eq!("EPSG:3857", Projection::WebMercator.code());
        assert_eq!("EPSG:4326", Projection::Geographic.code());
    }
}
