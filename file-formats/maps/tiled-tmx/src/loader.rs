//! Tile image loading
//!
//! Pixel decoding is left to an [`ImageLoader`] backend. [`load_tiles`] walks
//! the tilesets of a map and asks the backend for every image, indexing the
//! results by gid. With the `image` feature enabled [`RgbaImageLoader`]
//! provides a backend built on the `image` crate.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};
use crate::types::{Map, Rgb, TileImage, Tileset};

/// How tiles are laid out in a tileset image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripLayout {
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
    /// Pixels around the tiles
    pub margin: u32,
    /// Pixels between tiles
    pub spacing: u32,
}

/// Backend that turns image sources into images
pub trait ImageLoader {
    /// Backend image type
    type Image: Clone;

    /// Load a whole image file
    fn load_image(&mut self, path: &Path, colorkey: Option<Rgb>) -> Result<Self::Image>;

    /// Load an image from encoded bytes, e.g. inline tileset data
    fn load_image_from_bytes(&mut self, bytes: &[u8], colorkey: Option<Rgb>) -> Result<Self::Image>;

    /// Cut a tileset image into tiles
    ///
    /// Tiles are returned row by row, left to right, starting at the margin
    /// and stepping by tile size plus spacing.
    fn load_tiled_image_strip(
        &mut self,
        path: &Path,
        layout: StripLayout,
        colorkey: Option<Rgb>,
    ) -> Result<Vec<Self::Image>>;
}

/// A loaded tile image with its drawing offset
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedTile<I> {
    /// Horizontal offset to add to the cell's pixel position
    pub offset_x: i32,
    /// Vertical offset to add to the cell's pixel position; negative for
    /// tiles taller than the map grid so they extend upwards
    pub offset_y: i32,
    /// The image
    pub image: I,
}

/// A decoded map together with its tile images
#[derive(Debug, Clone)]
pub struct LoadedMap<I> {
    /// The decoded map
    pub map: Map,
    /// Tile images keyed by gid
    pub tiles: BTreeMap<u32, IndexedTile<I>>,
}

impl<I> LoadedMap<I> {
    /// Image for a gid
    pub fn tile(&self, gid: u32) -> Option<&IndexedTile<I>> {
        self.tiles.get(&crate::types::strip_flip_flags(gid))
    }
}

/// Load every tileset image of `map` and index the tiles by gid
///
/// Later tilesets overwrite earlier entries when their gid ranges overlap.
pub fn load_tiles<L: ImageLoader>(
    map: &Map,
    loader: &mut L,
) -> Result<BTreeMap<u32, IndexedTile<L::Image>>> {
    let mut tiles = BTreeMap::new();
    for tileset in &map.tilesets {
        load_tileset(map, tileset, loader, &mut tiles)?;
    }
    Ok(tiles)
}

fn load_tileset<L: ImageLoader>(
    map: &Map,
    tileset: &Tileset,
    loader: &mut L,
    tiles: &mut BTreeMap<u32, IndexedTile<L::Image>>,
) -> Result<()> {
    let (tile_width, tile_height) = tileset.tile_size(map.tile_width, map.tile_height);
    let offset_y = -(tile_height.saturating_sub(map.tile_height) as i32);
    let layout = StripLayout {
        tile_width,
        tile_height,
        margin: tileset.margin,
        spacing: tileset.spacing,
    };

    // Inline images are addressed by id from the tiles below
    let mut indexed_images: HashMap<u32, L::Image> = HashMap::new();
    for image in &tileset.images {
        if let Some(source) = &image.source {
            let parts = loader.load_tiled_image_strip(source, layout, image.trans)?;
            log::debug!(
                "Tileset '{}': {} tiles from {}",
                tileset.name,
                parts.len(),
                source.display()
            );
            for (index, part) in (0u32..).zip(parts) {
                let gid = tileset.first_gid.checked_add(index).ok_or_else(|| {
                    Error::image_load(
                        source.display().to_string(),
                        format!("strip tile {index} overflows the gid range"),
                    )
                })?;
                tiles.insert(
                    gid,
                    IndexedTile {
                        offset_x: 0,
                        offset_y,
                        image: part,
                    },
                );
            }
        } else if let Some(id) = image.id {
            let loaded = load_inline(loader, image)?;
            indexed_images.insert(id, loaded);
        }
    }

    for tile in &tileset.tiles {
        let gid = tileset.global_id(tile);
        for image in &tile.images {
            let loaded = if image.is_reference() {
                let id = image.id.ok_or_else(|| {
                    Error::image_load(
                        format!("tile {gid} of '{}'", tileset.name),
                        "image has no source, data or id",
                    )
                })?;
                indexed_images.get(&id).cloned().ok_or_else(|| {
                    Error::image_load(
                        format!("tile {gid} of '{}'", tileset.name),
                        format!("no tileset image with id {id}"),
                    )
                })?
            } else if let Some(source) = &image.source {
                loader.load_image(source, image.trans)?
            } else {
                load_inline(loader, image)?
            };
            tiles.insert(
                gid,
                IndexedTile {
                    offset_x: 0,
                    offset_y: 0,
                    image: loaded,
                },
            );
        }
    }
    Ok(())
}

fn load_inline<L: ImageLoader>(loader: &mut L, image: &TileImage) -> Result<L::Image> {
    let content = image.content.as_deref().unwrap_or_default();
    match image.encoding.as_deref() {
        Some("base64") => {
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| Error::image_load("inline image", e))?;
            loader.load_image_from_bytes(&bytes, image.trans)
        }
        other => Err(Error::image_load(
            "inline image",
            format!("unsupported image encoding '{}'", other.unwrap_or("none")),
        )),
    }
}

#[cfg(feature = "image")]
pub use rgba::RgbaImageLoader;

#[cfg(feature = "image")]
mod rgba {
    use super::{ImageLoader, StripLayout};
    use crate::error::{Error, Result};
    use crate::types::Rgb;
    use image::{Rgba, RgbaImage};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    /// [`ImageLoader`] producing `image::RgbaImage` tiles
    ///
    /// Decoded files are cached by path for the lifetime of the loader, so a
    /// tileset image shared by several tilesets is read once.
    #[derive(Debug, Default)]
    pub struct RgbaImageLoader {
        cache: HashMap<PathBuf, RgbaImage>,
    }

    impl RgbaImageLoader {
        /// Create a loader with an empty cache
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of cached files
        pub fn cached(&self) -> usize {
            self.cache.len()
        }

        fn open(&mut self, path: &Path) -> Result<&RgbaImage> {
            if !self.cache.contains_key(path) {
                log::debug!("Decoding image {}", path.display());
                let decoded = image::open(path)
                    .map_err(|e| Error::image_load(path.display().to_string(), e))?
                    .to_rgba8();
                self.cache.insert(path.to_path_buf(), decoded);
            }
            self.cache
                .get(path)
                .ok_or_else(|| Error::image_load(path.display().to_string(), "cache miss"))
        }
    }

    fn apply_colorkey(image: &mut RgbaImage, colorkey: Option<Rgb>) {
        let Some(key) = colorkey else {
            return;
        };
        for pixel in image.pixels_mut() {
            let Rgba([r, g, b, _]) = *pixel;
            if (r, g, b) == (key.r, key.g, key.b) {
                *pixel = Rgba([r, g, b, 0]);
            }
        }
    }

    impl ImageLoader for RgbaImageLoader {
        type Image = RgbaImage;

        fn load_image(&mut self, path: &Path, colorkey: Option<Rgb>) -> Result<RgbaImage> {
            let mut image = self.open(path)?.clone();
            apply_colorkey(&mut image, colorkey);
            Ok(image)
        }

        fn load_image_from_bytes(&mut self, bytes: &[u8], colorkey: Option<Rgb>) -> Result<RgbaImage> {
            let mut image = image::load_from_memory(bytes)
                .map_err(|e| Error::image_load("inline image", e))?
                .to_rgba8();
            apply_colorkey(&mut image, colorkey);
            Ok(image)
        }

        fn load_tiled_image_strip(
            &mut self,
            path: &Path,
            layout: StripLayout,
            colorkey: Option<Rgb>,
        ) -> Result<Vec<RgbaImage>> {
            if layout.tile_width == 0 || layout.tile_height == 0 {
                return Err(Error::image_load(
                    path.display().to_string(),
                    "tile size must be non-zero",
                ));
            }
            let source = self.open(path)?;
            let (width, height) = source.dimensions();
            let step_x = (layout.tile_width + layout.spacing) as usize;
            let step_y = (layout.tile_height + layout.spacing) as usize;

            // Only whole tiles are cut
            let last_x = width.saturating_sub(layout.tile_width);
            let last_y = height.saturating_sub(layout.tile_height);

            let mut parts = Vec::new();
            for y in (layout.margin..=last_y).step_by(step_y) {
                for x in (layout.margin..=last_x).step_by(step_x) {
                    let mut part =
                        image::imageops::crop_imm(source, x, y, layout.tile_width, layout.tile_height)
                            .to_image();
                    apply_colorkey(&mut part, colorkey);
                    parts.push(part);
                }
            }
            Ok(parts)
        }
    }

}
