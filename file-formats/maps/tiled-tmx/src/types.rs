//! Typed map model
//!
//! Everything here is produced by [`crate::parser::TmxParser`]. Layer types
//! live in [`crate::layer`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::layer::Layer;

/// Bit set in a gid when the tile is flipped horizontally
pub const FLIPPED_HORIZONTALLY_FLAG: u32 = 0x8000_0000;
/// Bit set in a gid when the tile is flipped vertically
pub const FLIPPED_VERTICALLY_FLAG: u32 = 0x4000_0000;
/// Bit set in a gid when the tile is flipped diagonally
pub const FLIPPED_DIAGONALLY_FLAG: u32 = 0x2000_0000;

const FLIP_MASK: u32 = FLIPPED_HORIZONTALLY_FLAG | FLIPPED_VERTICALLY_FLAG | FLIPPED_DIAGONALLY_FLAG;

fn pixel_extent(element: &str, attribute: &str, tiles: u32, tile_size: u32) -> Result<u32> {
    tiles.checked_mul(tile_size).ok_or_else(|| {
        Error::invalid_attribute(
            element,
            attribute,
            format!("{tiles} tiles of {tile_size} px overflow the pixel size"),
        )
    })
}

/// Remove the flip flags from a gid, leaving the tile identifier
pub fn strip_flip_flags(gid: u32) -> u32 {
    gid & !FLIP_MASK
}

/// Map projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Orientation {
    /// Square grid, the only geometry this crate interprets
    #[default]
    Orthogonal,
    /// Diamond projection
    Isometric,
    /// Hexagonal cells
    Hexagonal,
    /// Staggered isometric
    Staggered,
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "orthogonal" => Ok(Orientation::Orthogonal),
            "isometric" => Ok(Orientation::Isometric),
            "hexagonal" => Ok(Orientation::Hexagonal),
            "staggered" => Ok(Orientation::Staggered),
            other => Err(format!("unknown orientation '{other}'")),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Orientation::Orthogonal => "orthogonal",
            Orientation::Isometric => "isometric",
            Orientation::Hexagonal => "hexagonal",
            Orientation::Staggered => "staggered",
        };
        f.write_str(name)
    }
}

/// An RGB colour, used as the transparent colour key of images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rgb {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Rgb {
    /// Create a colour from its channels
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Parse `RRGGBB` or `#RRGGBB`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("expected RRGGBB colour, found '{s}'"));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|e| format!("invalid colour '{s}': {e}"))
        };
        Ok(Rgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Custom name/value pairs attached to any entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    /// Create an empty property map
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a property value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Set a property, replacing any earlier value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Merge another map into this one; its values win
    pub fn merge(&mut self, other: Properties) {
        self.0.extend(other.0);
    }

    /// Check whether a property is set
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no properties are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// An image referenced by a tileset or tile
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileImage {
    /// Image id inside the tileset, used by tiles that refer to it
    pub id: Option<u32>,
    /// Image format hint, e.g. `png`
    pub format: Option<String>,
    /// External image file, resolved against the declaring document
    pub source: Option<PathBuf>,
    /// Encoding of inline data (only `base64` is defined)
    pub encoding: Option<String>,
    /// Inline encoded pixel data
    pub content: Option<String>,
    /// Transparent colour key
    pub trans: Option<Rgb>,
    /// Image width in pixels, if declared
    pub width: Option<u32>,
    /// Image height in pixels, if declared
    pub height: Option<u32>,
    /// Custom properties
    pub properties: Properties,
}

impl TileImage {
    /// True if the image carries neither a source nor inline data
    pub fn is_reference(&self) -> bool {
        self.source.is_none() && self.content.is_none()
    }
}

/// A tile with custom data inside a tileset
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tile {
    /// Local id inside the owning tileset
    pub id: u32,
    /// Images attached to this tile
    pub images: Vec<TileImage>,
    /// Custom properties
    pub properties: Properties,
}

/// A collection of tiles sharing a gid range
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tileset {
    /// First global tile id of this tileset
    pub first_gid: u32,
    /// Tileset name
    pub name: String,
    /// Path of the external tileset document, if the tileset was referenced
    pub source: Option<PathBuf>,
    /// Tile width, when it differs from the map's
    pub tile_width: Option<u32>,
    /// Tile height, when it differs from the map's
    pub tile_height: Option<u32>,
    /// Pixels between tiles in the source image
    pub spacing: u32,
    /// Pixels around the tiles in the source image
    pub margin: u32,
    /// Declared tile count
    pub tile_count: Option<u32>,
    /// Declared column count
    pub columns: Option<u32>,
    /// Tileset level images
    pub images: Vec<TileImage>,
    /// Tiles with custom data
    pub tiles: Vec<Tile>,
    /// Custom properties
    pub properties: Properties,
}

impl Tileset {
    /// Global id of a tile of this tileset
    ///
    /// Saturates instead of wrapping; [`Map::convert`] rejects tilesets whose
    /// ids overflow.
    pub fn global_id(&self, tile: &Tile) -> u32 {
        self.first_gid.saturating_add(tile.id)
    }

    /// Find the tile entry with the given local id
    pub fn tile(&self, local_id: u32) -> Option<&Tile> {
        self.tiles.iter().find(|tile| tile.id == local_id)
    }

    /// Tile size in pixels, falling back to the map's
    pub fn tile_size(&self, map_tile_width: u32, map_tile_height: u32) -> (u32, u32) {
        (
            self.tile_width.unwrap_or(map_tile_width),
            self.tile_height.unwrap_or(map_tile_height),
        )
    }
}

/// A single object placed on the map
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MapObject {
    /// Unique object id
    pub id: Option<u32>,
    /// Object name
    pub name: Option<String>,
    /// Type tag
    pub object_type: Option<String>,
    /// X position in pixels
    pub x: f64,
    /// Y position in pixels
    pub y: f64,
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
    /// Tile gid for tile objects
    pub gid: Option<u32>,
    /// Image attached to the object
    pub image_source: Option<String>,
    /// Custom properties
    pub properties: Properties,
}

/// A named group of objects
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectGroup {
    /// Group name
    pub name: String,
    /// X offset in tiles
    pub x: i32,
    /// Y offset in tiles
    pub y: i32,
    /// Width in tiles (usually unused)
    pub width: u32,
    /// Height in tiles (usually unused)
    pub height: u32,
    /// Opacity between 0.0 and 1.0
    pub opacity: f32,
    /// Visibility flag
    pub visible: bool,
    /// Display colour as written by the editor
    pub color: Option<String>,
    /// Objects in document order
    pub objects: Vec<MapObject>,
    /// Custom properties
    pub properties: Properties,
}

impl Default for ObjectGroup {
    fn default() -> Self {
        Self {
            name: String::new(),
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            opacity: 1.0,
            visible: true,
            color: None,
            objects: Vec::new(),
            properties: Properties::new(),
        }
    }
}

/// A complete map
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Map {
    /// Document version
    pub version: String,
    /// Projection
    pub orientation: Orientation,
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
    /// Width in pixels, computed by [`Map::convert`]
    pub pixel_width: u32,
    /// Height in pixels, computed by [`Map::convert`]
    pub pixel_height: u32,
    /// Render order as written by the editor
    pub render_order: Option<String>,
    /// Background colour as written by the editor
    pub background_color: Option<String>,
    /// Tilesets in document order
    pub tilesets: Vec<Tileset>,
    /// Tile layers in document order
    pub layers: Vec<Layer>,
    /// Object groups in document order
    pub object_groups: Vec<ObjectGroup>,
    /// Custom properties
    pub properties: Properties,
    /// Absolute path of the map file, when parsed from disk
    pub source_path: Option<PathBuf>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) named_layers: HashMap<String, usize>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) named_tilesets: HashMap<String, usize>,
}

impl Map {
    /// Compute derived fields
    ///
    /// Fills in pixel sizes of the map and its layers and rebuilds the name
    /// lookups. Only typed fields are read, so calling this again is harmless.
    ///
    /// Fails with [`Error::InvalidAttribute`] when a pixel size or a global
    /// tile id does not fit in 32 bits.
    pub fn convert(&mut self) -> Result<()> {
        self.pixel_width = pixel_extent("map", "width", self.width, self.tile_width)?;
        self.pixel_height = pixel_extent("map", "height", self.height, self.tile_height)?;

        self.named_layers.clear();
        for (index, layer) in self.layers.iter_mut().enumerate() {
            layer.pixel_width = pixel_extent("layer", "width", layer.width, self.tile_width)?;
            layer.pixel_height = pixel_extent("layer", "height", layer.height, self.tile_height)?;
            // First layer wins when names repeat
            self.named_layers.entry(layer.name.clone()).or_insert(index);
        }

        self.named_tilesets.clear();
        for (index, tileset) in self.tilesets.iter().enumerate() {
            for tile in &tileset.tiles {
                let gid = tileset.first_gid.checked_add(tile.id);
                if gid.is_none_or(|gid| gid & FLIP_MASK != 0) {
                    return Err(Error::invalid_attribute(
                        "tile",
                        "id",
                        format!("{} (firstgid {})", tile.id, tileset.first_gid),
                    ));
                }
            }
            self.named_tilesets
                .entry(tileset.name.clone())
                .or_insert(index);
        }
        Ok(())
    }

    /// Decode the payload of every layer
    ///
    /// Each layer decodes independently; with the `parallel` feature they are
    /// decoded on the rayon pool and the first error is returned.
    pub fn decode(&mut self) -> Result<()> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            self.layers.par_iter_mut().try_for_each(Layer::decode)
        }

        #[cfg(not(feature = "parallel"))]
        {
            self.layers.iter_mut().try_for_each(Layer::decode)
        }
    }

    /// Layer by exact name
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.named_layers.get(name).map(|&index| &self.layers[index])
    }

    /// Tileset by exact name
    pub fn tileset(&self, name: &str) -> Option<&Tileset> {
        self.named_tilesets
            .get(name)
            .map(|&index| &self.tilesets[index])
    }

    /// Position and layer of the first layer whose name matches, ignoring case
    pub fn find_layer(&self, name: &str) -> Option<(usize, &Layer)> {
        self.layers
            .iter()
            .enumerate()
            .find(|(_, layer)| layer.name.eq_ignore_ascii_case(name))
    }

    /// Position and group of the first object group whose name matches, ignoring case
    pub fn find_object_group(&self, name: &str) -> Option<(usize, &ObjectGroup)> {
        self.object_groups
            .iter()
            .enumerate()
            .find(|(_, group)| group.name.eq_ignore_ascii_case(name))
    }

    /// Tileset owning a gid: the one with the highest `first_gid` not above it
    pub fn tileset_for_gid(&self, gid: u32) -> Option<&Tileset> {
        let gid = strip_flip_flags(gid);
        if gid == 0 {
            return None;
        }
        self.tilesets
            .iter()
            .filter(|tileset| tileset.first_gid <= gid)
            .max_by_key(|tileset| tileset.first_gid)
    }

    /// Tile entry for a gid, if its tileset declares custom data for it
    pub fn tile_for_gid(&self, gid: u32) -> Option<(&Tileset, &Tile)> {
        let tileset = self.tileset_for_gid(gid)?;
        let tile = tileset.tile(strip_flip_flags(gid) - tileset.first_gid)?;
        Some((tileset, tile))
    }

    /// Gids of all tiles whose property `name` equals `value`
    pub fn gids_with_property(&self, name: &str, value: &str) -> Vec<u32> {
        self.tilesets
            .iter()
            .flat_map(|tileset| {
                tileset
                    .tiles
                    .iter()
                    .filter(move |tile| tile.properties.get(name) == Some(value))
                    .map(move |tile| tileset.global_id(tile))
            })
            .collect()
    }
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} map {}x{} tiles at {}x{} px ({} tilesets, {} layers, {} object groups)",
            self.orientation,
            self.width,
            self.height,
            self.tile_width,
            self.tile_height,
            self.tilesets.len(),
            self.layers.len(),
            self.object_groups.len()
        )
    }
}
