//! Parser for Tiled TMX map documents
//!
//! This crate reads version 1.0 TMX files as written by the Tiled map editor
//! into a typed model, decodes the tile layers and optionally loads the tile
//! images through a pluggable backend.
//!
//! Reading happens in three stages, each available on its own:
//!
//! 1. [`parse`]: markup → typed [`Map`] with raw layer payloads
//! 2. [`parse_and_decode`]: additionally decodes every layer into gids
//! 3. [`parse_decode_and_load`]: additionally loads tile images through an
//!    [`ImageLoader`]
//!
//! ## Features
//!
//! - External tilesets (`.tsx`) resolved relative to the referencing file
//! - Layer data as csv, base64, base64+gzip, base64+zlib or `<tile>` elements
//! - Custom properties on maps, tilesets, tiles, layers, groups and objects
//! - `parallel`: decode layers on the rayon thread pool
//! - `serde`: serialize the model
//! - `image`: [`RgbaImageLoader`] backend built on the `image` crate
//!
//! Only orthogonal maps are interpreted; other orientations are parsed and
//! passed through.
//!
//! ## Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let map = tiled_tmx::parse_and_decode("maps/level1.tmx")?;
//! println!("{map}");
//!
//! let ground = map.layer("Ground").ok_or("no ground layer")?;
//! for row in ground.rows() {
//!     println!("{row:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## References
//!
//! - <https://doc.mapeditor.org/en/stable/reference/tmx-map-format/>

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::path::Path;

pub mod codec;
pub mod document;
pub mod error;
pub mod layer;
pub mod loader;
pub mod parser;
pub mod types;
pub mod version;

pub use error::{Error, Result};
pub use layer::{Compression, Encoding, Layer, LayerData, LayerPayload};
pub use loader::{ImageLoader, IndexedTile, LoadedMap, StripLayout, load_tiles};
pub use parser::TmxParser;
pub use types::{
    FLIPPED_DIAGONALLY_FLAG, FLIPPED_HORIZONTALLY_FLAG, FLIPPED_VERTICALLY_FLAG, Map, MapObject,
    ObjectGroup, Orientation, Properties, Rgb, Tile, TileImage, Tileset, strip_flip_flags,
};
pub use version::TmxVersion;

#[cfg(feature = "image")]
pub use loader::RgbaImageLoader;

/// Parse a map file without decoding its layers
pub fn parse(path: impl AsRef<Path>) -> Result<Map> {
    TmxParser::new().parse(path)
}

/// Parse a map file and decode every layer
pub fn parse_and_decode(path: impl AsRef<Path>) -> Result<Map> {
    TmxParser::new().parse_and_decode(path)
}

/// Parse a map file, decode every layer and load all tile images
pub fn parse_decode_and_load<L: ImageLoader>(
    path: impl AsRef<Path>,
    loader: &mut L,
) -> Result<LoadedMap<L::Image>> {
    TmxParser::new().parse_decode_and_load(path, loader)
}
