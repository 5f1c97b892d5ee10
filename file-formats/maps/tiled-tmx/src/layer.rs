//! Tile layers and their raw payloads

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec;
use crate::error::Result;
use crate::types::Properties;

/// How the tile ids of a layer are written
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Encoding {
    /// No encoding attribute: one `<tile gid>` element per cell
    #[default]
    None,
    /// Base64 bytes holding little-endian u32 ids
    Base64,
    /// Comma separated decimal ids
    Csv,
    /// Anything else, rejected when the layer is decoded
    Other(String),
}

impl Encoding {
    /// Read the `encoding` attribute value
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            None => Encoding::None,
            Some("base64") => Encoding::Base64,
            Some("csv") => Encoding::Csv,
            Some(other) => Encoding::Other(other.to_string()),
        }
    }

    /// Attribute value as written in a document
    pub fn as_attribute(&self) -> Option<&str> {
        match self {
            Encoding::None => None,
            Encoding::Base64 => Some("base64"),
            Encoding::Csv => Some("csv"),
            Encoding::Other(value) => Some(value),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_attribute().unwrap_or("xml"))
    }
}

/// Compression applied to base64 layer bytes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Compression {
    /// Uncompressed
    #[default]
    None,
    /// Gzip stream
    Gzip,
    /// Zlib stream
    Zlib,
    /// Anything else, rejected when the layer is decoded
    Other(String),
}

impl Compression {
    /// Read the `compression` attribute value
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            None => Compression::None,
            Some("gzip") => Compression::Gzip,
            Some("zlib") => Compression::Zlib,
            Some(other) => Compression::Other(other.to_string()),
        }
    }

    /// Attribute value as written in a document
    pub fn as_attribute(&self) -> Option<&str> {
        match self {
            Compression::None => None,
            Compression::Gzip => Some("gzip"),
            Compression::Zlib => Some("zlib"),
            Compression::Other(value) => Some(value),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_attribute().unwrap_or("none"))
    }
}

/// Undecoded layer content as found in the document
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LayerPayload {
    /// Text content of `<data>` for base64 and csv layers
    Text(String),
    /// One gid token per `<tile>` element
    Tiles(Vec<String>),
}

/// The `<data>` element of a layer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerData {
    /// Declared encoding
    pub encoding: Encoding,
    /// Declared compression
    pub compression: Compression,
    /// Raw content; `None` when the layer has no `<data>` element
    pub payload: Option<LayerPayload>,
}

/// A grid of tile ids
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Layer {
    /// Layer name
    pub name: String,
    /// X offset in tiles
    pub x: i32,
    /// Y offset in tiles
    pub y: i32,
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    /// Width in pixels, computed by [`crate::Map::convert`]
    pub pixel_width: u32,
    /// Height in pixels, computed by [`crate::Map::convert`]
    pub pixel_height: u32,
    /// Opacity between 0.0 and 1.0
    pub opacity: f32,
    /// Visibility flag
    pub visible: bool,
    /// Custom properties
    pub properties: Properties,
    /// Raw payload
    pub data: LayerData,
    #[cfg_attr(feature = "serde", serde(default))]
    pub(crate) decoded: Vec<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub(crate) columns: Vec<Vec<u32>>,
}

impl Default for Layer {
    fn default() -> Self {
        Self {
            name: String::new(),
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            pixel_width: 0,
            pixel_height: 0,
            opacity: 1.0,
            visible: true,
            properties: Properties::new(),
            data: LayerData::default(),
            decoded: Vec::new(),
            columns: Vec::new(),
        }
    }
}

impl Layer {
    /// Decode the raw payload into tile ids
    ///
    /// Leaves the layer untouched on failure. Decoding a layer twice produces
    /// the same ids.
    pub fn decode(&mut self) -> Result<()> {
        let flat = codec::decode_layer_data(&self.name, &self.data, self.width, self.height)?;
        self.columns = codec::to_columns(&flat, self.width, self.height);
        self.decoded = flat;
        log::trace!(
            "Decoded layer '{}' ({}x{}, {})",
            self.name,
            self.width,
            self.height,
            self.data.encoding
        );
        Ok(())
    }

    /// True once [`Layer::decode`] has succeeded
    pub fn is_decoded(&self) -> bool {
        self.width == 0 || self.height == 0 || !self.decoded.is_empty()
    }

    /// Decoded ids in row-major order
    pub fn decoded(&self) -> &[u32] {
        &self.decoded
    }

    /// Decoded ids indexed as `[x][y]`
    pub fn columns(&self) -> &[Vec<u32>] {
        &self.columns
    }

    /// Gid at a cell, `None` outside the layer or before decoding
    pub fn tile_at(&self, x: u32, y: u32) -> Option<u32> {
        self.columns
            .get(x as usize)
            .and_then(|column| column.get(y as usize))
            .copied()
    }

    /// Iterate over decoded rows from top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        self.decoded.chunks(self.width.max(1) as usize)
    }
}
