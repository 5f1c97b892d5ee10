//! Error types for TMX parsing and layer decoding

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for TMX operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading a TMX document
#[derive(Error, Debug)]
pub enum Error {
    /// The map file itself could not be read
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        /// Path of the file being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The markup is not well formed
    #[error("Malformed document{} at line {line}, column {column} (byte {offset}): {message}", display_path(.path))]
    MalformedDocument {
        /// File the markup came from, if known
        path: Option<PathBuf>,
        /// 1-based line of the failure
        line: usize,
        /// 1-based column of the failure
        column: usize,
        /// Byte offset of the failure
        offset: usize,
        /// Parser message
        message: String,
    },

    /// The document declares a version this parser does not read
    #[error("Unsupported map version: expected {expected}, found {found}")]
    UnsupportedVersion {
        /// The supported version string
        expected: &'static str,
        /// The version found in the document
        found: String,
    },

    /// A mandatory element is absent
    #[error("Missing required section: <{0}>")]
    MissingSection(String),

    /// An external tileset could not be loaded
    #[error("Failed to resolve external tileset {}: {source}", .path.display())]
    TilesetResolutionFailed {
        /// Resolved path of the tileset document
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// An attribute value could not be converted to its field type
    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        /// Element carrying the attribute
        element: String,
        /// Attribute name
        attribute: String,
        /// Raw attribute text
        value: String,
    },

    /// Layer encoding or compression is not supported
    #[error("Layer '{layer}': unsupported {kind} '{value}'")]
    UnsupportedEncoding {
        /// Layer name
        layer: String,
        /// Either "encoding" or "compression"
        kind: &'static str,
        /// The offending tag value
        value: String,
    },

    /// Layer payload could not be decoded into tile ids
    #[error("Layer '{layer}': corrupt layer data: {reason}")]
    CorruptLayerData {
        /// Layer name
        layer: String,
        /// What went wrong
        reason: String,
    },

    /// Decoded tile count disagrees with the layer dimensions
    #[error("Layer '{layer}': expected {expected} tiles ({width}x{height}), decoded {found}")]
    LayerSizeMismatch {
        /// Layer name
        layer: String,
        /// Layer width in tiles
        width: u32,
        /// Layer height in tiles
        height: u32,
        /// width * height
        expected: usize,
        /// Number of decoded ids
        found: usize,
    },

    /// An image loader backend failed
    #[error("Failed to load image {source_name}: {reason}")]
    ImageLoadFailed {
        /// Path or description of the image source
        source_name: String,
        /// Backend message
        reason: String,
    },
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" in {}", path.display()),
        None => String::new(),
    }
}

impl Error {
    /// Create a corrupt layer data error
    pub fn corrupt(layer: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CorruptLayerData {
            layer: layer.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid attribute error
    pub fn invalid_attribute(
        element: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Error::InvalidAttribute {
            element: element.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create an image loading error
    pub fn image_load(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Error::ImageLoadFailed {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Attach a file path to a malformed document error
    pub(crate) fn with_path(self, file: impl Into<PathBuf>) -> Self {
        match self {
            Error::MalformedDocument {
                path: None,
                line,
                column,
                offset,
                message,
            } => Error::MalformedDocument {
                path: Some(file.into()),
                line,
                column,
                offset,
                message,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = Error::UnsupportedVersion {
            expected: "1.0",
            found: "1.9".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Unsupported map version: expected 1.0, found 1.9"
        );

        let error = Error::LayerSizeMismatch {
            layer: "Ground".to_string(),
            width: 2,
            height: 2,
            expected: 4,
            found: 3,
        };
        assert_eq!(
            format!("{}", error),
            "Layer 'Ground': expected 4 tiles (2x2), decoded 3"
        );
    }

    #[test]
    fn test_malformed_with_path() {
        let error = Error::MalformedDocument {
            path: None,
            line: 3,
            column: 7,
            offset: 42,
            message: "unexpected end".to_string(),
        }
        .with_path("maps/level.tmx");

        let display = format!("{}", error);
        assert!(display.contains("maps/level.tmx"));
        assert!(display.contains("line 3, column 7"));
    }
}
