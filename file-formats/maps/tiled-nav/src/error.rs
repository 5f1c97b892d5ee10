//! Error types for navigation extraction

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tiled_tmx::Orientation;

/// Result type alias for navigation operations
pub type Result<T> = std::result::Result<T, NavError>;

/// A map section the extractor cannot work without
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredLayer {
    /// Object group holding the waypoints
    WaypointGroup(String),
    /// Tile layer holding collision tiles
    CollisionLayer(String),
}

impl fmt::Display for RequiredLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequiredLayer::WaypointGroup(name) => write!(f, "missing \"{name}\" object group"),
            RequiredLayer::CollisionLayer(name) => write!(f, "missing \"{name}\" tile layer"),
        }
    }
}

/// Errors that can occur while building or exporting a navigation graph
#[derive(Error, Debug)]
pub enum NavError {
    /// The waypoint group, the collision layer or both are absent
    #[error("{}", join_missing(.missing))]
    MissingRequiredLayer {
        /// Every absent section, waypoint group first
        missing: Vec<RequiredLayer>,
    },

    /// The map declares a zero tile dimension
    #[error("Invalid tile size {width}x{height}")]
    InvalidTileSize {
        /// Tile width in pixels
        width: u32,
        /// Tile height in pixels
        height: u32,
    },

    /// Waypoints can only be projected onto a square grid
    #[error("Only orthogonal maps can be linked, found {0}")]
    UnsupportedOrientation(Orientation),

    /// The collision layer was not decoded before extraction
    #[error("Layer '{0}' has not been decoded")]
    UndecodedLayer(String),

    /// Reading the map failed
    #[error(transparent)]
    Map(#[from] tiled_tmx::Error),

    /// Serializing the graph failed
    #[error("Failed to export navigation graph as {format}: {reason}")]
    Export {
        /// Target format
        format: &'static str,
        /// Serializer message
        reason: String,
    },

    /// Writing the artifact failed
    #[error("I/O error writing {}: {source}", .path.display())]
    Io {
        /// Output path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

fn join_missing(missing: &[RequiredLayer]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl NavError {
    /// Create an export error
    pub fn export(format: &'static str, reason: impl ToString) -> Self {
        NavError::Export {
            format,
            reason: reason.to_string(),
        }
    }
}
