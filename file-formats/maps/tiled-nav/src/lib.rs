//! Waypoint navigation graphs for Tiled maps
//!
//! Reads the waypoints of a map's `Navigation` object group and links each
//! one to its nearest visible neighbour in each of the four grid directions.
//! Line of sight is blocked by tiles of the `Map` layer whose tile property
//! `collision` is `"1"`. The resulting graph can be written as a property list,
//! JSON or YAML dictionary mapping `"{x,y}"` to comma-joined neighbour keys.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use tiled_nav::{ExportFormat, NavigationOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let graph = tiled_nav::extract_from_file("maps/level1.tmx", &NavigationOptions::default())?;
//! tiled_nav::write_graph(&graph, Path::new("level1.plist"), ExportFormat::Plist)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `parallel`: search neighbours of all waypoints on the rayon thread pool

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use std::path::Path;

pub mod collision;
pub mod error;
pub mod export;
pub mod graph;
pub mod raycast;

pub use collision::CollisionSet;
pub use error::{NavError, RequiredLayer, Result};
pub use export::{ExportFormat, export, to_json, to_plist, to_yaml, write_graph};
pub use graph::{
    LocatedLayers, NavigationExtractor, NavigationGraph, NavigationOptions, NodeKey, Origin,
    Waypoint,
};
pub use raycast::{Cell, can_see, line_cells};

/// Parse and decode a map file, then build its navigation graph
pub fn extract_from_file(path: impl AsRef<Path>, options: &NavigationOptions) -> Result<NavigationGraph> {
    let map = tiled_tmx::parse_and_decode(path)?;
    NavigationExtractor::new(options.clone()).extract(&map)
}
