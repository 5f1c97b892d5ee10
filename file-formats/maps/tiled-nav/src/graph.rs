//! Navigation graph extraction
//!
//! Every waypoint of the navigation object group is linked to at most four
//! neighbours: the nearest waypoint in the same row to the right and to the
//! left, and the nearest in the same column above and below, each kept only
//! if no collision tile lies between them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use tiled_tmx::{Layer, Map, MapObject, Orientation};

use crate::collision::CollisionSet;
use crate::error::{NavError, RequiredLayer, Result};
use crate::raycast::{Cell, can_see};

/// Where output coordinates start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    /// Row 0 is the bottom row, as used by cocos2d style engines
    #[default]
    BottomLeft,
    /// Row 0 is the top row, as in the map document
    TopLeft,
}

impl FromStr for Origin {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bottom-left" | "bottomleft" => Ok(Origin::BottomLeft),
            "top-left" | "topleft" => Ok(Origin::TopLeft),
            other => Err(format!("unknown origin '{other}'")),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::BottomLeft => f.write_str("bottom-left"),
            Origin::TopLeft => f.write_str("top-left"),
        }
    }
}

/// Extraction settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationOptions {
    /// Object group holding the waypoints, matched ignoring case
    pub waypoint_group: String,
    /// Tile layer checked for collisions, matched ignoring case
    pub collision_layer: String,
    /// Tile property marking collision tiles
    pub collision_property: String,
    /// Property value marking collision tiles
    pub collision_value: String,
    /// Coordinate origin of the output keys
    pub origin: Origin,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            waypoint_group: "Navigation".to_string(),
            collision_layer: "Map".to_string(),
            collision_property: "collision".to_string(),
            collision_value: "1".to_string(),
            origin: Origin::BottomLeft,
        }
    }
}

/// Key of a graph node, printed as `{x,y}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    /// Column
    pub x: i32,
    /// Row in the output origin
    pub y: i32,
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{},{}}}", self.x, self.y)
    }
}

/// Waypoints and their reachable neighbours
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationGraph {
    nodes: BTreeMap<NodeKey, Vec<NodeKey>>,
}

impl NavigationGraph {
    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Neighbours of a node in rule order: next-x, next-y, prev-x, prev-y
    pub fn neighbours(&self, key: NodeKey) -> Option<&[NodeKey]> {
        self.nodes.get(&key).map(Vec::as_slice)
    }

    /// Iterate over nodes in key order
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &[NodeKey])> {
        self.nodes.iter().map(|(key, value)| (*key, value.as_slice()))
    }

    /// The graph as `"{x,y}"` → comma-joined neighbour keys
    pub fn to_string_map(&self) -> BTreeMap<String, String> {
        self.nodes
            .iter()
            .map(|(key, neighbours)| {
                let joined = neighbours
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                (key.to_string(), joined)
            })
            .collect()
    }

    /// Insert a node, returning the neighbours it replaced
    fn insert(&mut self, key: NodeKey, neighbours: Vec<NodeKey>) -> Option<Vec<NodeKey>> {
        self.nodes.insert(key, neighbours)
    }
}

/// A waypoint projected onto the tile grid
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    /// Position in the object group
    pub index: usize,
    /// Object name, if any
    pub name: Option<String>,
    /// Tile coordinate
    pub cell: Cell,
}

/// Positions of the sections extraction works on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedLayers {
    /// Index of the waypoint object group
    pub waypoint_group: usize,
    /// Index of the collision tile layer
    pub collision_layer: usize,
}

/// Search directions, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    NextX,
    NextY,
    PrevX,
    PrevY,
}

impl Direction {
    const ALL: [Direction; 4] = [
        Direction::NextX,
        Direction::NextY,
        Direction::PrevX,
        Direction::PrevY,
    ];

    /// Next-y is up the screen, towards smaller row numbers
    fn accepts(self, target: Cell, candidate: Cell) -> bool {
        match self {
            Direction::NextX => candidate.y == target.y && candidate.x > target.x,
            Direction::PrevX => candidate.y == target.y && candidate.x < target.x,
            Direction::NextY => candidate.x == target.x && candidate.y < target.y,
            Direction::PrevY => candidate.x == target.x && candidate.y > target.y,
        }
    }
}

/// Builds a [`NavigationGraph`] from a decoded map
///
/// # Examples
///
/// ```no_run
/// use tiled_nav::{NavigationExtractor, NavigationOptions};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let map = tiled_tmx::parse_and_decode("maps/level1.tmx")?;
/// let graph = NavigationExtractor::new(NavigationOptions::default()).extract(&map)?;
/// println!("{} navigation nodes", graph.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct NavigationExtractor {
    options: NavigationOptions,
}

impl NavigationExtractor {
    /// Create an extractor
    pub fn new(options: NavigationOptions) -> Self {
        Self { options }
    }

    /// The extraction settings
    pub fn options(&self) -> &NavigationOptions {
        &self.options
    }

    /// Find the waypoint group and collision layer
    ///
    /// Both are looked up before failing so that every absent section is
    /// reported at once.
    pub fn locate(&self, map: &Map) -> Result<LocatedLayers> {
        let group = map
            .find_object_group(&self.options.waypoint_group)
            .map(|(index, _)| index);
        let layer = map
            .find_layer(&self.options.collision_layer)
            .map(|(index, _)| index);

        match (group, layer) {
            (Some(waypoint_group), Some(collision_layer)) => Ok(LocatedLayers {
                waypoint_group,
                collision_layer,
            }),
            (group, layer) => {
                let mut missing = Vec::new();
                if group.is_none() {
                    missing.push(RequiredLayer::WaypointGroup(
                        self.options.waypoint_group.clone(),
                    ));
                }
                if layer.is_none() {
                    missing.push(RequiredLayer::CollisionLayer(
                        self.options.collision_layer.clone(),
                    ));
                }
                Err(NavError::MissingRequiredLayer { missing })
            }
        }
    }

    /// Project the objects of the waypoint group onto the tile grid
    pub fn waypoints(&self, map: &Map) -> Result<Vec<Waypoint>> {
        let located = self.locate(map)?;
        let group = &map.object_groups[located.waypoint_group];
        project(map, &group.objects)
    }

    /// Build the navigation graph of a decoded map
    ///
    /// Only orthogonal maps can be linked.
    pub fn extract(&self, map: &Map) -> Result<NavigationGraph> {
        let located = self.locate(map)?;
        if map.orientation != Orientation::Orthogonal {
            return Err(NavError::UnsupportedOrientation(map.orientation));
        }
        let layer = &map.layers[located.collision_layer];
        if !layer.is_decoded() {
            return Err(NavError::UndecodedLayer(layer.name.clone()));
        }

        let waypoints = project(map, &map.object_groups[located.waypoint_group].objects)?;
        let collision = CollisionSet::from_map(
            map,
            &self.options.collision_property,
            &self.options.collision_value,
        );
        log::info!(
            "Linking {} waypoints over layer '{}' with {} collision tiles",
            waypoints.len(),
            layer.name,
            collision.len()
        );

        let linked = link_all(&waypoints, layer, &collision);

        let mut graph = NavigationGraph::default();
        for (waypoint, neighbours) in waypoints.iter().zip(linked) {
            let key = self.key(map, waypoint.cell);
            let neighbours = neighbours
                .into_iter()
                .map(|cell| self.key(map, cell))
                .collect();
            if graph.insert(key, neighbours).is_some() {
                log::warn!(
                    "Waypoint {} ({}) shares cell {key} with an earlier waypoint and replaces it",
                    waypoint.index,
                    waypoint.name.as_deref().unwrap_or("unnamed")
                );
            }
        }

        log::info!("Navigation graph has {} nodes", graph.len());
        Ok(graph)
    }

    fn key(&self, map: &Map, cell: Cell) -> NodeKey {
        let y = match self.options.origin {
            Origin::TopLeft => cell.y,
            Origin::BottomLeft => (i64::from(map.height) - i64::from(cell.y) - 1)
                .clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
        };
        NodeKey { x: cell.x, y }
    }
}

fn project(map: &Map, objects: &[MapObject]) -> Result<Vec<Waypoint>> {
    if map.tile_width == 0 || map.tile_height == 0 {
        return Err(NavError::InvalidTileSize {
            width: map.tile_width,
            height: map.tile_height,
        });
    }
    let tile_width = f64::from(map.tile_width);
    let tile_height = f64::from(map.tile_height);

    Ok(objects
        .iter()
        .enumerate()
        .map(|(index, object)| Waypoint {
            index,
            name: object.name.clone(),
            cell: Cell::new(
                (object.x / tile_width).trunc() as i32,
                (object.y / tile_height).trunc() as i32,
            ),
        })
        .collect())
}

fn link_all(waypoints: &[Waypoint], layer: &Layer, collision: &CollisionSet) -> Vec<Vec<Cell>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        waypoints
            .par_iter()
            .map(|waypoint| link(waypoints, waypoint.cell, layer, collision))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        waypoints
            .iter()
            .map(|waypoint| link(waypoints, waypoint.cell, layer, collision))
            .collect()
    }
}

/// Visible neighbours of one waypoint, in direction order
fn link(waypoints: &[Waypoint], target: Cell, layer: &Layer, collision: &CollisionSet) -> Vec<Cell> {
    Direction::ALL
        .iter()
        .filter_map(|&direction| {
            let candidate = nearest(waypoints, target, direction)?;
            if can_see(layer, collision, target, candidate) {
                Some(candidate)
            } else {
                log::debug!("{direction:?} of {target}: {candidate} is not visible");
                None
            }
        })
        .collect()
}

/// Nearest accepted candidate; on equal distance the earlier waypoint wins
fn nearest(waypoints: &[Waypoint], target: Cell, direction: Direction) -> Option<Cell> {
    let mut best: Option<(i64, Cell)> = None;
    for cell in waypoints
        .iter()
        .map(|waypoint| waypoint.cell)
        .filter(|&cell| direction.accepts(target, cell))
    {
        let distance = target.distance_squared(cell);
        if best.is_none_or(|(best_distance, _)| distance < best_distance) {
            best = Some((distance, cell));
        }
    }
    best.map(|(_, cell)| cell)
}
