//! Grid line of sight
//!
//! Walks the cells between two tile coordinates with an integer error term,
//! stepping along exactly one axis per cell, so a walk from `(x0, y0)` to
//! `(x1, y1)` visits `1 + |dx| + |dy|` cells, endpoints included. Visibility
//! checks only visit the cells of the walk that fall inside the layer.

use std::fmt;

use tiled_tmx::Layer;

use crate::collision::CollisionSet;

/// A tile coordinate, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cell {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl Cell {
    /// Create a cell
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance, which orders candidates like the distance itself
    pub fn distance_squared(self, other: Cell) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A walk in canonical order, described by its per-row column spans
///
/// From `(i, j)` steps along the walk, the next step moves along x while
/// `dx - dy - 2 * dy * i + 2 * dx * j` is positive and along y otherwise.
#[derive(Debug, Clone, Copy)]
struct Walk {
    from: Cell,
    dx: i64,
    dy: i64,
    x_step: i64,
    y_step: i64,
}

impl Walk {
    /// The walk always starts from the smaller endpoint
    fn new(a: Cell, b: Cell) -> Self {
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        Self {
            from,
            dx: (i64::from(to.x) - i64::from(from.x)).abs(),
            dy: (i64::from(to.y) - i64::from(from.y)).abs(),
            x_step: if to.x > from.x { 1 } else { -1 },
            y_step: if to.y > from.y { 1 } else { -1 },
        }
    }

    /// First x offset visited on row offset `row`
    fn row_start(&self, row: i64) -> i64 {
        if row == 0 { 0 } else { self.row_end(row - 1) }
    }

    /// Last x offset visited on row offset `row`
    fn row_end(&self, row: i64) -> i64 {
        if self.dy == 0 {
            return self.dx;
        }
        // Smallest i where the error term is no longer positive
        let numerator = i128::from(self.dx - self.dy) + 2 * i128::from(self.dx) * i128::from(row);
        let denominator = 2 * i128::from(self.dy);
        let first_y_step = -((-numerator).div_euclid(denominator));
        first_y_step.clamp(0, i128::from(self.dx)) as i64
    }

    fn cell(&self, column: i64, row: i64) -> Cell {
        Cell::new(
            (i64::from(self.from.x) + self.x_step * column) as i32,
            (i64::from(self.from.y) + self.y_step * row) as i32,
        )
    }

    fn cells(self) -> impl Iterator<Item = Cell> {
        (0..=self.dy).flat_map(move |row| {
            (self.row_start(row)..=self.row_end(row)).map(move |column| self.cell(column, row))
        })
    }
}

/// Offsets in `start..=end` whose coordinate `origin + step * offset` lies in `0..size`
fn clip(origin: i32, step: i64, start: i64, end: i64, size: u32) -> Option<(i64, i64)> {
    if size == 0 {
        return None;
    }
    let origin = i64::from(origin);
    let last = i64::from(size) - 1;
    let (low, high) = if step > 0 {
        (-origin, last - origin)
    } else {
        (origin - last, origin)
    };
    let (first, last) = (start.max(low), end.min(high));
    (first <= last).then_some((first, last))
}

/// Cells visited walking between two cells
///
/// The walk always starts from the smaller endpoint, so swapping the
/// arguments yields the same cells.
pub fn line_cells(a: Cell, b: Cell) -> Vec<Cell> {
    Walk::new(a, b).cells().collect()
}

/// True if no cell on the walk between `a` and `b` holds a collision tile
///
/// Cells outside the layer never block, so only the part of the walk that
/// crosses the layer is visited.
pub fn can_see(layer: &Layer, collision: &CollisionSet, a: Cell, b: Cell) -> bool {
    let walk = Walk::new(a, b);
    let Some((first_row, last_row)) = clip(walk.from.y, walk.y_step, 0, walk.dy, layer.height)
    else {
        return true;
    };

    for row in first_row..=last_row {
        let Some((first_column, last_column)) = clip(
            walk.from.x,
            walk.x_step,
            walk.row_start(row),
            walk.row_end(row),
            layer.width,
        ) else {
            continue;
        };
        for column in first_column..=last_column {
            let cell = walk.cell(column, row);
            match layer.tile_at(cell.x as u32, cell.y as u32) {
                Some(gid) if collision.blocks(gid) => {
                    log::trace!("Line {a} -> {b} blocked at {cell} (gid {gid})");
                    return false;
                }
                _ => {}
            }
        }
    }
    true
}
