//! Collision tile lookup

use std::collections::BTreeSet;

use tiled_tmx::{Map, strip_flip_flags};

/// Gids that block line of sight
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionSet {
    gids: BTreeSet<u32>,
}

impl CollisionSet {
    /// Collect every tile of every tileset whose property `name` equals `value`
    pub fn from_map(map: &Map, name: &str, value: &str) -> Self {
        let gids: BTreeSet<u32> = map.gids_with_property(name, value).into_iter().collect();
        log::debug!("Collision tiles ({name}={value}): {gids:?}");
        Self { gids }
    }

    /// True if a layer cell holding `gid` blocks; empty cells never do
    pub fn blocks(&self, gid: u32) -> bool {
        let gid = strip_flip_flags(gid);
        gid != 0 && self.gids.contains(&gid)
    }

    /// Number of collision gids
    pub fn len(&self) -> usize {
        self.gids.len()
    }

    /// True if no tile is marked
    pub fn is_empty(&self) -> bool {
        self.gids.is_empty()
    }
}

impl FromIterator<u32> for CollisionSet {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        Self {
            gids: iter.into_iter().map(strip_flip_flags).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiled_tmx::FLIPPED_VERTICALLY_FLAG;

    #[test]
    fn test_blocks() {
        let set: CollisionSet = [3, 9].into_iter().collect();
        assert!(set.blocks(3));
        assert!(set.blocks(9 | FLIPPED_VERTICALLY_FLAG));
        assert!(!set.blocks(4));
        assert!(!set.blocks(0));
    }

    #[test]
    fn test_zero_never_blocks() {
        let set: CollisionSet = [0].into_iter().collect();
        assert!(!set.blocks(0));
    }
}
