//! The region/territory grid.
//!
//! The spatial grid is partitioned into square regions of `region_size` cells.
//! Region `(rx, ry)` covers cells `rx * size .. (rx + 1) * size` by
//! `ry * size .. (ry + 1) * size`. Each region is owned by at most one
//! faction entity; ownership is a plain id, never a lifetime dependency.

use std::fmt;

use serde::{Deserialize, Serialize};
use tessera_ecs::entity::EntityId;

use crate::grid::{GridCoord, SpatialGrid, CARDINAL_OFFSETS};
use crate::SimError;

// ---------------------------------------------------------------------------
// RegionCoord
// ---------------------------------------------------------------------------

/// Coordinate in region space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionCoord {
    pub x: i32,
    pub y: i32,
}

impl RegionCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for RegionCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

/// A square block of cells, optionally owned by a faction.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    coord: RegionCoord,
    size: i32,
    /// Global coordinates of the block, row-major by local coordinate.
    cells: Vec<GridCoord>,
    owner: Option<EntityId>,
}

impl Region {
    pub fn coord(&self) -> RegionCoord {
        self.coord
    }

    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    pub fn is_unclaimed(&self) -> bool {
        self.owner.is_none()
    }

    /// Every cell in the block.
    pub fn cells(&self) -> &[GridCoord] {
        &self.cells
    }

    /// Global coordinate of local cell `(lx, ly)`, if inside the block.
    pub fn cell(&self, lx: i32, ly: i32) -> Option<GridCoord> {
        if lx < 0 || ly < 0 || lx >= self.size || ly >= self.size {
            return None;
        }
        Some(self.cells[(ly * self.size + lx) as usize])
    }

    /// Whether the global coordinate lies in this region.
    pub fn contains(&self, coord: GridCoord) -> bool {
        let origin_x = self.coord.x * self.size;
        let origin_y = self.coord.y * self.size;
        (origin_x..origin_x + self.size).contains(&coord.x)
            && (origin_y..origin_y + self.size).contains(&coord.y)
    }
}

/// Record of one ownership mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipChange {
    pub region: RegionCoord,
    pub previous: Option<EntityId>,
    pub owner: Option<EntityId>,
}

// ---------------------------------------------------------------------------
// RegionGrid
// ---------------------------------------------------------------------------

/// Fixed table of regions covering the whole spatial grid.
#[derive(Debug, Clone)]
pub struct RegionGrid {
    region_size: i32,
    width: i32,
    height: i32,
    /// Row-major by region coordinate.
    regions: Vec<Region>,
}

impl RegionGrid {
    /// Partition `grid` into `region_size`-square regions, all unclaimed.
    ///
    /// # Errors
    ///
    /// [`SimError::RegionLayoutMismatch`] unless `region_size` is positive and
    /// divides both grid dimensions exactly.
    pub fn build(grid: &SpatialGrid, region_size: i32) -> Result<Self, SimError> {
        if region_size <= 0 || grid.width() % region_size != 0 || grid.height() % region_size != 0 {
            return Err(SimError::RegionLayoutMismatch {
                width: grid.width(),
                height: grid.height(),
                region_size,
            });
        }

        let width = grid.width() / region_size;
        let height = grid.height() / region_size;
        let mut regions = Vec::with_capacity((width * height) as usize);
        for ry in 0..height {
            for rx in 0..width {
                let mut cells = Vec::with_capacity((region_size * region_size) as usize);
                for ly in 0..region_size {
                    for lx in 0..region_size {
                        cells.push(GridCoord::new(rx * region_size + lx, ry * region_size + ly));
                    }
                }
                regions.push(Region {
                    coord: RegionCoord::new(rx, ry),
                    size: region_size,
                    cells,
                    owner: None,
                });
            }
        }

        Ok(Self {
            region_size,
            width,
            height,
            regions,
        })
    }

    pub fn region_size(&self) -> i32 {
        self.region_size
    }

    /// Width in regions.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Height in regions.
    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    fn index(&self, coord: RegionCoord) -> Option<usize> {
        (coord.x >= 0 && coord.y >= 0 && coord.x < self.width && coord.y < self.height)
            .then(|| (coord.y * self.width + coord.x) as usize)
    }

    pub fn get_region(&self, coord: RegionCoord) -> Option<&Region> {
        self.index(coord).map(|i| &self.regions[i])
    }

    /// The region containing a world cell.
    pub fn region_at_world_pos(&self, coord: GridCoord) -> Option<&Region> {
        if coord.x < 0 || coord.y < 0 {
            return None;
        }
        self.get_region(RegionCoord::new(
            coord.x / self.region_size,
            coord.y / self.region_size,
        ))
    }

    /// All regions, row-major.
    pub fn regions(&self) -> impl Iterator<Item = &Region> + '_ {
        self.regions.iter()
    }

    /// In-bounds cardinal neighbours of `coord`, in N, E, S, W order.
    pub fn cardinal_neighbors(&self, coord: RegionCoord) -> Vec<RegionCoord> {
        CARDINAL_OFFSETS
            .iter()
            .map(|&(dx, dy)| RegionCoord::new(coord.x + dx, coord.y + dy))
            .filter(|&n| self.index(n).is_some())
            .collect()
    }

    // -- ownership ----------------------------------------------------------

    pub fn owner(&self, coord: RegionCoord) -> Option<EntityId> {
        self.get_region(coord).and_then(Region::owner)
    }

    /// Set (or clear) a region's owner.
    ///
    /// Returns `None` if `coord` is out of range; otherwise the change record,
    /// even when the owner is unchanged.
    pub fn set_owner(&mut self, coord: RegionCoord, owner: Option<EntityId>) -> Option<OwnershipChange> {
        let i = self.index(coord)?;
        let previous = std::mem::replace(&mut self.regions[i].owner, owner);
        Some(OwnershipChange {
            region: coord,
            previous,
            owner,
        })
    }

    /// Clear every region owned by `faction`. Returns the cleared coordinates.
    pub fn clear_owner(&mut self, faction: EntityId) -> Vec<RegionCoord> {
        let mut cleared = Vec::new();
        for region in &mut self.regions {
            if region.owner == Some(faction) {
                region.owner = None;
                cleared.push(region.coord);
            }
        }
        cleared
    }

    /// Clear all ownership.
    pub fn clear_all_owners(&mut self) {
        for region in &mut self.regions {
            region.owner = None;
        }
    }

    /// Unowned regions, row-major.
    pub fn unclaimed(&self) -> impl Iterator<Item = RegionCoord> + '_ {
        self.regions
            .iter()
            .filter(|r| r.is_unclaimed())
            .map(Region::coord)
    }

    /// Regions owned by `faction`, row-major.
    pub fn owned_by(&self, faction: EntityId) -> impl Iterator<Item = RegionCoord> + '_ {
        self.regions
            .iter()
            .filter(move |r| r.owner == Some(faction))
            .map(Region::coord)
    }
}
