//! The spatial grid: a fixed table of cells, the occupied-coordinate set, and
//! the bounded path cache.
//!
//! Coordinates outside the grid are never an error. Every query treats them
//! as absent (`None` / `false`) and every mutation ignores them.
//!
//! # Path cache
//!
//! [`SpatialGrid::find_path`] memoizes successful searches keyed by the exact
//! `(start, end)` pair. The cache is bounded; when full, the entry inserted
//! first is evicted (FIFO, not LRU). Failed searches are never cached. Any
//! call to [`SpatialGrid::set_walkable`] or [`SpatialGrid::set_terrain`]
//! discards the whole cache, so a cached path can never cross a cell that has
//! since become non-walkable. Occupancy changes do not touch the cache.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pathfinding;

// ---------------------------------------------------------------------------
// GridCoord
// ---------------------------------------------------------------------------

/// Integer cell coordinate. `(0, 0)` is the top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

/// Offsets of the four cardinal neighbours, in expansion order.
pub(crate) const CARDINAL_OFFSETS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

impl GridCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to `other`.
    pub fn manhattan(self, other: GridCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The four cardinal neighbours. May lie outside any grid.
    pub fn neighbors(self) -> [GridCoord; 4] {
        CARDINAL_OFFSETS.map(|(dx, dy)| GridCoord::new(self.x + dx, self.y + dy))
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for GridCoord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

// ---------------------------------------------------------------------------
// Biome / Cell
// ---------------------------------------------------------------------------

/// Terrain classification written by the terrain generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biome {
    Water,
    Sand,
    Grass,
    Forest,
    Mountain,
}

impl Biome {
    /// Whether units can stand on this biome by default.
    pub fn is_walkable(self) -> bool {
        !matches!(self, Biome::Water | Biome::Mountain)
    }

    /// Movement cost reported to presentation collaborators.
    pub fn movement_cost(self) -> u32 {
        match self {
            Biome::Sand | Biome::Grass => 1,
            Biome::Forest => 2,
            Biome::Water | Biome::Mountain => 0,
        }
    }
}

/// One grid tile.
///
/// Walkability is read through [`Cell::is_walkable`] and changed only through
/// the grid, which keeps the path cache honest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    walkable: bool,
    pub movement_cost: u32,
    pub biome: Biome,
    pub altitude: f32,
    pub humidity: f32,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            walkable: true,
            movement_cost: Biome::Grass.movement_cost(),
            biome: Biome::Grass,
            altitude: 0.5,
            humidity: 0.5,
        }
    }
}

impl Cell {
    pub fn is_walkable(&self) -> bool {
        self.walkable
    }
}

// ---------------------------------------------------------------------------
// PathCache
// ---------------------------------------------------------------------------

type PathKey = (GridCoord, GridCoord);

/// Bounded FIFO memo of successful path searches.
#[derive(Debug, Clone)]
pub struct PathCache {
    capacity: usize,
    entries: HashMap<PathKey, Vec<GridCoord>>,
    /// Insertion order, oldest first.
    order: VecDeque<PathKey>,
    stats: CacheStats,
}

/// Counters for cache behaviour since the grid was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Times a non-empty cache was dropped.
    pub invalidations: u64,
}

impl PathCache {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "path cache capacity must be at least 1");
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a path for `(start, end)` is cached. Does not count as a hit.
    pub fn contains(&self, start: GridCoord, end: GridCoord) -> bool {
        self.entries.contains_key(&(start, end))
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn lookup(&mut self, key: PathKey) -> Option<Vec<GridCoord>> {
        match self.entries.get(&key) {
            Some(path) => {
                self.stats.hits += 1;
                Some(path.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Insert a path, evicting the oldest entry if the cache is full.
    ///
    /// Returns the evicted key, if any.
    fn insert(&mut self, key: PathKey, path: Vec<GridCoord>) -> Option<PathKey> {
        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = path;
            return None;
        }
        let mut evicted = None;
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                self.stats.evictions += 1;
                tracing::trace!(start = %oldest.0, end = %oldest.1, "path cache eviction");
                evicted = Some(oldest);
            }
        }
        self.entries.insert(key, path);
        self.order.push_back(key);
        evicted
    }

    fn invalidate_all(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        tracing::trace!(dropped = self.entries.len(), "path cache invalidated");
        self.entries.clear();
        self.order.clear();
        self.stats.invalidations += 1;
    }
}

// ---------------------------------------------------------------------------
// SpatialGrid
// ---------------------------------------------------------------------------

/// Fixed-size cell table with occupancy tracking and cached pathfinding.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    width: i32,
    height: i32,
    /// Row-major.
    cells: Vec<Cell>,
    occupied: BTreeSet<GridCoord>,
    cache: PathCache,
}

impl SpatialGrid {
    /// Create a grid of default (walkable grass) cells.
    ///
    /// # Panics
    ///
    /// Panics if a dimension is not positive or `cache_capacity` is zero.
    pub fn new(width: i32, height: i32, cache_capacity: usize) -> Self {
        assert!(
            width > 0 && height > 0,
            "grid dimensions must be positive, got {width}x{height}"
        );
        Self {
            width,
            height,
            cells: vec![Cell::default(); (width as usize) * (height as usize)],
            occupied: BTreeSet::new(),
            cache: PathCache::new(cache_capacity),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, coord: GridCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && coord.x < self.width && coord.y < self.height
    }

    fn index(&self, coord: GridCoord) -> Option<usize> {
        self.in_bounds(coord)
            .then(|| (coord.y as usize) * (self.width as usize) + coord.x as usize)
    }

    /// All coordinates in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| GridCoord::new(x, y)))
    }

    // -- cells --------------------------------------------------------------

    pub fn get_cell(&self, coord: GridCoord) -> Option<&Cell> {
        self.index(coord).map(|i| &self.cells[i])
    }

    pub fn is_walkable(&self, coord: GridCoord) -> bool {
        self.get_cell(coord).is_some_and(Cell::is_walkable)
    }

    /// Set a cell's walkability.
    ///
    /// Returns `true` only if the value changed. Every in-bounds call
    /// invalidates the whole path cache, changed or not.
    pub fn set_walkable(&mut self, coord: GridCoord, walkable: bool) -> bool {
        let Some(i) = self.index(coord) else {
            return false;
        };
        let changed = self.cells[i].walkable != walkable;
        self.cells[i].walkable = walkable;
        self.cache.invalidate_all();
        changed
    }

    /// Overwrite a cell's terrain attributes. Walkability and movement cost
    /// follow the biome. Invalidates the path cache.
    ///
    /// Returns `false` if `coord` is out of bounds.
    pub fn set_terrain(&mut self, coord: GridCoord, biome: Biome, altitude: f32, humidity: f32) -> bool {
        let Some(i) = self.index(coord) else {
            return false;
        };
        self.cells[i] = Cell {
            walkable: biome.is_walkable(),
            movement_cost: biome.movement_cost(),
            biome,
            altitude,
            humidity,
        };
        self.cache.invalidate_all();
        true
    }

    /// Number of walkable cells.
    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|c| c.walkable).count()
    }

    // -- occupancy ----------------------------------------------------------

    pub fn is_occupied(&self, coord: GridCoord) -> bool {
        self.occupied.contains(&coord)
    }

    /// Mark `coord` occupied. Bookkeeping only: walkability is not checked.
    ///
    /// Returns `false` if `coord` is out of bounds.
    pub fn set_occupied(&mut self, coord: GridCoord) -> bool {
        if !self.in_bounds(coord) {
            return false;
        }
        self.occupied.insert(coord);
        true
    }

    /// Release `coord`. Returns whether it was occupied.
    pub fn clear_occupied(&mut self, coord: GridCoord) -> bool {
        self.occupied.remove(&coord)
    }

    /// Release every occupied coordinate.
    pub fn clear_all_occupancy(&mut self) {
        self.occupied.clear();
    }

    /// Occupied coordinates in sorted order.
    pub fn occupied(&self) -> impl Iterator<Item = GridCoord> + '_ {
        self.occupied.iter().copied()
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied.len()
    }

    /// Walkable cells nobody occupies, in row-major order.
    pub fn free_cells(&self) -> impl Iterator<Item = GridCoord> + '_ {
        self.coords()
            .filter(move |&c| self.is_walkable(c) && !self.is_occupied(c))
    }

    // -- pathfinding --------------------------------------------------------

    /// Shortest 4-connected path from `start` to `end`.
    ///
    /// The returned path excludes `start` and includes `end`, in walking
    /// order; `find_path(a, a)` is the empty path. Returns `None` when either
    /// endpoint is out of bounds or non-walkable, when `end` is occupied, or
    /// when no route exists. Only successes are cached.
    pub fn find_path(&mut self, start: GridCoord, end: GridCoord) -> Option<Vec<GridCoord>> {
        if let Some(path) = self.cache.lookup((start, end)) {
            return Some(path);
        }
        let path = pathfinding::find_path(self, start, end)?;
        self.cache.insert((start, end), path.clone());
        Some(path)
    }

    /// Run a search without consulting or filling the cache.
    pub fn find_path_uncached(&self, start: GridCoord, end: GridCoord) -> Option<Vec<GridCoord>> {
        pathfinding::find_path(self, start, end)
    }

    pub fn path_cache(&self) -> &PathCache {
        &self.cache
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
