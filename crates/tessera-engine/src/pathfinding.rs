//! Grid A* search.
//!
//! Four-directional moves with uniform step cost 1 and a Manhattan heuristic.
//! Cells that are non-walkable or occupied are never expanded. Ties on f-cost
//! are broken by insertion order.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::grid::{GridCoord, SpatialGrid};

/// Node in the A* open set
#[derive(Debug, Clone, Copy)]
struct PathNode {
    coord: GridCoord,
    f_cost: u32, // g_cost + heuristic
    seq: u64,
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.f_cost == other.f_cost && self.seq == other.seq
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; earlier pushes win ties.
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a shortest path from `start` to `goal`.
///
/// The result excludes `start` and includes `goal`. `None` if either endpoint
/// is non-walkable (or out of bounds), if `goal` is occupied, or if `goal` is
/// unreachable. Occupancy of `start` itself is ignored so that an entity can
/// plan from the cell it stands on.
pub fn find_path(grid: &SpatialGrid, start: GridCoord, goal: GridCoord) -> Option<Vec<GridCoord>> {
    if !grid.is_walkable(start) || !grid.is_walkable(goal) {
        return None;
    }
    if start == goal {
        return Some(Vec::new());
    }
    if grid.is_occupied(goal) {
        return None;
    }

    let mut open_set = BinaryHeap::new();
    let mut closed: HashSet<GridCoord> = HashSet::new();
    let mut came_from: HashMap<GridCoord, GridCoord> = HashMap::new();
    let mut g_scores: HashMap<GridCoord, u32> = HashMap::new();
    let mut seq = 0u64;

    g_scores.insert(start, 0);
    open_set.push(PathNode {
        coord: start,
        f_cost: start.manhattan(goal),
        seq,
    });

    while let Some(current) = open_set.pop() {
        if current.coord == goal {
            return Some(reconstruct_path(&came_from, goal));
        }
        if !closed.insert(current.coord) {
            continue;
        }

        let current_g = g_scores.get(&current.coord).copied().unwrap_or(u32::MAX);

        for neighbor in current.coord.neighbors() {
            if closed.contains(&neighbor) {
                continue;
            }
            if !grid.is_walkable(neighbor) || grid.is_occupied(neighbor) {
                continue;
            }

            let tentative_g = current_g + 1;
            let neighbor_g = g_scores.get(&neighbor).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.coord);
                g_scores.insert(neighbor, tentative_g);

                seq += 1;
                open_set.push(PathNode {
                    coord: neighbor,
                    f_cost: tentative_g + neighbor.manhattan(goal),
                    seq,
                });
            }
        }
    }

    None // No path found
}

/// Walk predecessors back from `goal`. The start (which has no predecessor)
/// is left out.
fn reconstruct_path(came_from: &HashMap<GridCoord, GridCoord>, goal: GridCoord) -> Vec<GridCoord> {
    let mut path = Vec::new();
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        path.push(current);
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: i32, y: i32) -> GridCoord {
        GridCoord::new(x, y)
    }

    fn assert_connected(start: GridCoord, path: &[GridCoord]) {
        let mut prev = start;
        for &step in path {
            assert_eq!(prev.manhattan(step), 1, "{prev} -> {step} is not a cardinal step");
            prev = step;
        }
    }

    #[test]
    fn straight_line_has_manhattan_length() {
        let grid = SpatialGrid::new(10, 10, 16);
        let path = find_path(&grid, c(0, 0), c(5, 0)).unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path.first(), Some(&c(1, 0)));
        assert_eq!(path.last(), Some(&c(5, 0)));
        assert_connected(c(0, 0), &path);
    }

    #[test]
    fn same_cell_is_empty_path() {
        let grid = SpatialGrid::new(3, 3, 4);
        assert_eq!(find_path(&grid, c(1, 1), c(1, 1)), Some(Vec::new()));
    }

    #[test]
    fn routes_around_wall() {
        let mut grid = SpatialGrid::new(10, 10, 16);
        for y in 0..9 {
            grid.set_walkable(c(5, y), false);
        }
        let path = find_path(&grid, c(0, 0), c(9, 0)).unwrap();
        assert!(path.iter().all(|&p| p.x != 5 || p.y == 9));
        assert_connected(c(0, 0), &path);
        // Down to row 9, across, and back up.
        assert_eq!(path.len(), 9 + 9 + 9);
    }

    #[test]
    fn occupied_cells_block() {
        let mut grid = SpatialGrid::new(5, 1, 4);
        grid.set_occupied(c(2, 0));
        assert!(find_path(&grid, c(0, 0), c(4, 0)).is_none());
        assert!(find_path(&grid, c(0, 0), c(2, 0)).is_none());
    }

    #[test]
    fn occupied_start_is_fine() {
        let mut grid = SpatialGrid::new(5, 1, 4);
        grid.set_occupied(c(0, 0));
        assert_eq!(find_path(&grid, c(0, 0), c(2, 0)).unwrap().len(), 2);
    }

    #[test]
    fn non_walkable_endpoints_fail() {
        let mut grid = SpatialGrid::new(5, 5, 4);
        grid.set_walkable(c(0, 0), false);
        grid.set_walkable(c(4, 4), false);
        assert!(find_path(&grid, c(0, 0), c(2, 2)).is_none());
        assert!(find_path(&grid, c(2, 2), c(4, 4)).is_none());
    }

    #[test]
    fn enclosed_goal_is_unreachable() {
        let mut grid = SpatialGrid::new(7, 7, 4);
        for n in c(3, 3).neighbors() {
            grid.set_walkable(n, false);
        }
        assert!(find_path(&grid, c(0, 0), c(3, 3)).is_none());
    }
}
