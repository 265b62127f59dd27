//! Terrain content: the generator boundary and two implementations.
//!
//! The simulation only consumes a generator's output shape (biome, altitude,
//! humidity, walkability, movement cost per cell); what the terrain looks like
//! is the generator's business.

use rand::Rng;
use rand_pcg::Pcg64;

use crate::grid::{Biome, GridCoord, SpatialGrid};

/// Fills every cell of a grid with terrain attributes.
pub trait TerrainGenerator {
    /// Overwrite all cells of `grid`. Must draw randomness only from `rng`.
    fn generate(&mut self, grid: &mut SpatialGrid, rng: &mut Pcg64);
}

// ---------------------------------------------------------------------------
// FlatTerrain
// ---------------------------------------------------------------------------

/// Every cell walkable grass. Used for deterministic scenarios.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatTerrain;

impl TerrainGenerator for FlatTerrain {
    fn generate(&mut self, grid: &mut SpatialGrid, _rng: &mut Pcg64) {
        let coords: Vec<GridCoord> = grid.coords().collect();
        for coord in coords {
            grid.set_terrain(coord, Biome::Grass, 0.5, 0.5);
        }
    }
}

// ---------------------------------------------------------------------------
// NoiseTerrain
// ---------------------------------------------------------------------------

/// Smoothed value noise for altitude and humidity, classified into biomes.
///
/// Altitude is pulled down near the map edge so coasts tend to form there.
#[derive(Debug, Clone)]
pub struct NoiseTerrain {
    /// Distance in cells between noise lattice points.
    pub feature_size: i32,
    /// Altitude below which a cell is water.
    pub water_level: f32,
    /// Altitude band above water that becomes sand.
    pub beach_width: f32,
    /// Altitude above which a cell is mountain.
    pub mountain_level: f32,
    /// Humidity above which land becomes forest.
    pub forest_humidity: f32,
}

impl Default for NoiseTerrain {
    fn default() -> Self {
        Self {
            feature_size: 8,
            water_level: 0.28,
            beach_width: 0.06,
            mountain_level: 0.8,
            forest_humidity: 0.6,
        }
    }
}

impl NoiseTerrain {
    /// Map altitude and humidity to a biome.
    pub fn classify(&self, altitude: f32, humidity: f32) -> Biome {
        if altitude < self.water_level {
            Biome::Water
        } else if altitude < self.water_level + self.beach_width {
            Biome::Sand
        } else if altitude > self.mountain_level {
            Biome::Mountain
        } else if humidity > self.forest_humidity {
            Biome::Forest
        } else {
            Biome::Grass
        }
    }
}

impl TerrainGenerator for NoiseTerrain {
    fn generate(&mut self, grid: &mut SpatialGrid, rng: &mut Pcg64) {
        let step = self.feature_size.max(1);
        let altitude = ValueNoise::new(grid.width(), grid.height(), step, rng);
        let humidity = ValueNoise::new(grid.width(), grid.height(), step, rng);

        let coords: Vec<GridCoord> = grid.coords().collect();
        for coord in coords {
            let edge = coord
                .x
                .min(grid.width() - 1 - coord.x)
                .min(coord.y)
                .min(grid.height() - 1 - coord.y) as f32;
            let edge_factor = (edge / 4.0).min(1.0);

            let alt = altitude.sample(coord) * (0.6 + 0.4 * edge_factor);
            let hum = humidity.sample(coord);
            grid.set_terrain(coord, self.classify(alt, hum), alt, hum);
        }
    }
}

/// Random lattice values with smoothstep bilinear interpolation.
struct ValueNoise {
    step: i32,
    lattice_width: usize,
    values: Vec<f32>,
}

impl ValueNoise {
    fn new(width: i32, height: i32, step: i32, rng: &mut Pcg64) -> Self {
        let lattice_width = (width / step + 2) as usize;
        let lattice_height = (height / step + 2) as usize;
        let values = (0..lattice_width * lattice_height)
            .map(|_| rng.gen::<f32>())
            .collect();
        Self {
            step,
            lattice_width,
            values,
        }
    }

    fn at(&self, lx: usize, ly: usize) -> f32 {
        self.values[ly * self.lattice_width + lx]
    }

    fn sample(&self, coord: GridCoord) -> f32 {
        let lx = (coord.x / self.step) as usize;
        let ly = (coord.y / self.step) as usize;
        let tx = smoothstep((coord.x % self.step) as f32 / self.step as f32);
        let ty = smoothstep((coord.y % self.step) as f32 / self.step as f32);

        let top = lerp(self.at(lx, ly), self.at(lx + 1, ly), tx);
        let bottom = lerp(self.at(lx, ly + 1), self.at(lx + 1, ly + 1), tx);
        lerp(top, bottom, ty)
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn flat_terrain_is_all_walkable() {
        let mut grid = SpatialGrid::new(6, 4, 4);
        grid.set_walkable(GridCoord::new(1, 1), false);
        FlatTerrain.generate(&mut grid, &mut Pcg64::seed_from_u64(0));
        assert_eq!(grid.walkable_count(), 24);
    }

    #[test]
    fn noise_terrain_is_deterministic_per_seed() {
        let run = |seed| {
            let mut grid = SpatialGrid::new(32, 32, 4);
            NoiseTerrain::default().generate(&mut grid, &mut Pcg64::seed_from_u64(seed));
            let biomes: Vec<_> = grid
                .coords()
                .map(|c| grid.get_cell(c).map(|cell| cell.biome))
                .collect();
            biomes
        };
        assert_eq!(run(11), run(11));
        assert_ne!(run(11), run(12));
    }

    #[test]
    fn noise_values_stay_in_unit_range() {
        let mut grid = SpatialGrid::new(20, 13, 4);
        NoiseTerrain::default().generate(&mut grid, &mut Pcg64::seed_from_u64(3));
        for coord in grid.coords() {
            let cell = grid.get_cell(coord).unwrap();
            assert!((0.0..=1.0).contains(&cell.altitude));
            assert!((0.0..=1.0).contains(&cell.humidity));
            assert_eq!(cell.is_walkable(), cell.biome.is_walkable());
        }
    }

    #[test]
    fn classification_thresholds() {
        let terrain = NoiseTerrain::default();
        assert_eq!(terrain.classify(0.1, 0.9), Biome::Water);
        assert_eq!(terrain.classify(0.3, 0.9), Biome::Sand);
        assert_eq!(terrain.classify(0.9, 0.1), Biome::Mountain);
        assert_eq!(terrain.classify(0.5, 0.7), Biome::Forest);
        assert_eq!(terrain.classify(0.5, 0.3), Biome::Grass);
    }
}
