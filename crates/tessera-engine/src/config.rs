//! World and tick configuration.
//!
//! [`WorldConfig`] describes everything needed to build (and rebuild) a world:
//! grid dimensions, region size, population sizes, the RNG seed and the
//! faction seeding ranges. It deserializes from JSON with per-field defaults,
//! so a host only needs to spell out what it changes:
//!
//! ```
//! use tessera_engine::config::WorldConfig;
//!
//! let config = WorldConfig::from_json_str(r#"{ "width": 32, "height": 16, "seed": 7 }"#).unwrap();
//! assert_eq!(config.region_size, 8);
//! assert_eq!(config.path_cache_capacity, 1000);
//! config.validate().unwrap();
//! ```

use serde::{Deserialize, Serialize};

use crate::SimError;

/// Default capacity of the pathfinding cache.
pub const DEFAULT_PATH_CACHE_CAPACITY: usize = 1000;

// ---------------------------------------------------------------------------
// StatRange
// ---------------------------------------------------------------------------

/// Inclusive integer range used for randomized starting stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRange {
    pub min: i64,
    pub max: i64,
}

impl StatRange {
    /// Construct a range. No validation; see [`WorldConfig::validate`].
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// `true` if `min <= max`.
    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}

// ---------------------------------------------------------------------------
// WorldConfig
// ---------------------------------------------------------------------------

/// Parameters for world construction and regeneration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Grid width in cells.
    pub width: i32,
    /// Grid height in cells.
    pub height: i32,
    /// Side length of a square region, in cells.
    pub region_size: i32,
    /// Factions created at initialization.
    pub faction_count: usize,
    /// Wandering units spawned at initialization.
    pub unit_count: usize,
    /// Seed for the world RNG.
    pub seed: u64,
    /// Maximum number of cached paths.
    pub path_cache_capacity: usize,
    /// Range for a new faction's military strength.
    pub starting_strength: StatRange,
    /// Range for a new faction's resource pool.
    pub starting_resources: StatRange,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            region_size: 8,
            faction_count: 4,
            unit_count: 16,
            seed: 0,
            path_cache_capacity: DEFAULT_PATH_CACHE_CAPACITY,
            starting_strength: StatRange::new(10, 40),
            starting_resources: StatRange::new(20, 80),
        }
    }
}

impl WorldConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    ///
    /// The result is not validated; call [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        serde_json::from_str(json).map_err(|e| SimError::InvalidConfig {
            reason: format!("malformed world config: {e}"),
        })
    }

    /// Region grid width (world width / region size).
    pub fn region_width(&self) -> i32 {
        self.width / self.region_size.max(1)
    }

    /// Region grid height (world height / region size).
    pub fn region_height(&self) -> i32 {
        self.height / self.region_size.max(1)
    }

    /// Check every structural constraint the world builder relies on.
    pub fn validate(&self) -> Result<(), SimError> {
        let invalid = |reason: String| Err(SimError::InvalidConfig { reason });

        if self.width <= 0 || self.height <= 0 {
            return invalid(format!(
                "grid dimensions must be positive, got {}x{}",
                self.width, self.height
            ));
        }
        if self.region_size <= 0 {
            return invalid(format!(
                "region_size must be positive, got {}",
                self.region_size
            ));
        }
        if self.width % self.region_size != 0 || self.height % self.region_size != 0 {
            return Err(SimError::RegionLayoutMismatch {
                width: self.width,
                height: self.height,
                region_size: self.region_size,
            });
        }
        if self.path_cache_capacity == 0 {
            return invalid("path_cache_capacity must be at least 1".to_owned());
        }
        if !self.starting_strength.is_valid() {
            return invalid(format!(
                "starting_strength range is empty: {:?}",
                self.starting_strength
            ));
        }
        if !self.starting_resources.is_valid() {
            return invalid(format!(
                "starting_resources range is empty: {:?}",
                self.starting_resources
            ));
        }
        let regions = (self.region_width() as usize) * (self.region_height() as usize);
        if self.faction_count > regions {
            return invalid(format!(
                "{} factions cannot each start in a distinct region ({} regions)",
                self.faction_count, regions
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Timing of the host's fixed-interval tick trigger.
///
/// The simulation never sleeps; `interval` is only used to report
/// [`sim_time`](crate::scheduler::Simulation::sim_time).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickConfig {
    /// Seconds of simulated time per tick. Must be positive and finite.
    pub interval: f64,
}

impl Default for TickConfig {
    /// One tick every half second.
    fn default() -> Self {
        Self { interval: 0.5 }
    }
}

impl TickConfig {
    /// Reject non-positive or non-finite intervals.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.interval > 0.0 && self.interval.is_finite() {
            Ok(())
        } else {
            Err(SimError::InvalidConfig {
                reason: format!("tick interval must be positive and finite, got {}", self.interval),
            })
        }
    }
}
