//! Simulation configuration.
//!
//! Fixed at world creation: map size, cell size and tick rate cannot
//! change while a `SimWorld` is running.

use crate::error::ConfigError;
use crate::geometry::MapBounds;
use crate::presets::largest_footprint;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// What a collision probe reports when its section query fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OnQueryOverflow {
    /// Treat the area as free. Movement keeps flowing under load, at the
    /// cost of occasional overlap.
    #[default]
    AssumeClear,
    /// Treat the area as blocked. Entities stall instead of overlapping.
    AssumeBlocked,
}

/// Configuration for the simulation.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed timestep in seconds (e.g., 1/30 = 0.0333 for 30 Hz).
    pub fixed_timestep: f32,
    pub map_width: u16,
    pub map_height: u16,
    /// Side of a grid cell in world units.
    pub cell_size: u16,
    /// Slots in the per-tick section query buffer.
    pub scratch_capacity: usize,
    /// Most occupants a player's collision query may see.
    pub player_query_limit: usize,
    /// Most occupants a unit's collision query may see. Units cluster, so
    /// this is larger than the player limit.
    pub unit_query_limit: usize,
    /// Limit for placement and spawn-point checks.
    pub structure_query_limit: usize,
    pub on_query_overflow: OnQueryOverflow,
    /// Seed for retargeting and spawn-side shuffles.
    pub seed: u64,
    /// Log grid statistics every N ticks (0 = never).
    pub debug_sample_interval: u64,
    /// Time each tick phase.
    pub profile: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 30.0, // 30 Hz
            map_width: 2048,
            map_height: 2048,
            cell_size: 64,
            scratch_capacity: 1 << 18,
            player_query_limit: 64,
            unit_query_limit: 256,
            structure_query_limit: 256,
            on_query_overflow: OnQueryOverflow::default(),
            seed: 0x5eed,
            debug_sample_interval: 300, // every 10 s at 30 Hz
            profile: cfg!(feature = "profile"),
        }
    }
}

impl SimConfig {
    /// Ticks per second.
    pub fn tick_rate(&self) -> f32 {
        1.0 / self.fixed_timestep
    }

    pub fn bounds(&self) -> MapBounds {
        MapBounds::new(self.map_width, self.map_height)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.map_width == 0 || self.map_height == 0 {
            return Err(ConfigError::EmptyMap {
                width: self.map_width,
                height: self.map_height,
            });
        }
        if self.fixed_timestep.is_nan() || self.fixed_timestep <= 0.0 {
            return Err(ConfigError::InvalidTimestep(self.fixed_timestep));
        }
        let required = largest_footprint();
        if self.cell_size < required {
            return Err(ConfigError::CellTooSmall {
                cell_size: self.cell_size,
                required,
            });
        }
        if self.scratch_capacity == 0 {
            return Err(ConfigError::EmptyScratch);
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields keep their
    /// defaults.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.tick_rate() - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SimConfig::from_json(r#"{ "map_width": 512, "on_query_overflow": "AssumeBlocked" }"#)
            .unwrap();
        assert_eq!(config.map_width, 512);
        assert_eq!(config.map_height, 2048);
        assert_eq!(config.on_query_overflow, OnQueryOverflow::AssumeBlocked);
    }

    #[test]
    fn test_json_round_trip() {
        let config = SimConfig {
            seed: 42,
            fixed_timestep: 0.05,
            ..Default::default()
        };
        let parsed = SimConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rejects_small_cells() {
        let err = SimConfig::from_json(r#"{ "cell_size": 16 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::CellTooSmall { cell_size: 16, required: 48 }));
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = SimConfig {
            fixed_timestep: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimestep(_))));

        assert!(matches!(
            SimConfig::from_json(r#"{ "map_width": 0 }"#),
            Err(ConfigError::EmptyMap { .. })
        ));
        assert!(matches!(SimConfig::from_json("not json"), Err(ConfigError::Json(_))));
    }
}
