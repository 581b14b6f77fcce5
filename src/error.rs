//! Error types for grid queries, placement, spawning and configuration.

use bevy_ecs::entity::Entity;
use thiserror::Error;

/// A section query that could not produce a complete answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("scratch buffer exhausted ({capacity} slots)")]
    ScratchOverflow { capacity: usize },

    #[error("section around ({x}, {y}) holds more than {limit} occupants")]
    LimitExceeded { x: u16, y: u16, limit: usize },
}

/// Reasons a structure footprint was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("unknown structure class {0}")]
    UnknownClass(u8),

    #[error("footprint at ({x}, {y}) leaves the map")]
    OutOfBounds { x: i32, y: i32 },

    #[error("footprint at ({x}, {y}) is obstructed")]
    Blocked { x: u16, y: u16 },

    #[error("placement check failed: {0}")]
    QueryFailed(#[from] GridError),
}

/// Reasons a unit could not be spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpawnError {
    #[error("unknown unit class {0}")]
    UnknownClass(u8),

    #[error("no valid spawn point around structure {0:?}")]
    NoValidSpawnPoint(Entity),

    #[error("entity {0:?} is not a structure")]
    NotAStructure(Entity),
}

/// Invalid simulation configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("map must be at least one unit on each axis (got {width}x{height})")]
    EmptyMap { width: u16, height: u16 },

    #[error("cell size {cell_size} is smaller than the largest footprint ({required})")]
    CellTooSmall { cell_size: u16, required: u16 },

    #[error("fixed timestep must be positive (got {0})")]
    InvalidTimestep(f32),

    #[error("scratch buffer capacity must be non-zero")]
    EmptyScratch,

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}
