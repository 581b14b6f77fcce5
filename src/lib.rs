//! RTS Simulation Core
//!
//! A deterministic, fixed-timestep ECS simulation of players, units and
//! structures on a 2D map, built around a spatial grid with cached 3x3
//! sections for collision and proximity queries.
//! Uses `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod components;
pub mod config;
pub mod error;
pub mod geometry;
pub mod input;
pub mod presets;
pub mod profiler;
pub mod spatial;
pub mod systems;
pub mod world;

pub use api::SimWorld;
pub use components::*;
pub use config::{OnQueryOverflow, SimConfig};
pub use error::{ConfigError, GridError, PlacementError, SpawnError};
pub use input::InputState;
pub use profiler::Profiler;
pub use spatial::{Grid, GridStats, SpatialHash};
pub use systems::{Contact, SimRng, SimTick};
pub use world::Snapshot;
