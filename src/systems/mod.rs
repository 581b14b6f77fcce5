//! Per-tick simulation systems.
//!
//! A tick runs four phases in fixed order, each an exclusive system with
//! full access to the world:
//!
//! 1. `grid_refresh_system` - resets the scratch buffer, refreshes
//!    sections from cellsigns, samples grid statistics.
//! 2. `structure_system` - pulse timers and unit spawning.
//! 3. `unit_system` - autonomous movement, life countdown.
//! 4. `player_system` - local input, pushing, build placement.
//!
//! Every position change goes through `lifecycle::move_to`, which keeps
//! the entity's `Position` and its grid cell in step.

pub mod collision;
pub mod lifecycle;
pub mod maintenance;
pub mod player;
pub mod structure;
pub mod unit;

pub use collision::{collides_with, probe, Contact};
pub use lifecycle::{create_local_player, create_remote_player, create_unit, destroy, move_to};
pub use maintenance::grid_refresh_system;
pub use player::player_system;
pub use structure::{construct, spawn_point, structure_system};
pub use unit::{move_along_axis, move_unit_toward, pushed, retarget, unit_system};

use crate::components::Position;
use crate::geometry::MapBounds;
use bevy_ecs::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Global simulation tick counter.
/// Increments each fixed update, used to throttle periodic work.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimTick(pub u64);

impl SimTick {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    /// True every `interval` ticks. Never for an interval of 0.
    #[inline]
    pub fn every(&self, interval: u64) -> bool {
        interval != 0 && self.0 % interval == 0
    }
}

/// Seeded random source for retargeting and spawn shuffles.
#[derive(Resource, Debug)]
pub struct SimRng(pub StdRng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    /// Uniform point anywhere on the map.
    pub fn point_in(&mut self, bounds: MapBounds) -> Position {
        Position::new(
            self.0.gen_range(0..bounds.width),
            self.0.gen_range(0..bounds.height),
        )
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.0);
    }
}

/// Entities carrying component `T`, collected up front so the caller can
/// mutate the world while walking them.
pub(crate) fn entities_with<T: Component>(world: &mut World) -> Vec<Entity> {
    let mut query = world.query_filtered::<Entity, With<T>>();
    query.iter(world).collect()
}
