//! Public API for the simulation.
//!
//! `SimWorld` is the interface a driver (renderer, network layer, test
//! harness) uses to create entities, feed input and advance time.
//!
//! ## Fixed Timestep
//!
//! The simulation uses a fixed timestep internally (default 30 Hz). When
//! `step(dt)` is called, the simulation accumulates time and runs fixed
//! updates as needed, so behavior does not depend on frame rate.
//!
//! ## Tick Phases
//!
//! Each fixed update runs, in order: section refresh, structures, units,
//! players. Grid state only changes inside these phases or through the
//! factory methods below.

use crate::components::{Player, Structure, Unit};
use crate::config::SimConfig;
use crate::error::{ConfigError, PlacementError, SpawnError};
use crate::input::InputState;
use crate::profiler::Profiler;
use crate::spatial::Grid;
use crate::systems::{self, SimRng, SimTick};
use crate::world::Snapshot;
use bevy_ecs::prelude::*;
use tracing::{info, warn};

/// The main simulation world container.
///
/// Holds the ECS world and the phase schedules, providing a clean API for:
/// - Initializing the simulation
/// - Stepping the simulation forward
/// - Extracting state snapshots
/// - Creating and destroying entities
pub struct SimWorld {
    world: World,
    phases: Vec<(&'static str, Schedule)>,
    tick: u64,
    time: f32,
    /// Accumulated time for fixed timestep.
    time_accumulator: f32,
    profiler: Option<Profiler>,
}

impl SimWorld {
    /// Create a simulation world with the default configuration.
    pub fn new() -> Self {
        Self::build(SimConfig::default())
    }

    /// Create a simulation world with a custom configuration.
    pub fn with_config(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Create a simulation world from a JSON configuration.
    pub fn from_json_config(data: &str) -> Result<Self, ConfigError> {
        Ok(Self::build(SimConfig::from_json(data)?))
    }

    fn build(config: SimConfig) -> Self {
        let mut world = World::new();

        world.insert_resource(Grid::new(
            config.bounds(),
            config.cell_size,
            config.scratch_capacity,
        ));
        world.insert_resource(SimRng::seeded(config.seed));
        world.insert_resource(SimTick(0));
        world.insert_resource(InputState::default());

        let phases = vec![
            phase("refresh_sections", systems::grid_refresh_system),
            phase("structures", systems::structure_system),
            phase("units", systems::unit_system),
            phase("players", systems::player_system),
        ];
        let profiler = config.profile.then(Profiler::new);

        info!(
            map_width = config.map_width,
            map_height = config.map_height,
            cell_size = config.cell_size,
            tick_rate = config.tick_rate(),
            seed = config.seed,
            "simulation world created"
        );
        world.insert_resource(config);

        Self {
            world,
            phases,
            tick: 0,
            time: 0.0,
            time_accumulator: 0.0,
            profiler,
        }
    }

    /// Create a small populated world for demonstration.
    pub fn new_default_test_world() -> Self {
        let mut sim = Self::new();
        let (cx, cy) = sim.config().bounds().center();

        sim.create_local_player(cx, cy);
        sim.create_remote_player(cx + 200, cy);

        for (dx, class) in [(-300i32, 0u8), (300, 1)] {
            let x = (i32::from(cx) + dx) as u16;
            if let Err(err) = sim.construct(x, cy - 200, class) {
                warn!(error = %err, "demo structure not placed");
            }
        }
        for i in 0..8u16 {
            for j in 0..4u16 {
                let (x, y) = (cx - 280 + i * 70, cy + 150 + j * 60);
                if let Err(err) = sim.create_unit(x, y, (i % 3) as u8) {
                    warn!(error = %err, "demo unit not spawned");
                }
            }
        }
        sim
    }

    /// Step the simulation forward by `dt` seconds.
    ///
    /// Uses fixed timestep internally - accumulates time and runs fixed
    /// updates as needed. Returns the number of updates run.
    pub fn step(&mut self, dt: f32) -> usize {
        let fixed_dt = self.config().fixed_timestep;

        self.time_accumulator += dt;

        let mut ticks = 0;
        while self.time_accumulator >= fixed_dt {
            self.tick();
            self.time_accumulator -= fixed_dt;
            ticks += 1;
        }
        ticks
    }

    /// Run exactly one fixed update.
    pub fn tick(&mut self) {
        let fixed_dt = self.config().fixed_timestep;
        self.world.resource_mut::<SimTick>().increment();

        for (name, schedule) in self.phases.iter_mut() {
            match self.profiler.as_mut() {
                Some(profiler) => profiler.time_section(*name, || schedule.run(&mut self.world)),
                None => schedule.run(&mut self.world),
            }
        }
        if let Some(profiler) = self.profiler.as_mut() {
            profiler.tick();
        }

        self.tick += 1;
        self.time += fixed_dt;
    }

    /// Latch the local player's input for the following ticks.
    pub fn set_input(&mut self, input: InputState) {
        *self.world.resource_mut::<InputState>() = input;
    }

    pub fn create_local_player(&mut self, x: u16, y: u16) -> Entity {
        systems::create_local_player(&mut self.world, x, y)
    }

    pub fn create_remote_player(&mut self, x: u16, y: u16) -> Entity {
        systems::create_remote_player(&mut self.world, x, y)
    }

    pub fn create_unit(&mut self, x: u16, y: u16, class: u8) -> Result<Entity, SpawnError> {
        systems::create_unit(&mut self.world, x, y, class)
    }

    pub fn construct(&mut self, x: u16, y: u16, class: u8) -> Result<Entity, PlacementError> {
        systems::construct(&mut self.world, x, y, class)
    }

    /// Remove an entity and every grid reference to it.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        systems::destroy(&mut self.world, entity)
    }

    /// Step a unit towards its target outside the normal tick.
    pub fn move_unit_toward(&mut self, entity: Entity) -> bool {
        systems::move_unit_toward(&mut self.world, entity)
    }

    pub fn retarget(&mut self, entity: Entity) {
        systems::retarget(&mut self.world, entity)
    }

    pub fn pushed(&mut self, entity: Entity, angle: f32, distance: f32) -> f32 {
        systems::pushed(&mut self.world, entity, angle, distance)
    }

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world, self.tick, self.time)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn current_time(&self) -> f32 {
        self.time
    }

    pub fn player_count(&mut self) -> usize {
        self.count::<Player>()
    }

    pub fn unit_count(&mut self) -> usize {
        self.count::<Unit>()
    }

    pub fn structure_count(&mut self) -> usize {
        self.count::<Structure>()
    }

    fn count<T: Component>(&mut self) -> usize {
        let mut query = self.world.query_filtered::<(), With<T>>();
        query.iter(&self.world).count()
    }

    /// Get the grid (for debugging/visualization).
    pub fn grid(&self) -> &Grid {
        self.world.resource::<Grid>()
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    /// Phase timings, when profiling is enabled.
    pub fn profiler(&self) -> Option<&Profiler> {
        self.profiler.as_ref()
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn phase<M>(name: &'static str, system: impl IntoSystemConfigs<M>) -> (&'static str, Schedule) {
    let mut schedule = Schedule::default();
    schedule.add_systems(system);
    (name, schedule)
}
