//! Snapshot types handed to the renderer.
//!
//! The `Snapshot` struct is a serializable, read-only view of the
//! simulation state: every body's position, size, class and color plus
//! the per-variant fields a renderer needs (facing, interpolation point).

use crate::components::{Body, Kind, Player, Position, Size, Structure, Unit};
use crate::config::SimConfig;
use crate::geometry::Direction;
use crate::presets::Rgba;
use crate::spatial::Grid;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Fields shared by every simulated body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    /// Stable entity bits, unique while the entity lives.
    pub id: u64,
    pub kind: Kind,
    pub class: u8,
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
    pub color: Rgba,
}

impl BodySnapshot {
    fn of<T: Body>(entity: Entity, pos: &Position, size: &Size, body: &T) -> Self {
        Self {
            id: entity.to_bits(),
            kind: T::KIND,
            class: body.class(),
            x: pos.x,
            y: pos.y,
            w: size.w,
            h: size.h,
            color: body.color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    #[serde(flatten)]
    pub body: BodySnapshot,
    pub local: bool,
    pub facing: Direction,
    pub build_guide: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    #[serde(flatten)]
    pub body: BodySnapshot,
    /// Position before the last step, for interpolation.
    pub last_x: u16,
    pub last_y: u16,
    pub facing: Direction,
    pub life: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureSnapshot {
    #[serde(flatten)]
    pub body: BodySnapshot,
    pub pulse: u32,
}

/// Grid occupancy counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub cell_size: u16,
    pub cols: u32,
    pub rows: u32,
    pub occupants: usize,
    pub occupied_cells: usize,
    pub largest_cell: usize,
}

/// Complete simulation state snapshot for the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    pub map_width: u16,
    pub map_height: u16,
    pub players: Vec<PlayerSnapshot>,
    pub units: Vec<UnitSnapshot>,
    pub structures: Vec<StructureSnapshot>,
    pub grid: GridSnapshot,
}

impl Snapshot {
    /// Create a snapshot from the ECS world. Bodies are ordered by id.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let players = bodies::<Player>(world)
            .into_iter()
            .map(|(body, player)| PlayerSnapshot {
                body,
                local: player.is_local(),
                facing: player.facing,
                build_guide: player.build_guide,
            })
            .collect();

        let units = bodies::<Unit>(world)
            .into_iter()
            .map(|(body, unit)| {
                let from = unit.last_step;
                let facing = if from == Position::new(body.x, body.y) {
                    Direction::from_angle(from.angle_to(&unit.target))
                } else {
                    Direction::from_angle(from.angle_to(&Position::new(body.x, body.y)))
                };
                UnitSnapshot {
                    last_x: from.x,
                    last_y: from.y,
                    facing,
                    life: unit.life,
                    body,
                }
            })
            .collect();

        let structures = bodies::<Structure>(world)
            .into_iter()
            .map(|(body, structure)| StructureSnapshot {
                body,
                pulse: structure.pulse,
            })
            .collect();

        let (map_width, map_height) = world
            .get_resource::<SimConfig>()
            .map(|config| (config.map_width, config.map_height))
            .unwrap_or_default();

        let grid = world
            .get_resource::<Grid>()
            .map(|grid| {
                let stats = grid.stats();
                let (cols, rows) = grid.dimensions();
                GridSnapshot {
                    cell_size: grid.hash().cell_size(),
                    cols,
                    rows,
                    occupants: stats.occupants,
                    occupied_cells: stats.occupied_cells,
                    largest_cell: stats.largest_cell,
                }
            })
            .unwrap_or_default();

        Self {
            tick,
            time,
            map_width,
            map_height,
            players,
            units,
            structures,
            grid,
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

fn bodies<T: Body + Copy>(world: &mut World) -> Vec<(BodySnapshot, T)> {
    let mut query = world.query::<(Entity, &Position, &Size, &T)>();
    let mut out: Vec<_> = query
        .iter(world)
        .map(|(entity, pos, size, body)| (BodySnapshot::of(entity, pos, size, body), *body))
        .collect();
    out.sort_by_key(|(body, _)| body.id);
    out
}
