//! Structure placement, pulse timers and spawn-point search.

use super::collision::{collides_with, footprint, probe, query_limit};
use super::lifecycle::{create_unit, spawn_structure};
use super::{entities_with, SimRng};
use crate::components::{Kind, Position, Size, Structure, StructureBundle};
use crate::config::SimConfig;
use crate::error::{PlacementError, SpawnError};
use crate::geometry::{Aabb, Direction};
use crate::presets::{structure_preset, unit_preset};
use crate::spatial::Grid;
use bevy_ecs::prelude::*;
use tracing::debug;

/// Sides a spawned unit may appear on, before shuffling.
const SPAWN_SIDES: [Direction; 4] = [
    Direction::South,
    Direction::West,
    Direction::East,
    Direction::North,
];

/// Count down every structure's pulse and spawn units on expiry.
pub fn structure_system(world: &mut World) {
    for entity in entities_with::<Structure>(world) {
        update(world, entity);
    }
}

fn update(world: &mut World, entity: Entity) {
    let class = {
        let Some(mut structure) = world.get_mut::<Structure>(entity) else {
            return;
        };
        let Some(preset) = structure_preset(structure.class) else {
            return;
        };
        let Some(class) = preset.spawns else {
            return;
        };
        structure.pulse = structure.pulse.saturating_sub(1);
        if structure.pulse > 0 {
            return;
        }
        structure.pulse = preset.pulse_ticks;
        class
    };
    let Some(unit) = unit_preset(class) else {
        return;
    };

    let spawned = spawn_point(world, entity, unit.size.w, unit.size.h)
        .and_then(|at| create_unit(world, at.x, at.y, class));
    if let Err(err) = spawned {
        debug!(?entity, error = %err, "spawn skipped");
    }
}

/// Place a structure of `class` centered on `(x, y)`.
///
/// The footprint must lie entirely on the map and overlap nothing.
/// Nothing is mutated on failure.
pub fn construct(world: &mut World, x: u16, y: u16, class: u8) -> Result<Entity, PlacementError> {
    place(world, i32::from(x), i32::from(y), class)
}

/// `construct` for centers that may lie off the map.
pub(crate) fn place(world: &mut World, x: i32, y: i32, class: u8) -> Result<Entity, PlacementError> {
    let preset = structure_preset(class).ok_or(PlacementError::UnknownClass(class))?;
    let config = world.resource::<SimConfig>();
    let area = Aabb::centered(x, y, preset.size.w, preset.size.h);
    if !config.bounds().contains(&area) {
        return Err(PlacementError::OutOfBounds { x, y });
    }
    let limit = query_limit(config, Kind::Structure);

    // In bounds, so both coordinates fit.
    let at = Position::new(x as u16, y as u16);
    let hit = world.resource_scope(|world, mut grid: Mut<Grid>| {
        collides_with(&mut grid, world, at, preset.size, None, limit)
    })?;
    if hit.is_some() {
        return Err(PlacementError::Blocked { x: at.x, y: at.y });
    }

    let bundle = StructureBundle::new(class, at).ok_or(PlacementError::UnknownClass(class))?;
    Ok(spawn_structure(world, bundle))
}

/// Find a free spot for a `w` x `h` unit flush against one side of
/// `structure`.
///
/// Sides are tried in random order; the first candidate that lies on the
/// map and overlaps nothing wins.
pub fn spawn_point(world: &mut World, structure: Entity, w: u16, h: u16) -> Result<Position, SpawnError> {
    if world.get::<Structure>(structure).is_none() {
        return Err(SpawnError::NotAStructure(structure));
    }
    let Some((center, size)) = footprint(world, structure) else {
        return Err(SpawnError::NotAStructure(structure));
    };
    let config = world.resource::<SimConfig>();
    let (bounds, limit) = (config.bounds(), query_limit(config, Kind::Structure));

    let mut sides = SPAWN_SIDES;
    world.resource_mut::<SimRng>().shuffle(&mut sides);

    let reach_x = i32::from(size.w / 2 + w / 2);
    let reach_y = i32::from(size.h / 2 + h / 2);
    for side in sides {
        let (ox, oy) = side.offset();
        let x = i32::from(center.x) + ox * reach_x;
        let y = i32::from(center.y) + oy * reach_y;
        if !bounds.contains(&Aabb::centered(x, y, w, h)) {
            continue;
        }
        let candidate = Position::new(x as u16, y as u16);
        if probe(world, candidate, Size::new(w, h), None, limit).is_clear() {
            return Ok(candidate);
        }
    }
    Err(SpawnError::NoValidSpawnPoint(structure))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Occupant, Unit};
    use crate::systems::lifecycle::create_local_player;
    use crate::systems::testing::small_world;

    fn unit_count(world: &mut World) -> usize {
        entities_with::<Unit>(world).len()
    }

    #[test]
    fn test_construct_registers_structure() {
        let mut world = small_world();
        let barracks = construct(&mut world, 320, 320, 0).unwrap();
        assert_eq!(*world.get::<Size>(barracks).unwrap(), Size::new(48, 48));
        assert!(world
            .resource::<Grid>()
            .contains(Occupant::new(barracks, Kind::Structure), Position::new(320, 320)));
    }

    #[test]
    fn test_construct_rejections_leave_world_untouched() {
        let mut world = small_world();
        create_local_player(&mut world, 320, 320);

        assert_eq!(construct(&mut world, 10, 320, 0), Err(PlacementError::OutOfBounds { x: 10, y: 320 }));
        assert_eq!(construct(&mut world, 330, 330, 0), Err(PlacementError::Blocked { x: 330, y: 330 }));
        assert_eq!(construct(&mut world, 100, 100, 9), Err(PlacementError::UnknownClass(9)));
        assert_eq!(world.resource::<Grid>().len(), 1);
        assert!(entities_with::<Structure>(&mut world).is_empty());
    }

    #[test]
    fn test_construct_next_to_existing_footprint() {
        let mut world = small_world();
        construct(&mut world, 320, 320, 2).unwrap();
        // Walls are 32 wide; sharing an edge is allowed.
        assert!(construct(&mut world, 352, 320, 2).is_ok());
        assert!(construct(&mut world, 383, 320, 2).is_err());
    }

    #[test]
    fn test_spawn_point_is_flush_with_a_side() {
        let mut world = small_world();
        let barracks = construct(&mut world, 320, 320, 0).unwrap();
        let at = spawn_point(&mut world, barracks, 20, 20).unwrap();
        let candidates = [
            Position::new(320, 354),
            Position::new(286, 320),
            Position::new(354, 320),
            Position::new(320, 286),
        ];
        assert!(candidates.contains(&at), "{at:?}");
    }

    #[test]
    fn test_spawn_point_skips_off_map_sides() {
        let mut world = small_world();
        let outpost = construct(&mut world, 16, 16, 1).unwrap();
        for _ in 0..16 {
            let at = spawn_point(&mut world, outpost, 16, 16).unwrap();
            assert!(at == Position::new(16, 40) || at == Position::new(40, 16), "{at:?}");
        }
    }

    #[test]
    fn test_spawn_point_fails_when_fully_blocked() {
        let mut world = small_world();
        let barracks = construct(&mut world, 320, 320, 0).unwrap();
        for (x, y) in [(320, 354), (286, 320), (354, 320), (320, 286)] {
            create_unit(&mut world, x, y, 1).unwrap();
        }

        assert_eq!(
            spawn_point(&mut world, barracks, 20, 20),
            Err(SpawnError::NoValidSpawnPoint(barracks))
        );

        world.get_mut::<Structure>(barracks).unwrap().pulse = 1;
        structure_system(&mut world);
        assert_eq!(unit_count(&mut world), 4, "no unit spawns when blocked");
        assert_eq!(world.get::<Structure>(barracks).unwrap().pulse, 90);
    }

    #[test]
    fn test_spawn_point_rejects_non_structures() {
        let mut world = small_world();
        let player = create_local_player(&mut world, 100, 100);
        assert_eq!(spawn_point(&mut world, player, 16, 16), Err(SpawnError::NotAStructure(player)));
    }

    #[test]
    fn test_pulse_spawns_preset_unit() {
        let mut world = small_world();
        let barracks = construct(&mut world, 320, 320, 0).unwrap();
        let wall = construct(&mut world, 100, 100, 2).unwrap();

        for _ in 0..89 {
            structure_system(&mut world);
        }
        assert_eq!(unit_count(&mut world), 0);
        structure_system(&mut world);

        let units = entities_with::<Unit>(&mut world);
        assert_eq!(units.len(), 1);
        assert_eq!(world.get::<Unit>(units[0]).unwrap().class, 1);
        assert_eq!(world.get::<Structure>(barracks).unwrap().pulse, 90);
        assert_eq!(world.get::<Structure>(wall).unwrap().pulse, 0, "walls never pulse");
    }
}
