//! Entity creation, relocation and destruction.
//!
//! Spawning always inserts the grid reference in the same call, and
//! destruction clears every grid reference before despawning, so the
//! one-cell membership invariant holds between any two calls.

use crate::components::{
    Control, Kind, Occupant, PlayerBundle, Position, Size, StructureBundle, UnitBundle,
};
use crate::config::SimConfig;
use crate::error::SpawnError;
use crate::geometry::MapBounds;
use crate::spatial::Grid;
use bevy_ecs::prelude::*;
use tracing::debug;

/// Spawn a player driven by the local input bitmask.
pub fn create_local_player(world: &mut World, x: u16, y: u16) -> Entity {
    spawn_player(world, Control::Local, x, y)
}

/// Spawn a player that receives no local input.
pub fn create_remote_player(world: &mut World, x: u16, y: u16) -> Entity {
    spawn_player(world, Control::Remote, x, y)
}

fn spawn_player(world: &mut World, control: Control, x: u16, y: u16) -> Entity {
    let bundle = PlayerBundle::new(control, Position::default());
    let at = on_map(world, x, y, bundle.size);
    spawn_tracked(world, PlayerBundle { position: at, ..bundle }, Kind::Player, at)
}

/// Spawn a unit of preset `class`. The center is clamped so the
/// footprint stays on the map; overlap is not checked.
pub fn create_unit(world: &mut World, x: u16, y: u16, class: u8) -> Result<Entity, SpawnError> {
    let mut bundle =
        UnitBundle::new(class, Position::default()).ok_or(SpawnError::UnknownClass(class))?;
    let at = on_map(world, x, y, bundle.size);
    bundle.position = at;
    bundle.unit.target = at;
    bundle.unit.last_step = at;
    Ok(spawn_tracked(world, bundle, Kind::Unit, at))
}

/// Spawn an already validated structure.
pub(crate) fn spawn_structure(world: &mut World, bundle: StructureBundle) -> Entity {
    let at = bundle.position;
    spawn_tracked(world, bundle, Kind::Structure, at)
}

fn spawn_tracked<B: Bundle>(world: &mut World, bundle: B, kind: Kind, at: Position) -> Entity {
    let entity = world.spawn(bundle).id();
    world
        .resource_mut::<Grid>()
        .insert(Occupant::new(entity, kind), at);
    debug!(?entity, ?kind, x = at.x, y = at.y, "spawned");
    entity
}

fn on_map(world: &World, x: u16, y: u16, size: Size) -> Position {
    let bounds = world.resource::<SimConfig>().bounds();
    let (x, y) = bounds.clamp_center(i32::from(x), i32::from(y), size.w, size.h);
    Position::new(x, y)
}

/// Position reached by moving `(dx, dy)` from `pos`, clamped so a `size`
/// footprint stays on the map. The flag is set when clamping changed it.
pub(crate) fn offset_within(
    bounds: MapBounds,
    pos: Position,
    size: Size,
    dx: i32,
    dy: i32,
) -> (Position, bool) {
    let tx = i32::from(pos.x) + dx;
    let ty = i32::from(pos.y) + dy;
    let (x, y) = bounds.clamp_center(tx, ty, size.w, size.h);
    let clamped = (i32::from(x), i32::from(y)) != (tx, ty);
    (Position::new(x, y), clamped)
}

/// Set the entity's position and move its grid reference along with it.
///
/// Returns false if the entity has no position.
pub fn move_to(world: &mut World, occupant: Occupant, to: Position) -> bool {
    let from = {
        let Some(mut position) = world.get_mut::<Position>(occupant.entity) else {
            return false;
        };
        std::mem::replace(&mut *position, to)
    };
    world.resource_mut::<Grid>().relocate(occupant, from, to);
    true
}

/// Remove every grid reference to `entity`, then despawn it.
///
/// Returns false for an entity that is already gone.
///
/// # Panics
///
/// If the entity's recorded position does not match its grid cell, or if
/// any cell still references it after removal.
pub fn destroy(world: &mut World, entity: Entity) -> bool {
    let (Some(pos), Some(kind)) = (
        world.get::<Position>(entity).copied(),
        world.get::<Kind>(entity).copied(),
    ) else {
        return false;
    };
    let occupant = Occupant::new(entity, kind);

    {
        let mut grid = world.resource_mut::<Grid>();
        grid.remove(occupant, pos);
        grid.purge(occupant);
        let leftover = grid
            .cells()
            .find(|(_, cell)| cell.contains(&occupant))
            .map(|(key, _)| key);
        if let Some(key) = leftover {
            panic!("{entity:?} still referenced by cell {key:#x} after removal");
        }
    }

    debug!(?entity, ?kind, "destroyed");
    world.despawn(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Player, Unit};
    use crate::systems::testing::small_world;

    #[test]
    fn test_factories_register_in_grid() {
        let mut world = small_world();
        let player = create_local_player(&mut world, 50, 50);
        let remote = create_remote_player(&mut world, 300, 50);
        let unit = create_unit(&mut world, 200, 200, 1).unwrap();

        let grid = world.resource::<Grid>();
        assert!(grid.contains(Occupant::new(player, Kind::Player), Position::new(50, 50)));
        assert!(grid.contains(Occupant::new(remote, Kind::Player), Position::new(300, 50)));
        assert!(grid.contains(Occupant::new(unit, Kind::Unit), Position::new(200, 200)));
        assert_eq!(grid.len(), 3);
        assert!(!world.get::<Player>(remote).unwrap().is_local());
    }

    #[test]
    fn test_unknown_unit_class() {
        let mut world = small_world();
        assert_eq!(create_unit(&mut world, 10, 10, 42), Err(SpawnError::UnknownClass(42)));
        assert!(world.resource::<Grid>().is_empty());
    }

    #[test]
    fn test_spawn_is_clamped_onto_map() {
        let mut world = small_world();
        let unit = create_unit(&mut world, 0, 1000, 0).unwrap();
        let at = *world.get::<Position>(unit).unwrap();
        assert_eq!(at, Position::new(8, 632));
        assert_eq!(world.get::<Unit>(unit).unwrap().target, at);
        assert!(world
            .resource::<Grid>()
            .contains(Occupant::new(unit, Kind::Unit), at));
    }

    #[test]
    fn test_move_to_relocates() {
        let mut world = small_world();
        let unit = create_unit(&mut world, 60, 60, 0).unwrap();
        let occupant = Occupant::new(unit, Kind::Unit);

        assert!(move_to(&mut world, occupant, Position::new(70, 60)));
        assert_eq!(*world.get::<Position>(unit).unwrap(), Position::new(70, 60));
        let grid = world.resource::<Grid>();
        assert!(grid.contains(occupant, Position::new(70, 60)));
        assert!(grid.cell(60, 60).is_empty());
    }

    #[test]
    fn test_destroy_clears_grid_and_sections() {
        let mut world = small_world();
        let unit = create_unit(&mut world, 200, 200, 0).unwrap();
        world.resource_mut::<Grid>().refresh_sections();

        assert!(destroy(&mut world, unit));
        assert!(world.get::<Position>(unit).is_none());
        let grid = world.resource::<Grid>();
        assert!(grid.is_empty());
        assert!(grid.section(200, 200).is_empty());

        assert!(!destroy(&mut world, unit), "second destroy is a no-op");
    }

    #[test]
    #[should_panic(expected = "grid desync")]
    fn test_destroy_with_stale_position_panics() {
        let mut world = small_world();
        let unit = create_unit(&mut world, 200, 200, 0).unwrap();
        // Bypass move_to so the grid is left behind.
        world.get_mut::<Position>(unit).unwrap().x = 400;
        destroy(&mut world, unit);
    }

    #[test]
    fn test_offset_within_reports_clamping() {
        let bounds = MapBounds::new(640, 640);
        let size = Size::new(16, 16);
        let (at, clamped) = offset_within(bounds, Position::new(100, 100), size, 5, -3);
        assert_eq!((at, clamped), (Position::new(105, 97), false));
        let (at, clamped) = offset_within(bounds, Position::new(10, 100), size, -5, 0);
        assert_eq!((at, clamped), (Position::new(8, 100), true));
    }
}
