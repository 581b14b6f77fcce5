//! Autonomous unit movement, pushing and life countdown.

use super::collision::{footprint, probe, query_limit, Contact};
use super::lifecycle::{destroy, move_to, offset_within};
use super::{entities_with, SimRng};
use crate::components::{Kind, Occupant, Position, Size, Unit};
use crate::config::SimConfig;
use crate::geometry::{step_per_tick, truncate, vector, Axis, MapBounds};
use crate::presets::unit_preset;
use bevy_ecs::prelude::*;
use tracing::debug;

/// Deepest chain of units a single push may propagate through.
pub const MAX_PUSH_DEPTH: u8 = 8;

/// Recursion state for one top-level `pushed` call.
#[derive(Debug, Default)]
struct PushContext {
    depth: u8,
}

/// Update every unit once.
pub fn unit_system(world: &mut World) {
    for entity in entities_with::<Unit>(world) {
        update(world, entity);
    }
}

fn update(world: &mut World, entity: Entity) {
    let expired = {
        let Some(mut unit) = world.get_mut::<Unit>(entity) else {
            return;
        };
        // Life 0 never expires.
        if unit.life > 0 {
            unit.life -= 1;
            unit.life == 0
        } else {
            false
        }
    };
    if expired {
        destroy(world, entity);
        return;
    }
    move_unit_toward(world, entity);
}

/// Advance a unit one tick towards its target.
///
/// Tries the direct step first, then slides along the dominant axis and
/// then the other. A unit that arrives, leaves the map or gets stuck
/// picks a new target. Returns true if the unit moved.
pub fn move_unit_toward(world: &mut World, entity: Entity) -> bool {
    let Some((pos, size)) = footprint(world, entity) else {
        return false;
    };
    let Some((target, speed)) = world.get_mut::<Unit>(entity).and_then(|mut unit| {
        unit.last_step = pos;
        unit_preset(unit.class).map(|preset| (unit.target, preset.speed))
    }) else {
        return false;
    };

    let config = world.resource::<SimConfig>();
    let step = step_per_tick(speed, config.tick_rate());
    let bounds = config.bounds();
    let limit = query_limit(config, Kind::Unit);

    if pos.distance_to(&target) < step {
        retarget(world, entity);
        return false;
    }

    let (dx, dy) = displacement(pos.angle_to(&target), step);
    let (next, clamped) = offset_within(bounds, pos, size, dx, dy);

    let moved = if next != pos && probe(world, next, size, Some(entity), limit).is_clear() {
        move_to(world, Occupant::new(entity, Kind::Unit), next)
    } else {
        let order = if dx.abs() >= dy.abs() {
            [(Axis::X, dx), (Axis::Y, dy)]
        } else {
            [(Axis::Y, dy), (Axis::X, dx)]
        };
        order
            .into_iter()
            .any(|(axis, amount)| amount != 0 && move_along_axis(world, entity, axis, amount))
    };

    if !moved {
        debug!(?entity, x = pos.x, y = pos.y, "unit stuck, retargeting");
        retarget(world, entity);
    } else if clamped {
        retarget(world, entity);
    }
    moved
}

/// Move any grid-tracked entity `amount` units along `axis` if the
/// destination is clear. The move is clamped to the map.
pub fn move_along_axis(world: &mut World, entity: Entity, axis: Axis, amount: i32) -> bool {
    let (Some((pos, size)), Some(kind)) = (footprint(world, entity), world.get::<Kind>(entity).copied())
    else {
        return false;
    };
    let config = world.resource::<SimConfig>();
    let (bounds, limit) = (config.bounds(), query_limit(config, kind));

    let (dx, dy) = axis.delta(amount);
    let (next, _) = offset_within(bounds, pos, size, dx, dy);
    if next == pos || !probe(world, next, size, Some(entity), limit).is_clear() {
        return false;
    }
    move_to(world, Occupant::new(entity, kind), next)
}

/// Send a unit towards a uniformly random point on the map.
pub fn retarget(world: &mut World, entity: Entity) {
    let bounds = world.resource::<SimConfig>().bounds();
    let target = world.resource_mut::<SimRng>().point_in(bounds);
    if let Some(mut unit) = world.get_mut::<Unit>(entity) {
        unit.target = target;
    }
}

/// Push a unit `distance` units along `angle`.
///
/// A unit in the way is pushed in turn, by the same distance scaled by
/// the area ratio of pusher to pushed (never more than `distance`). A
/// unit already absorbing a push yields half the distance. Structures,
/// players and chains deeper than `MAX_PUSH_DEPTH` stop the push.
///
/// Returns how far the unit actually moved, between 0 and `distance`.
pub fn pushed(world: &mut World, entity: Entity, angle: f32, distance: f32) -> f32 {
    push_with(world, entity, angle, distance, &mut PushContext::default())
}

fn push_with(world: &mut World, entity: Entity, angle: f32, distance: f32, ctx: &mut PushContext) -> f32 {
    if distance <= 0.0 || ctx.depth >= MAX_PUSH_DEPTH {
        return 0.0;
    }
    match world.get_mut::<Unit>(entity) {
        Some(mut unit) => unit.being_pushed = true,
        None => return 0.0,
    }

    ctx.depth += 1;
    let achieved = resolve_push(world, entity, angle, distance, ctx);
    ctx.depth -= 1;

    if let Some(mut unit) = world.get_mut::<Unit>(entity) {
        unit.being_pushed = false;
    }
    achieved.min(distance)
}

fn resolve_push(world: &mut World, entity: Entity, angle: f32, distance: f32, ctx: &mut PushContext) -> f32 {
    let Some((pos, size)) = footprint(world, entity) else {
        return 0.0;
    };
    let config = world.resource::<SimConfig>();
    let (bounds, limit) = (config.bounds(), query_limit(config, Kind::Unit));

    let Some((next, achieved)) = displaced(bounds, pos, size, angle, distance) else {
        return 0.0;
    };
    // The probe box is one unit smaller so that units already touching
    // the pusher are not reported.
    match probe(world, next, size.shrunk(1), Some(entity), limit) {
        Contact::Clear => {
            shove(world, entity, pos, next);
            achieved
        }
        Contact::Hit(other) if other.is_unit() => {
            let yielding = world
                .get::<Unit>(other.entity)
                .is_some_and(|unit| unit.being_pushed);
            let retry = if yielding {
                distance / 2.0
            } else {
                let other_area = world.get::<Size>(other.entity).map_or(0, Size::area);
                let scaled = if other_area == 0 {
                    distance
                } else {
                    (distance * size.area() as f32 / other_area as f32).min(distance)
                };
                push_with(world, other.entity, angle, scaled, ctx)
            };
            commit_if_clear(world, entity, pos, size, angle, retry, bounds, limit)
        }
        _ => 0.0,
    }
}

#[allow(clippy::too_many_arguments)]
fn commit_if_clear(
    world: &mut World,
    entity: Entity,
    pos: Position,
    size: Size,
    angle: f32,
    distance: f32,
    bounds: MapBounds,
    limit: usize,
) -> f32 {
    let Some((next, achieved)) = displaced(bounds, pos, size, angle, distance) else {
        return 0.0;
    };
    if !probe(world, next, size.shrunk(1), Some(entity), limit).is_clear() {
        return 0.0;
    }
    shove(world, entity, pos, next);
    achieved
}

/// Commit a push, keeping `last_step` as the interpolation origin.
fn shove(world: &mut World, entity: Entity, from: Position, to: Position) {
    if let Some(mut unit) = world.get_mut::<Unit>(entity) {
        unit.last_step = from;
    }
    move_to(world, Occupant::new(entity, Kind::Unit), to);
}

/// Where a push of `distance` along `angle` lands, and how far that is.
/// `None` if the entity would not move at all.
fn displaced(
    bounds: MapBounds,
    pos: Position,
    size: Size,
    angle: f32,
    distance: f32,
) -> Option<(Position, f32)> {
    let (dx, dy) = displacement(angle, distance);
    let (next, clamped) = offset_within(bounds, pos, size, dx, dy);
    if next == pos {
        return None;
    }
    let achieved = if clamped { pos.distance_to(&next) } else { distance };
    Some((next, achieved.min(distance)))
}

/// Integer displacement of a move, truncated towards zero. A move of at
/// least one unit never truncates to nothing: the dominant axis gets a
/// single step instead.
fn displacement(angle: f32, distance: f32) -> (i32, i32) {
    let (fx, fy) = vector(angle, distance);
    let (dx, dy) = (truncate(fx), truncate(fy));
    if dx != 0 || dy != 0 || distance < 1.0 {
        return (dx, dy);
    }
    if fx.abs() >= fy.abs() {
        (fx.signum() as i32, 0)
    } else {
        (0, fy.signum() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Structure;
    use crate::spatial::Grid;
    use crate::systems::lifecycle::create_unit;
    use crate::systems::structure::construct;
    use crate::systems::testing::{reset_scratch, small_world};

    fn at(world: &World, entity: Entity) -> Position {
        *world.get::<Position>(entity).unwrap()
    }

    fn set_target(world: &mut World, entity: Entity, target: Position) {
        world.get_mut::<Unit>(entity).unwrap().target = target;
    }

    #[test]
    fn test_steps_towards_target() {
        let mut world = small_world();
        let unit = create_unit(&mut world, 320, 320, 0).unwrap();
        set_target(&mut world, unit, Position::new(400, 320));

        let step = step_per_tick(90.0, world.resource::<SimConfig>().tick_rate());
        assert!(move_unit_toward(&mut world, unit));
        assert_eq!(at(&world, unit), Position::new(320 + truncate(step) as u16, 320));
        assert_eq!(world.get::<Unit>(unit).unwrap().last_step, Position::new(320, 320));
    }

    #[test]
    fn test_scout_moves_at_most_one_step_and_stays_on_map() {
        let mut world = small_world();
        let unit = create_unit(&mut world, 320, 320, 0).unwrap();
        let bounds = world.resource::<SimConfig>().bounds();
        let step = step_per_tick(90.0, world.resource::<SimConfig>().tick_rate());

        for _ in 0..500 {
            reset_scratch(&mut world);
            let before = at(&world, unit);
            move_unit_toward(&mut world, unit);
            let after = at(&world, unit);
            assert!(before.distance_to(&after) <= step + 1e-3, "{before:?} -> {after:?}");
            let size = *world.get::<Size>(unit).unwrap();
            assert!(bounds.contains(&crate::components::bounds(after, size)));
            assert!(world
                .resource::<Grid>()
                .contains(Occupant::new(unit, Kind::Unit), after));
        }
    }

    #[test]
    fn test_arrival_retargets() {
        let mut world = small_world();
        let unit = create_unit(&mut world, 320, 320, 0).unwrap();
        set_target(&mut world, unit, Position::new(321, 320));

        assert!(!move_unit_toward(&mut world, unit));
        assert_eq!(at(&world, unit), Position::new(320, 320));
        assert_ne!(world.get::<Unit>(unit).unwrap().target, Position::new(321, 320));
    }

    #[test]
    fn test_slides_along_free_axis() {
        let mut world = small_world();
        let unit = create_unit(&mut world, 100, 100, 0).unwrap();
        let _blocker = create_unit(&mut world, 100, 117, 0).unwrap();
        set_target(&mut world, unit, Position::new(200, 200));

        assert!(move_unit_toward(&mut world, unit));
        assert_eq!(at(&world, unit), Position::new(102, 100));
    }

    #[test]
    fn test_stuck_unit_retargets_in_place() {
        let mut world = small_world();
        let unit = create_unit(&mut world, 100, 100, 0).unwrap();
        for (x, y) in [(100, 117), (117, 100), (117, 117)] {
            create_unit(&mut world, x, y, 0).unwrap();
        }
        set_target(&mut world, unit, Position::new(200, 200));

        assert!(!move_unit_toward(&mut world, unit));
        assert_eq!(at(&world, unit), Position::new(100, 100));
        assert_ne!(world.get::<Unit>(unit).unwrap().target, Position::new(200, 200));
    }

    #[test]
    fn test_life_runs_out() {
        let mut world = small_world();
        let mortal = create_unit(&mut world, 100, 100, 1).unwrap();
        let immortal = create_unit(&mut world, 300, 300, 0).unwrap();
        world.get_mut::<Unit>(mortal).unwrap().life = 2;

        unit_system(&mut world);
        assert!(world.get::<Unit>(mortal).is_some());
        unit_system(&mut world);
        assert!(world.get::<Unit>(mortal).is_none());
        assert!(world.get::<Unit>(immortal).is_some());
        assert_eq!(world.resource::<Grid>().len(), 1);
    }

    #[test]
    fn test_push_into_open_space_moves_full_distance() {
        let mut world = small_world();
        let unit = create_unit(&mut world, 100, 100, 0).unwrap();
        assert_eq!(pushed(&mut world, unit, 0.0, 10.0), 10.0);
        assert_eq!(at(&world, unit), Position::new(110, 100));
        assert!(!world.get::<Unit>(unit).unwrap().being_pushed);
    }

    #[test]
    fn test_push_chains_into_equal_unit() {
        let mut world = small_world();
        let a = create_unit(&mut world, 100, 100, 0).unwrap();
        let b = create_unit(&mut world, 116, 100, 0).unwrap();

        let achieved = pushed(&mut world, a, 0.0, 10.0);
        assert_eq!(achieved, 10.0);
        assert_eq!(at(&world, b), Position::new(126, 100));
        assert_eq!(at(&world, a), Position::new(110, 100));
        assert!(!world.get::<Unit>(b).unwrap().being_pushed);
    }

    #[test]
    fn test_pushed_units_record_last_step() {
        let mut world = small_world();
        let a = create_unit(&mut world, 100, 100, 0).unwrap();
        let b = create_unit(&mut world, 116, 100, 0).unwrap();
        world.get_mut::<Unit>(b).unwrap().last_step = Position::new(90, 90);

        pushed(&mut world, a, 0.0, 10.0);
        assert_eq!(world.get::<Unit>(a).unwrap().last_step, Position::new(100, 100));
        assert_eq!(world.get::<Unit>(b).unwrap().last_step, Position::new(116, 100));
    }

    /// Touching scouts in a row along y = 300, starting at x = 100.
    fn scout_line(world: &mut World, len: u16) -> Vec<Entity> {
        (0..len)
            .map(|i| create_unit(world, 100 + i * 16, 300, 0).unwrap())
            .collect()
    }

    #[test]
    fn test_push_chain_up_to_depth_limit_propagates() {
        let mut world = small_world();
        let line = scout_line(&mut world, u16::from(MAX_PUSH_DEPTH));

        assert_eq!(pushed(&mut world, line[0], 0.0, 5.0), 5.0);
        for (i, unit) in line.iter().enumerate() {
            assert_eq!(at(&world, *unit), Position::new(105 + i as u16 * 16, 300));
        }
    }

    #[test]
    fn test_push_chain_past_depth_limit_moves_nothing() {
        let mut world = small_world();
        let line = scout_line(&mut world, u16::from(MAX_PUSH_DEPTH) + 2);

        assert_eq!(pushed(&mut world, line[0], 0.0, 5.0), 0.0);
        for (i, unit) in line.iter().enumerate() {
            assert_eq!(at(&world, *unit), Position::new(100 + i as u16 * 16, 300));
            assert!(!world.get::<Unit>(*unit).unwrap().being_pushed);
        }
    }

    #[test]
    fn test_overflowing_query_blocks_movement_when_configured() {
        use crate::config::OnQueryOverflow;
        use crate::systems::testing::world_with;

        let crowded = |policy| {
            let mut world = world_with(SimConfig {
                map_width: 640,
                map_height: 640,
                unit_query_limit: 2,
                on_query_overflow: policy,
                ..Default::default()
            });
            let unit = create_unit(&mut world, 100, 100, 0).unwrap();
            for (x, y) in [(150, 150), (170, 170)] {
                create_unit(&mut world, x, y, 0).unwrap();
            }
            set_target(&mut world, unit, Position::new(20, 100));
            (world, unit)
        };

        let (mut world, unit) = crowded(OnQueryOverflow::AssumeBlocked);
        assert!(!move_unit_toward(&mut world, unit));
        assert_eq!(at(&world, unit), Position::new(100, 100));

        let (mut world, unit) = crowded(OnQueryOverflow::AssumeClear);
        assert!(move_unit_toward(&mut world, unit));
        assert!(at(&world, unit).x < 100);
    }

    #[test]
    fn test_push_into_yielding_unit_halves() {
        let mut world = small_world();
        let a = create_unit(&mut world, 100, 100, 0).unwrap();
        let b = create_unit(&mut world, 124, 100, 0).unwrap();
        world.get_mut::<Unit>(b).unwrap().being_pushed = true;

        assert_eq!(pushed(&mut world, a, 0.0, 10.0), 5.0);
        assert_eq!(at(&world, a), Position::new(105, 100));
        assert_eq!(at(&world, b), Position::new(124, 100));
    }

    #[test]
    fn test_push_against_structure_fails() {
        let mut world = small_world();
        let a = create_unit(&mut world, 100, 100, 0).unwrap();
        let wall = construct(&mut world, 130, 100, 2).unwrap();
        assert!(world.get::<Structure>(wall).is_some());

        assert_eq!(pushed(&mut world, a, 0.0, 10.0), 0.0);
        assert_eq!(at(&world, a), Position::new(100, 100));
        assert!(!world.get::<Unit>(a).unwrap().being_pushed);
    }

    #[test]
    fn test_push_clamped_at_map_edge() {
        let mut world = small_world();
        let a = create_unit(&mut world, 630, 100, 0).unwrap();
        assert_eq!(pushed(&mut world, a, 0.0, 10.0), 2.0);
        assert_eq!(at(&world, a), Position::new(632, 100));
        assert_eq!(pushed(&mut world, a, 0.0, 10.0), 0.0);
    }

    #[test]
    fn test_push_never_exceeds_request() {
        let mut world = small_world();
        let mut line = Vec::new();
        for i in 0..12 {
            line.push(create_unit(&mut world, 100 + i * 16, 300, 0).unwrap());
        }
        // Mixed sizes ahead of the line.
        create_unit(&mut world, 300, 300, 2).unwrap();

        for distance in [0.5, 1.0, 3.6, 7.0, 12.0] {
            reset_scratch(&mut world);
            let achieved = pushed(&mut world, line[0], 0.0, distance);
            assert!((0.0..=distance).contains(&achieved), "{achieved} > {distance}");
        }
        for unit in line {
            assert!(!world.get::<Unit>(unit).unwrap().being_pushed);
        }
    }

    #[test]
    fn test_displacement_nudges_short_diagonals() {
        assert_eq!(displacement(0.3, 1.0), (1, 0));
        assert_eq!(displacement(1.2, 1.0), (0, 1));
        assert_eq!(displacement(0.0, 0.5), (0, 0));
        assert_eq!(displacement(std::f32::consts::PI, 3.0), (-3, 0));
    }
}
