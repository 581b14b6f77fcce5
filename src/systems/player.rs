//! Local player movement, pushing and build placement.

use super::collision::{footprint, probe, query_limit, Contact};
use super::entities_with;
use super::lifecycle::{move_to, offset_within};
use super::structure::place;
use super::unit::pushed;
use crate::components::{Kind, Occupant, Player};
use crate::config::SimConfig;
use crate::geometry::{step_per_tick, truncate, Axis, Direction};
use crate::input::InputState;
use crate::presets::{player_preset, structure_preset};
use bevy_ecs::prelude::*;
use tracing::debug;

/// Fraction of a player's step passed on to a unit it walks into.
pub const PUSH_RESISTANCE: f32 = 0.9;

/// Apply this tick's input to every local player.
pub fn player_system(world: &mut World) {
    let input = *world.resource::<InputState>();
    for entity in entities_with::<Player>(world) {
        if world.get::<Player>(entity).is_some_and(Player::is_local) {
            update(world, entity, input);
        }
    }
}

fn update(world: &mut World, entity: Entity, input: InputState) {
    let (dx, dy) = input.axes();
    if let Some(facing) = Direction::from_axes(dx, dy) {
        if let Some(mut player) = world.get_mut::<Player>(entity) {
            player.facing = facing;
        }
    }
    if dx != 0 || dy != 0 {
        walk(world, entity, dx, dy);
    }
    build(world, entity, input);
}

/// Move each active axis independently. A blocked axis stays put unless
/// it is the only one moving and a unit is in the way, in which case the
/// unit is pushed and the player follows as far as it went.
fn walk(world: &mut World, entity: Entity, dx: i32, dy: i32) {
    let Some(control) = world.get::<Player>(entity).map(|player| player.control) else {
        return;
    };
    let config = world.resource::<SimConfig>();
    let step = truncate(step_per_tick(player_preset(control).speed, config.tick_rate())).max(1);
    let (bounds, limit) = (config.bounds(), query_limit(config, Kind::Player));
    let occupant = Occupant::new(entity, Kind::Player);

    for (axis, sign, other) in [(Axis::X, dx, dy), (Axis::Y, dy, dx)] {
        if sign == 0 {
            continue;
        }
        let Some((pos, size)) = footprint(world, entity) else {
            return;
        };
        let (ox, oy) = axis.delta(sign * step);
        let (next, _) = offset_within(bounds, pos, size, ox, oy);
        if next == pos {
            continue;
        }

        match probe(world, next, size, Some(entity), limit) {
            Contact::Clear => {
                move_to(world, occupant, next);
            }
            Contact::Hit(obstacle) if obstacle.is_unit() && other == 0 => {
                let force = step as f32 * PUSH_RESISTANCE;
                let achieved = pushed(world, obstacle.entity, axis.angle(sign), force);
                let shift = sign * truncate(achieved);
                if shift == 0 {
                    continue;
                }
                let (ox, oy) = axis.delta(shift);
                let (next, _) = offset_within(bounds, pos, size, ox, oy);
                if next != pos && probe(world, next, size, Some(entity), limit).is_clear() {
                    move_to(world, occupant, next);
                }
            }
            _ => {}
        }
    }
}

/// Build guide handling: select, cancel, confirm.
fn build(world: &mut World, entity: Entity, input: InputState) {
    let (class, facing) = {
        let Some(mut player) = world.get_mut::<Player>(entity) else {
            return;
        };
        if let Some(class) = input.selected_class() {
            player.build_guide = Some(class);
        }
        if input.contains(InputState::BUILD_CANCEL) {
            player.build_guide = None;
            return;
        }
        match player.build_guide {
            Some(class) if input.contains(InputState::BUILD_CONFIRM) => (class, player.facing),
            _ => return,
        }
    };

    let Some((pos, size)) = footprint(world, entity) else {
        return;
    };
    let Some(preset) = structure_preset(class) else {
        debug!(?entity, class, "unknown structure class in build guide");
        return;
    };
    // One footprint ahead, flush with the player's edge.
    let (fx, fy) = facing.offset();
    let x = i32::from(pos.x) + fx * i32::from(size.w / 2 + preset.size.w / 2);
    let y = i32::from(pos.y) + fy * i32::from(size.h / 2 + preset.size.h / 2);

    match place(world, x, y, class) {
        Ok(structure) => {
            debug!(?entity, ?structure, class, "structure placed");
            if let Some(mut player) = world.get_mut::<Player>(entity) {
                player.build_guide = None;
            }
        }
        Err(err) => debug!(?entity, class, error = %err, "placement rejected"),
    }
}
