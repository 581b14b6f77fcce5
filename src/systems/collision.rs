//! Collision probing on top of grid section queries.

use crate::components::{bounds, Kind, Occupant, Position, Size};
use crate::config::{OnQueryOverflow, SimConfig};
use crate::error::GridError;
use crate::spatial::Grid;
use bevy_ecs::prelude::*;
use tracing::warn;

/// Outcome of a collision probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    Clear,
    Hit(Occupant),
    /// The query failed and the overflow policy says to assume the worst.
    Blocked,
}

impl Contact {
    pub fn is_clear(&self) -> bool {
        matches!(self, Contact::Clear)
    }
}

impl OnQueryOverflow {
    fn resolve(self) -> Contact {
        match self {
            OnQueryOverflow::AssumeClear => Contact::Clear,
            OnQueryOverflow::AssumeBlocked => Contact::Blocked,
        }
    }
}

/// First occupant whose box strictly overlaps a `size` footprint at `pos`.
///
/// Candidates come from a section query around `pos`, in query
/// order, so with several overlaps the one reported is not necessarily
/// the nearest. `exclude` is skipped.
pub fn collides_with(
    grid: &mut Grid,
    world: &World,
    pos: Position,
    size: Size,
    exclude: Option<Entity>,
    limit: usize,
) -> Result<Option<Occupant>, GridError> {
    let probe_box = bounds(pos, size);
    let candidates = grid.query_section(pos.x, pos.y, limit)?;
    for occupant in candidates {
        if Some(occupant.entity) == exclude {
            continue;
        }
        let (Some(at), Some(footprint)) = (
            world.get::<Position>(occupant.entity),
            world.get::<Size>(occupant.entity),
        ) else {
            continue;
        };
        if probe_box.overlaps(&bounds(*at, *footprint)) {
            return Ok(Some(*occupant));
        }
    }
    Ok(None)
}

/// `collides_with` against the world's grid, with query failures mapped
/// through the configured `OnQueryOverflow` policy.
pub fn probe(
    world: &mut World,
    pos: Position,
    size: Size,
    exclude: Option<Entity>,
    limit: usize,
) -> Contact {
    let policy = world.resource::<SimConfig>().on_query_overflow;
    world.resource_scope(|world, mut grid: Mut<Grid>| {
        match collides_with(&mut grid, world, pos, size, exclude, limit) {
            Ok(None) => Contact::Clear,
            Ok(Some(occupant)) => Contact::Hit(occupant),
            Err(err) => {
                warn!(x = pos.x, y = pos.y, error = %err, ?policy, "collision query failed");
                policy.resolve()
            }
        }
    })
}

/// Query limit for probes issued on behalf of `kind`.
pub fn query_limit(config: &SimConfig, kind: Kind) -> usize {
    match kind {
        Kind::Player => config.player_query_limit,
        Kind::Unit => config.unit_query_limit,
        Kind::Structure => config.structure_query_limit,
    }
}

/// Current position and footprint of an entity.
pub fn footprint(world: &World, entity: Entity) -> Option<(Position, Size)> {
    Some((*world.get::<Position>(entity)?, *world.get::<Size>(entity)?))
}
