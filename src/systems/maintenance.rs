//! Per-tick grid upkeep.

use super::SimTick;
use crate::config::SimConfig;
use crate::spatial::Grid;
use bevy_ecs::prelude::*;
use tracing::debug;

/// First phase of every tick: reclaim the scratch buffer, refresh
/// sections, and periodically sample grid statistics.
pub fn grid_refresh_system(mut grid: ResMut<Grid>, tick: Res<SimTick>, config: Res<SimConfig>) {
    grid.reset_scratch();
    let rebuilt = grid.refresh_sections();

    if tick.every(config.debug_sample_interval) {
        let stats = grid.stats();
        debug!(
            tick = tick.0,
            rebuilt,
            occupants = stats.occupants,
            occupied_cells = stats.occupied_cells,
            largest_cell = stats.largest_cell,
            largest_cell_at = ?stats.largest_cell_at,
            "grid sample"
        );
    }
}
