//! Basic demonstration of the RTS simulation.
//!
//! Run with: cargo run --example basic_demo
//! Set `RUST_LOG=rts_sim=debug` to see grid samples and spawn events.

use rts_sim::{InputState, SimConfig, SimWorld};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    let config = SimConfig {
        profile: true,
        debug_sample_interval: 60,
        ..Default::default()
    };
    let mut sim = match SimWorld::with_config(config) {
        Ok(sim) => sim,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            return;
        }
    };

    let (cx, cy) = sim.config().bounds().center();
    sim.create_local_player(cx, cy);
    for (i, class) in [0u8, 1, 2].into_iter().enumerate() {
        let x = cx - 200 + i as u16 * 200;
        if let Err(err) = sim.construct(x, cy - 150, class) {
            tracing::warn!(error = %err, "structure not placed");
        }
    }
    for i in 0..40u16 {
        let (x, y) = (cx - 300 + (i % 10) * 60, cy + 100 + (i / 10) * 50);
        if let Err(err) = sim.create_unit(x, y, (i % 3) as u8) {
            tracing::warn!(error = %err, "unit not spawned");
        }
    }

    print_summary(&mut sim);

    // Walk right for two seconds, then place an outpost to the east.
    sim.set_input(InputState::new(InputState::RIGHT));
    run_for(&mut sim, 2.0);
    sim.set_input(InputState::new(
        InputState::build_select(1) | InputState::BUILD_CONFIRM,
    ));
    sim.tick();
    sim.set_input(InputState::default());

    // Ten seconds of autonomous movement and spawning.
    for _ in 0..5 {
        run_for(&mut sim, 2.0);
        print_summary(&mut sim);
    }

    if let Some(profiler) = sim.profiler() {
        profiler.log_summary();
    }

    println!("\n=== Final State (JSON) ===\n");
    match sim.snapshot().to_json_pretty() {
        Ok(json) => println!("{json}"),
        Err(err) => tracing::error!(error = %err, "snapshot serialization failed"),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Feed the simulation 60 Hz frames for `seconds` of game time.
fn run_for(sim: &mut SimWorld, seconds: f32) {
    let frame_dt = 1.0 / 60.0;
    let frames = (seconds / frame_dt) as usize;
    for _ in 0..frames {
        sim.step(frame_dt);
    }
}

fn print_summary(sim: &mut SimWorld) {
    let snapshot = sim.snapshot();
    info!(
        tick = snapshot.tick,
        time = format_args!("{:.1}s", snapshot.time),
        players = snapshot.players.len(),
        units = snapshot.units.len(),
        structures = snapshot.structures.len(),
        occupied_cells = snapshot.grid.occupied_cells,
        "world state"
    );
    if let Some(player) = snapshot.players.iter().find(|p| p.local) {
        info!(
            x = player.body.x,
            y = player.body.y,
            facing = ?player.facing,
            build_guide = ?player.build_guide,
            "local player"
        );
    }
}
