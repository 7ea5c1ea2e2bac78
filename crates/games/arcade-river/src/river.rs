//! Banks, the river pit, log rows and the row-by-row progress track.

use arcade_core::config::SimConfig;
use arcade_core::entity::{ObstacleKind, PlayerState, Track};
use arcade_core::geom::{Aabb, Arena, Vec2};
use arcade_core::player::Player;
use arcade_core::snapshot::Snapshot;

use crate::config::RiverConfig;

/// Spreads log phases between rows so no column lines up.
const ROW_PHASE: f32 = 97.0;

/// Top and bottom edges of the water.
pub fn water(config: &RiverConfig, arena: Arena) -> (f32, f32) {
    let bottom = arena.height - config.bank_depth;
    let top = (bottom - config.rows as f32 * config.row_height).max(config.finish_depth);
    (top, bottom)
}

/// Vertical extent of row `row`, counted upward from the near bank.
fn row_band(config: &RiverConfig, arena: Arena, row: u32) -> (f32, f32) {
    let (top, bottom) = water(config, arena);
    let max = bottom - row as f32 * config.row_height;
    ((max - config.row_height).max(top), max)
}

pub fn build(config: &RiverConfig, sim: &SimConfig, players: &[Player]) -> Snapshot {
    let arena = sim.arena();
    let w = arena.width;
    let (top, bottom) = water(config, arena);
    let mut snap = Snapshot::new(arena);

    snap.add_obstacle(
        ObstacleKind::Pit,
        Aabb::new(Vec2::new(0.0, top), Vec2::new(w, bottom)),
        Vec2::ZERO,
    );

    let logs = config.logs_per_row.max(1);
    let spacing = w / logs as f32;
    let mut checkpoints = Vec::with_capacity(config.rows as usize + 1);
    for row in 0..config.rows {
        let (y_min, y_max) = row_band(config, arena, row);
        let speed = config.log_speed + config.log_speed_step * (row % 3) as f32;
        let drift = if row % 2 == 0 { speed } else { -speed };
        let phase = (row as f32 * ROW_PHASE) % spacing;
        for i in 0..logs {
            let x = phase + i as f32 * spacing;
            snap.add_obstacle(
                ObstacleKind::Platform,
                Aabb::new(Vec2::new(x, y_min), Vec2::new(x + config.log_width, y_max)),
                Vec2::new(drift, 0.0),
            );
        }
        checkpoints.push(Aabb::new(Vec2::new(0.0, y_min), Vec2::new(w, y_max)));
    }

    // Reaching the far bank's finish strip completes the single lap
    let finish = Aabb::new(Vec2::ZERO, Vec2::new(w, config.finish_depth));
    checkpoints.push(finish);
    snap.track = Some(Track {
        checkpoints,
        laps: 1,
    });
    snap.finish = Some(finish);

    let crossers: Vec<&Player> = players.iter().filter(|p| !p.is_spectator).collect();
    let start_y = (bottom + arena.height) / 2.0;
    let slots = crossers.len() as f32 + 1.0;
    for (i, player) in crossers.iter().enumerate() {
        let mut state = PlayerState::new(
            player.id,
            Vec2::new(w * (i as f32 + 1.0) / slots, start_y),
            sim.movement.player_radius,
            sim.movement.max_health,
        );
        state.heading = -std::f32::consts::FRAC_PI_2;
        snap.add_player(state);
    }
    snap
}
