//! Rectangular circuit: a solid infield, one lane around it, a checkpoint
//! gate across each straight.

use arcade_core::config::SimConfig;
use arcade_core::effects::ResourceKind;
use arcade_core::entity::{ObstacleKind, PlayerState, Track};
use arcade_core::geom::{Aabb, Arena, Vec2};
use arcade_core::player::Player;
use arcade_core::snapshot::Snapshot;

use crate::config::RacingConfig;

/// Racers per grid column.
const GRID_ROWS: usize = 3;
const GRID_ROW_SPACING: f32 = 55.0;
const GRID_COLUMN_SPACING: f32 = 50.0;

/// Lane centerline corners in driving order, starting bottom-right.
pub fn corners(arena: Arena, lane: f32) -> [Vec2; 4] {
    let (w, h) = (arena.width, arena.height);
    let half = lane / 2.0;
    [
        Vec2::new(w - half, h - half),
        Vec2::new(w - half, half),
        Vec2::new(half, half),
        Vec2::new(half, h - half),
    ]
}

/// Checkpoint gates in lap order: right, top, left, then the bottom
/// straight, which doubles as the finish line.
pub fn gates(arena: Arena, lane: f32, gate: f32) -> Vec<Aabb> {
    let (w, h) = (arena.width, arena.height);
    vec![
        Aabb::new(Vec2::new(w - lane, h / 2.0 - gate), Vec2::new(w, h / 2.0 + gate)),
        Aabb::new(Vec2::new(w / 2.0 - gate, 0.0), Vec2::new(w / 2.0 + gate, lane)),
        Aabb::new(Vec2::new(0.0, h / 2.0 - gate), Vec2::new(lane, h / 2.0 + gate)),
        Aabb::new(Vec2::new(w / 2.0 - gate, h - lane), Vec2::new(w / 2.0 + gate, h)),
    ]
}

/// Starting grid on the bottom straight, behind the finish gate.
fn grid_slot(arena: Arena, lane: f32, index: usize) -> Vec2 {
    let column = (index / GRID_ROWS) as f32;
    let row = (index % GRID_ROWS) as f32;
    Vec2::new(
        arena.width * 0.3 - column * GRID_COLUMN_SPACING,
        arena.height - lane + 40.0 + row * GRID_ROW_SPACING,
    )
}

pub fn build(config: &RacingConfig, sim: &SimConfig, players: &[Player]) -> Snapshot {
    let arena = sim.arena();
    let lane = config.lane_width;
    let (w, h) = (arena.width, arena.height);
    let mut snap = Snapshot::new(arena);

    snap.add_obstacle(
        ObstacleKind::Barrier,
        Aabb::new(Vec2::new(lane, lane), Vec2::new(w - lane, h - lane)),
        Vec2::ZERO,
    );
    // Oil on the top and right straights, spikes on the left and bottom
    snap.add_obstacle(
        ObstacleKind::Oil,
        Aabb::new(
            Vec2::new(w * 0.3, lane * 0.4),
            Vec2::new(w * 0.36, lane * 0.65),
        ),
        Vec2::ZERO,
    );
    snap.add_obstacle(
        ObstacleKind::Oil,
        Aabb::new(
            Vec2::new(w - lane * 0.7, h * 0.31),
            Vec2::new(w - lane * 0.4, h * 0.39),
        ),
        Vec2::ZERO,
    );
    snap.add_obstacle(
        ObstacleKind::Spike,
        Aabb::new(
            Vec2::new(lane * 0.3, h * 0.6),
            Vec2::new(lane * 0.6, h * 0.67),
        ),
        Vec2::ZERO,
    );
    snap.add_obstacle(
        ObstacleKind::Spike,
        Aabb::new(
            Vec2::new(w * 0.65, h - lane * 0.5),
            Vec2::new(w * 0.7, h - lane * 0.3),
        ),
        Vec2::ZERO,
    );

    snap.track = Some(Track {
        checkpoints: gates(arena, lane, config.gate_half_width),
        laps: config.laps.max(1),
    });

    let racers = players.iter().filter(|p| !p.is_spectator);
    for (index, player) in racers.enumerate() {
        let mut state = PlayerState::new(
            player.id,
            grid_slot(arena, lane, index),
            sim.movement.player_radius,
            sim.movement.max_health,
        );
        if config.starting_nitro > 0 {
            state.effects.add_resource(
                ResourceKind::Nitro,
                config.starting_nitro,
                sim.powerups.resource_cap,
            );
        }
        snap.add_player(state);
    }
    snap
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::test_helpers::make_players;

    fn infield(snap: &Snapshot) -> Aabb {
        snap.obstacles
            .iter()
            .find(|o| o.kind == ObstacleKind::Barrier)
            .map(|o| o.bounds)
            .unwrap()
    }

    #[test]
    fn full_grid_fits_the_bottom_lane() {
        let cfg = RacingConfig::default();
        let snap = build(&cfg, &cfg.sim, &make_players(8));
        let barrier = infield(&snap);
        for p in snap.players.values() {
            assert!(snap.arena.contains(p.position));
            assert!(!barrier.overlaps_circle(p.position, p.radius));
            assert!(p.position.y > barrier.max.y);
            assert_eq!(p.heading, 0.0);
        }
    }

    #[test]
    fn gates_cross_the_lanes() {
        let cfg = RacingConfig::default();
        let snap = build(&cfg, &cfg.sim, &make_players(1));
        let track = snap.track.as_ref().unwrap();
        assert_eq!(track.checkpoints.len(), 4);
        assert_eq!(track.laps, 3);
        let barrier = infield(&snap);
        for (gate, corner) in track.checkpoints.iter().zip(corners(snap.arena, 200.0)) {
            assert!(!barrier.contains(gate.center()));
            assert!(snap.arena.contains(corner));
        }
    }

    #[test]
    fn racers_start_with_nitro() {
        let cfg = RacingConfig::default();
        let snap = build(&cfg, &cfg.sim, &make_players(2));
        assert_eq!(snap.players[&1].effects.resource(ResourceKind::Nitro), 1);
    }
}
