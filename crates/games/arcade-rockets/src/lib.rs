pub mod bot;
pub mod config;

use std::time::Duration;

use arcade_core::arcade_game_boilerplate;
use arcade_core::game_trait::{ArcadeGame, GameConfig, GameMetadata, PlayerId};
use arcade_core::intent::IntentProvider;
use arcade_core::player::Player;
use arcade_core::sim::Simulation;
use arcade_core::snapshot::Snapshot;

use bot::RocketBot;
use config::RocketsConfig;

/// Rocket dodge: homing rockets launch from the arena edges at random
/// survivors. Every second alive scores a point.
pub struct RocketDodge {
    sim: Simulation,
    game_config: RocketsConfig,
}

impl RocketDodge {
    pub fn new() -> Self {
        Self::with_config(RocketsConfig::load())
    }

    pub fn with_config(config: RocketsConfig) -> Self {
        let layout = Snapshot::new(config.sim.arena());
        Self {
            sim: Simulation::new(config.sim.clone(), layout),
            game_config: config,
        }
    }

    pub fn config(&self) -> &RocketsConfig {
        &self.game_config
    }
}

impl Default for RocketDodge {
    fn default() -> Self {
        Self::new()
    }
}

impl ArcadeGame for RocketDodge {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Rocket Dodge".to_string(),
            description: "Outlast the homing rockets".to_string(),
            min_players: 1,
            max_players: 8,
            estimated_round_duration: Duration::from_secs(90),
        }
    }

    fn init(&mut self, players: &[Player], config: &GameConfig) {
        let sim_config = self.game_config.sim.for_match(config);
        let layout = Snapshot::ring_layout(&sim_config, players, self.game_config.spawn_ring);
        tracing::debug!(players = layout.players.len(), "Rocket arena built");
        self.sim = Simulation::new(sim_config, layout);
    }

    fn tick_rate(&self) -> f32 {
        1000.0 / self.sim.config().tick_ms as f32
    }

    fn bot(&self, _player_id: PlayerId) -> Box<dyn IntentProvider> {
        Box::new(RocketBot::new(
            self.game_config.bot_danger_radius,
            self.game_config.bot_wall_margin,
        ))
    }

    arcade_game_boilerplate!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::entity::Payload;
    use arcade_core::events::SimEvent;
    use arcade_core::phase::{EndReason, Phase};
    use arcade_core::test_helpers::{self, default_config, make_players, run_ticks};

    fn quick_config() -> RocketsConfig {
        let mut cfg = RocketsConfig::default();
        cfg.sim.countdown_ms = 0;
        cfg
    }

    fn make_game(player_count: usize) -> RocketDodge {
        let mut game = RocketDodge::with_config(quick_config());
        game.init(&make_players(player_count), &default_config(0, 9));
        game
    }

    // ================================================================
    // Rockets
    // ================================================================

    #[test]
    fn first_rocket_launches_from_an_edge_after_one_interval() {
        let mut game = make_game(2);
        game.start();
        let interval = game.sim.config().ticks(1500) as usize;
        assert!(
            run_ticks(&mut game, interval - 1)
                .iter()
                .all(|e| !matches!(e, SimEvent::HazardSpawned { .. }))
        );
        let events = game.update();
        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::HazardSpawned {
                payload: Payload::Homing,
                owner: None,
                ..
            }
        )));
        let snap = game.snapshot();
        let rocket = &snap.hazards[0];
        assert!(rocket.tracking.is_some());
        let (w, h) = (snap.arena.width, snap.arena.height);
        let p = rocket.position;
        let margin = 20.0;
        assert!(p.x < margin || p.y < margin || p.x > w - margin || p.y > h - margin);
    }

    #[test]
    fn standing_still_gets_you_hit() {
        let mut game = make_game(1);
        game.start();
        let events = run_ticks(&mut game, 400);
        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::Damaged {
                player_id: 1,
                source: None,
                ..
            }
        )));
        assert!(game.snapshot().players[&1].health < 3);
    }

    #[test]
    fn survivors_score_each_second() {
        let mut cfg = quick_config();
        cfg.sim.spawns.hazard_interval_ms = 0;
        let mut game = RocketDodge::with_config(cfg);
        game.init(&make_players(2), &default_config(0, 1));
        game.start();
        run_ticks(&mut game, 100);
        let snap = game.snapshot();
        assert_eq!(snap.players[&1].score, 5);
        assert_eq!(snap.players[&2].score, 5);
    }

    #[test]
    fn short_round_ends_on_time_or_elimination() {
        let mut game = make_game(2);
        game.init(&make_players(2), &default_config(15, 4));
        test_helpers::contract_match_eventually_ends(&mut game, 400);
        let result = game.result().unwrap();
        assert!(matches!(
            result.reason,
            EndReason::TimeUp | EndReason::LastSurvivor | EndReason::AllEliminated
        ));
    }

    #[test]
    fn bots_play_a_full_match() {
        let mut game = make_game(2);
        let mut bots: Vec<(PlayerId, Box<dyn IntentProvider>)> =
            (1..=2).map(|id| (id, game.bot(id))).collect();
        game.start();
        for _ in 0..2000 {
            let snap = game.snapshot();
            for (id, bot) in &mut bots {
                let intent = bot.next_intent(&snap, *id);
                game.set_intent(*id, intent);
            }
            game.update();
            if game.phase() == Phase::Ended {
                break;
            }
        }
        assert_eq!(game.phase(), Phase::Ended);
        assert_eq!(game.result().unwrap().scores.len(), 2);
        let snap = game.snapshot();
        assert!(snap.players.values().all(|p| snap.arena.contains(p.position)));
    }

    // ================================================================
    // Contract tests
    // ================================================================

    #[test]
    fn contract_init_creates_player_state() {
        let mut game = RocketDodge::with_config(quick_config());
        test_helpers::contract_init_creates_player_state(&mut game, 5);
    }

    #[test]
    fn contract_start_advances_ticks() {
        let mut game = make_game(1);
        test_helpers::contract_start_advances_ticks(&mut game);
    }

    #[test]
    fn contract_malformed_input_ignored() {
        let mut game = make_game(2);
        test_helpers::contract_malformed_input_ignored(&mut game, 1);
    }

    #[test]
    fn contract_invariants_hold() {
        let mut game = make_game(4);
        game.start();
        test_helpers::contract_invariants_hold(&mut game, &make_players(4), 800, 0);
    }

    #[test]
    fn contract_deterministic() {
        test_helpers::contract_deterministic(
            &|| Box::new(RocketDodge::with_config(quick_config())),
            3,
            400,
        );
    }

    #[test]
    fn contract_reset_restores_layout() {
        let mut game = make_game(2);
        test_helpers::contract_reset_restores_layout(&mut game, &make_players(2));
    }
}
