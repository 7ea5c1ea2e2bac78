pub mod bot;
pub mod config;
pub mod river;

use std::time::Duration;

use arcade_core::arcade_game_boilerplate;
use arcade_core::game_trait::{ArcadeGame, GameConfig, GameMetadata, PlayerId};
use arcade_core::intent::IntentProvider;
use arcade_core::player::Player;
use arcade_core::sim::Simulation;
use arcade_core::snapshot::Snapshot;

use bot::RiverBot;
use config::RiverConfig;

/// Cross the river by hopping between drifting logs. Open water is fatal;
/// first across to the far bank wins, otherwise the furthest row reached.
pub struct RiverCrossing {
    sim: Simulation,
    game_config: RiverConfig,
}

impl RiverCrossing {
    pub fn new() -> Self {
        Self::with_config(RiverConfig::load())
    }

    pub fn with_config(config: RiverConfig) -> Self {
        let layout = Snapshot::new(config.sim.arena());
        Self {
            sim: Simulation::new(config.sim.clone(), layout),
            game_config: config,
        }
    }

    pub fn config(&self) -> &RiverConfig {
        &self.game_config
    }
}

impl Default for RiverCrossing {
    fn default() -> Self {
        Self::new()
    }
}

impl ArcadeGame for RiverCrossing {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "River Crossing".to_string(),
            description: "Ride the logs to the far bank without getting wet".to_string(),
            min_players: 1,
            max_players: 6,
            estimated_round_duration: Duration::from_secs(90),
        }
    }

    fn init(&mut self, players: &[Player], config: &GameConfig) {
        let sim_config = self.game_config.sim.for_match(config);
        let layout = river::build(&self.game_config, &sim_config, players);
        tracing::debug!(
            players = layout.players.len(),
            rows = self.game_config.rows,
            "River laid out"
        );
        self.sim = Simulation::new(sim_config, layout);
    }

    fn tick_rate(&self) -> f32 {
        1000.0 / self.sim.config().tick_ms as f32
    }

    fn bot(&self, _player_id: PlayerId) -> Box<dyn IntentProvider> {
        Box::new(RiverBot::new(
            self.game_config.bot_lookahead,
            self.game_config.bot_footing_margin,
        ))
    }

    arcade_game_boilerplate!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::entity::ObstacleKind;
    use arcade_core::events::{EliminationCause, SimEvent};
    use arcade_core::geom::Vec2;
    use arcade_core::intent::Intent;
    use arcade_core::phase::{EndReason, Phase};
    use arcade_core::test_helpers::{self, default_config, make_players};

    fn quick_config() -> RiverConfig {
        let mut cfg = RiverConfig::default();
        cfg.sim.countdown_ms = 0;
        cfg
    }

    fn make_game(player_count: usize) -> RiverCrossing {
        let mut game = RiverCrossing::with_config(quick_config());
        game.init(&make_players(player_count), &default_config(0, 3));
        game
    }

    fn hop() -> Intent {
        Intent {
            up: true,
            ..Default::default()
        }
    }

    /// A simulation over the default river with player 1 moved to `at`.
    fn placed(at: Vec2, players: usize) -> Simulation {
        let cfg = quick_config();
        let mut layout = river::build(&cfg, &cfg.sim, &make_players(players));
        layout.players.get_mut(&1).unwrap().position = at;
        let mut sim = Simulation::new(cfg.sim.clone(), layout);
        sim.start();
        sim
    }

    // ================================================================
    // Water and logs
    // ================================================================

    #[test]
    fn open_water_is_fatal() {
        // Player 1 of 1 starts at x = 300, between the two row-0 logs as
        // they drift right
        let mut game = make_game(1);
        game.start();
        let mut events = Vec::new();
        for _ in 0..30 {
            game.set_intent(1, hop());
            events.extend(game.update());
        }
        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::Eliminated {
                player_id: 1,
                cause: EliminationCause::Fell,
                ..
            }
        )));
        assert!(!game.snapshot().players[&1].alive);
    }

    #[test]
    fn logs_carry_their_riders() {
        // Second row-0 log spans x 300..450, y 555..620
        let mut sim = placed(Vec2::new(375.0, 590.0), 1);
        for _ in 0..20 {
            sim.tick();
        }
        let snap = sim.snapshot();
        let me = &snap.players[&1];
        assert!(me.alive);
        assert!(me.riding.is_some());
        assert!(me.position.x > 390.0);
        let log = snap
            .obstacles
            .iter()
            .find(|o| Some(o.id) == me.riding)
            .unwrap();
        assert_eq!(log.kind, ObstacleKind::Platform);
        assert!(log.bounds.contains(me.position));
    }

    #[test]
    fn first_row_counts_as_progress() {
        let mut sim = placed(Vec2::new(375.0, 630.0), 1);
        let mut passed = false;
        for _ in 0..6 {
            sim.set_intent(1, hop());
            passed |= sim.tick().iter().any(|e| {
                matches!(
                    e,
                    SimEvent::CheckpointPassed {
                        player_id: 1,
                        index: 0
                    }
                )
            });
        }
        assert!(passed);
        let snap = sim.snapshot();
        assert!(snap.players[&1].alive);
        assert_eq!(snap.players[&1].progress.checkpoints_passed, 1);
    }

    #[test]
    fn reaching_the_far_bank_wins() {
        let mut sim = placed(Vec2::new(300.0, 90.0), 2);
        for _ in 0..5 {
            sim.set_intent(1, hop());
            sim.tick();
        }
        assert_eq!(sim.phase(), Phase::Ended);
        let result = sim.result().unwrap();
        assert_eq!(result.winner, Some(1));
        assert_eq!(result.reason, EndReason::Objective);
    }

    #[test]
    fn bots_make_it_across() {
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
        let snap = game.snapshot();
        assert!(
            snap.players
                .values()
                .any(|p| p.progress.checkpoints_passed >= 3)
        );
    }

    // ================================================================
    // Contract tests
    // ================================================================

    #[test]
    fn contract_init_creates_player_state() {
        let mut game = RiverCrossing::with_config(quick_config());
        test_helpers::contract_init_creates_player_state(&mut game, 4);
    }

    #[test]
    fn contract_start_advances_ticks() {
        let mut game = make_game(2);
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
            &|| Box::new(RiverCrossing::with_config(quick_config())),
            3,
            400,
        );
    }

    #[test]
    fn contract_reset_restores_layout() {
        let mut game = make_game(3);
        test_helpers::contract_reset_restores_layout(&mut game, &make_players(3));
    }

    #[test]
    fn contract_match_eventually_ends() {
        let mut game = RiverCrossing::with_config(quick_config());
        game.init(&make_players(2), &default_config(10, 4));
        test_helpers::contract_match_eventually_ends(&mut game, 400);
    }
}
