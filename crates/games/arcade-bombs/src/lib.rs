pub mod bot;
pub mod config;

use std::time::Duration;

use arcade_core::arcade_game_boilerplate;
use arcade_core::game_trait::{ArcadeGame, GameConfig, GameMetadata, PlayerId};
use arcade_core::intent::IntentProvider;
use arcade_core::player::Player;
use arcade_core::sim::Simulation;
use arcade_core::snapshot::Snapshot;

use bot::BombBot;
use config::BombsConfig;

/// Bomb toss: lob fused bombs at each other, dodge random drops, last one
/// standing wins. Hot-potato mode swaps throwing for a single carried bomb
/// that changes hands on contact.
pub struct BombToss {
    sim: Simulation,
    game_config: BombsConfig,
    hot_potato: bool,
}

impl BombToss {
    pub fn new() -> Self {
        Self::with_config(BombsConfig::load())
    }

    pub fn with_config(config: BombsConfig) -> Self {
        let hot_potato = config.hot_potato;
        let sim_config = config.sim_for(hot_potato);
        let layout = Snapshot::new(sim_config.arena());
        Self {
            sim: Simulation::new(sim_config, layout),
            game_config: config,
            hot_potato,
        }
    }

    pub fn config(&self) -> &BombsConfig {
        &self.game_config
    }

    pub fn is_hot_potato(&self) -> bool {
        self.hot_potato
    }
}

impl Default for BombToss {
    fn default() -> Self {
        Self::new()
    }
}

impl ArcadeGame for BombToss {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Bomb Toss".to_string(),
            description: "Lob bombs, dodge the blasts, or pass the hot potato before it blows"
                .to_string(),
            min_players: 2,
            max_players: 8,
            estimated_round_duration: Duration::from_secs(120),
        }
    }

    fn init(&mut self, players: &[Player], config: &GameConfig) {
        self.hot_potato = config.flag("hot_potato", self.game_config.hot_potato);
        let sim_config = self.game_config.sim_for(self.hot_potato).for_match(config);
        let layout = Snapshot::ring_layout(&sim_config, players, self.game_config.spawn_ring);
        tracing::debug!(
            players = layout.players.len(),
            hot_potato = self.hot_potato,
            "Bomb arena built"
        );
        self.sim = Simulation::new(sim_config, layout);
    }

    fn tick_rate(&self) -> f32 {
        1000.0 / self.sim.config().tick_ms as f32
    }

    fn bot(&self, _player_id: PlayerId) -> Box<dyn IntentProvider> {
        let sim = self.sim.config();
        let danger = sim
            .hazards
            .area_of_effect
            .effect_radius
            .max(sim.hazards.sticky.effect_radius)
            + sim.movement.player_radius
            + self.game_config.bot_evade_margin;
        Box::new(BombBot::new(danger, sim.actions.throw_distance))
    }

    arcade_game_boilerplate!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::events::SimEvent;
    use arcade_core::intent::Intent;
    use arcade_core::phase::{EndReason, Phase};
    use arcade_core::test_helpers::{self, default_config, make_players, run_ticks};

    fn quick_config() -> BombsConfig {
        let mut cfg = BombsConfig::default();
        cfg.sim.countdown_ms = 0;
        cfg
    }

    fn make_game(player_count: usize) -> BombToss {
        let mut game = BombToss::with_config(quick_config());
        game.init(&make_players(player_count), &default_config(0, 3));
        game
    }

    fn hot_potato_game(player_count: usize, fuse_ms: u64) -> BombToss {
        let mut cfg = quick_config();
        cfg.hot_potato_rules.fuse_ms = fuse_ms;
        cfg.hot_potato_rules.rearm_ms = 100;
        let mut game = BombToss::with_config(cfg);
        let mut match_config = default_config(0, 3);
        match_config
            .custom
            .insert("hot_potato".to_string(), serde_json::Value::Bool(true));
        game.init(&make_players(player_count), &match_config);
        game
    }

    // ================================================================
    // Layout
    // ================================================================

    #[test]
    fn init_places_everyone_at_full_health() {
        let game = make_game(4);
        let snap = game.snapshot();
        assert_eq!(snap.players.len(), 4);
        for p in snap.players.values() {
            assert!(p.alive);
            assert_eq!(p.health, 3);
            assert!(snap.arena.contains(p.position));
        }
        assert_eq!(game.phase(), Phase::Lobby);
    }

    #[test]
    fn host_flag_selects_hot_potato() {
        let game = hot_potato_game(2, 1000);
        assert!(game.is_hot_potato());
        let plain = make_game(2);
        assert!(!plain.is_hot_potato());
    }

    // ================================================================
    // Bomb toss
    // ================================================================

    #[test]
    fn lobbed_bomb_damages_the_opponent() {
        let mut cfg = quick_config();
        cfg.sim.actions.throw_distance = 360.0;
        cfg.sim.spawns.hazard_interval_ms = 0;
        cfg.sim.spawns.powerup_interval_ms = 0;
        let mut game = BombToss::with_config(cfg);
        game.init(&make_players(2), &default_config(0, 1));
        game.start();

        // Player 1 starts left of center facing +x toward player 2
        game.set_intent(
            1,
            Intent {
                attack: true,
                ..Default::default()
            },
        );
        let mut events = game.update();
        game.set_intent(1, Intent::default());
        events.extend(run_ticks(&mut game, 80));

        assert!(events.iter().any(|e| matches!(
            e,
            SimEvent::Damaged {
                player_id: 2,
                source: Some(1),
                ..
            }
        )));
        assert_eq!(game.snapshot().players[&2].health, 2);
        assert_eq!(game.snapshot().players[&1].health, 3);
    }

    #[test]
    fn thrower_position_is_unchanged_by_throw() {
        let mut game = make_game(2);
        game.start();
        let before = game.snapshot().players[&1].position;
        game.set_intent(
            1,
            Intent {
                attack: true,
                ..Default::default()
            },
        );
        game.update();
        assert_eq!(game.snapshot().players[&1].position, before);
        assert_eq!(game.snapshot().hazards.len(), 1);
        assert_eq!(game.snapshot().hazards[0].owner, Some(1));
    }

    // ================================================================
    // Hot potato
    // ================================================================

    #[test]
    fn hot_potato_blows_up_the_carrier() {
        let mut game = hot_potato_game(2, 1000);
        game.start();
        let events = run_ticks(&mut game, 60);
        let attached = events.iter().find_map(|e| match e {
            SimEvent::HazardAttached { player_id, .. } => Some(*player_id),
            _ => None,
        });
        let carrier = attached.expect("bomb attaches to a survivor");
        assert_eq!(game.phase(), Phase::Ended);
        let result = game.result().unwrap();
        assert_eq!(result.reason, EndReason::LastSurvivor);
        assert_ne!(result.winner, Some(carrier));
        assert!(!game.snapshot().players[&carrier].alive);
    }

    #[test]
    fn hot_potato_passes_on_contact() {
        let mut game = hot_potato_game(2, 20_000);
        game.start();
        // Wait for the bomb to land on someone
        let mut carrier = None;
        for _ in 0..10 {
            for e in game.update() {
                if let SimEvent::HazardAttached { player_id, .. } = e {
                    carrier = Some(player_id);
                }
            }
            if carrier.is_some() {
                break;
            }
        }
        let carrier = carrier.expect("bomb attached");
        let other = if carrier == 1 { 2 } else { 1 };

        // Walk the carrier onto the other player
        let mut passed = false;
        for _ in 0..100 {
            let snap = game.snapshot();
            let delta = snap.players[&other].position - snap.players[&carrier].position;
            game.set_intent(carrier, Intent::toward(delta, 1.0));
            passed |= game.update().iter().any(|e| {
                matches!(
                    e,
                    SimEvent::HazardPassed { from, to, .. } if *from == carrier && *to == other
                )
            });
            if passed {
                break;
            }
        }
        assert!(passed, "carrier touching the other player hands the bomb over");
        assert_eq!(game.snapshot().carried_by(other), 1);
        assert_eq!(game.snapshot().carried_by(carrier), 0);
    }

    // ================================================================
    // Bots
    // ================================================================

    #[test]
    fn bots_finish_a_match() {
        let mut game = make_game(3);
        let mut bots: Vec<(PlayerId, Box<dyn IntentProvider>)> =
            (1..=3).map(|id| (id, game.bot(id))).collect();
        game.start();
        for _ in 0..3000 {
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
        assert!(snap.players.values().all(|p| snap.arena.contains(p.position)));
    }

    // ================================================================
    // Contract tests
    // ================================================================

    #[test]
    fn contract_init_creates_player_state() {
        let mut game = BombToss::with_config(quick_config());
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
        test_helpers::contract_invariants_hold(&mut game, &make_players(4), 600, 1);
    }

    #[test]
    fn contract_invariants_hold_hot_potato() {
        let mut game = hot_potato_game(4, 1000);
        game.start();
        test_helpers::contract_invariants_hold(&mut game, &make_players(4), 600, 1);
    }

    #[test]
    fn contract_deterministic() {
        test_helpers::contract_deterministic(
            &|| Box::new(BombToss::with_config(quick_config())),
            3,
            300,
        );
    }

    #[test]
    fn contract_reset_restores_layout() {
        let mut game = make_game(3);
        test_helpers::contract_reset_restores_layout(&mut game, &make_players(3));
    }

    #[test]
    fn contract_match_eventually_ends() {
        let mut game = hot_potato_game(3, 1000);
        test_helpers::contract_match_eventually_ends(&mut game, 2000);
    }

    #[test]
    fn apply_input_decodes_msgpack() {
        let mut game = make_game(2);
        game.start();
        let bytes = rmp_serde::to_vec(&Intent {
            down: true,
            ..Default::default()
        })
        .unwrap();
        let before = game.snapshot().players[&1].position;
        game.apply_input(1, &bytes);
        game.update();
        assert!(game.snapshot().players[&1].position.y > before.y);
    }
}
