pub mod actions;
pub mod clock;
pub mod collision;
pub mod config;
pub mod effects;
pub mod entity;
pub mod events;
pub mod game_trait;
pub mod geom;
pub mod intent;
pub mod phase;
pub mod physics;
pub mod player;
pub mod powerup;
pub mod sim;
pub mod snapshot;
pub mod spawner;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::time::Duration;

    use crate::events::SimEvent;
    use crate::game_trait::{ArcadeGame, GameConfig, PlayerId};
    use crate::intent::{Intent, IntentProvider};
    use crate::phase::Phase;
    use crate::player::{Player, PlayerColor};
    use crate::snapshot::Snapshot;

    /// Create `n` test players with sequential IDs starting at 1.
    pub fn make_players(n: usize) -> Vec<Player> {
        (0..n)
            .map(|i| Player {
                id: i as PlayerId + 1,
                display_name: format!("Player{}", i + 1),
                color: PlayerColor::for_index(i),
                is_bot: false,
                is_spectator: false,
            })
            .collect()
    }

    /// Create a GameConfig with the given round duration in seconds and seed.
    pub fn default_config(round_duration_secs: u64, seed: u64) -> GameConfig {
        GameConfig {
            round_duration: Duration::from_secs(round_duration_secs),
            seed,
            ..GameConfig::default()
        }
    }

    /// Replays a fixed intent script, repeating the last entry once exhausted.
    #[derive(Debug, Clone, Default)]
    pub struct ReplayIntents {
        script: Vec<Intent>,
        cursor: usize,
    }

    impl ReplayIntents {
        pub fn new(script: Vec<Intent>) -> Self {
            Self { script, cursor: 0 }
        }
    }

    impl IntentProvider for ReplayIntents {
        fn next_intent(&mut self, _snapshot: &Snapshot, _player_id: PlayerId) -> Intent {
            let idx = self.cursor.min(self.script.len().saturating_sub(1));
            self.cursor += 1;
            self.script.get(idx).copied().unwrap_or_default()
        }
    }

    /// A deterministic mixed script: wander, throw, use specials.
    pub fn busy_script(len: usize) -> Vec<Intent> {
        (0..len)
            .map(|t| Intent {
                up: t % 11 < 3,
                down: t % 13 > 9,
                left: t % 7 == 0,
                right: t % 5 < 2,
                attack: t % 9 == 0,
                special: t % 17 == 0,
                build: t % 23 == 0,
            })
            .collect()
    }

    /// Run `n` ticks with no input, returning all accumulated events.
    pub fn run_ticks(game: &mut dyn ArcadeGame, n: usize) -> Vec<SimEvent> {
        let mut all_events = Vec::new();
        for _ in 0..n {
            all_events.extend(game.update());
        }
        all_events
    }

    /// One replay provider per player, each offset so they do not move in
    /// lockstep.
    pub fn scripted_providers(
        players: &[Player],
        script: &[Intent],
    ) -> Vec<(PlayerId, ReplayIntents)> {
        players
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut s = script.to_vec();
                s.rotate_left(i * 7 % script.len().max(1));
                (p.id, ReplayIntents::new(s))
            })
            .collect()
    }

    /// Feed every provider's next intent, then run one tick.
    pub fn scripted_tick(
        game: &mut dyn ArcadeGame,
        providers: &mut [(PlayerId, ReplayIntents)],
    ) -> Vec<SimEvent> {
        let snap = game.snapshot();
        for (id, provider) in providers.iter_mut() {
            let intent = provider.next_intent(&snap, *id);
            game.set_intent(*id, intent);
        }
        game.update()
    }

    /// Run `n` ticks, feeding every player from its own replay script.
    pub fn run_scripted(
        game: &mut dyn ArcadeGame,
        players: &[Player],
        n: usize,
        script: &[Intent],
    ) -> Vec<SimEvent> {
        let mut providers = scripted_providers(players, script);
        let mut all_events = Vec::new();
        for _ in 0..n {
            all_events.extend(scripted_tick(game, &mut providers));
        }
        all_events
    }

    // ================================================================
    // Game Trait Contract Tests
    // ================================================================
    // A generic suite every ArcadeGame implementation must pass. Game
    // crates call these from their own #[cfg(test)] modules.

    /// After init() with N players the match sits in Lobby with N players and
    /// serialize_state() returns non-empty bytes.
    pub fn contract_init_creates_player_state(game: &mut dyn ArcadeGame, player_count: usize) {
        let players = make_players(player_count);
        game.init(&players, &default_config(90, 1));
        assert_eq!(game.phase(), Phase::Lobby, "init must leave the match in Lobby");
        assert_eq!(game.snapshot().players.len(), player_count);
        assert!(
            !game.serialize_state().is_empty(),
            "serialize_state() must return non-empty bytes after init"
        );
    }

    /// start() must leave Lobby; ticks must advance the snapshot.
    pub fn contract_start_advances_ticks(game: &mut dyn ArcadeGame) {
        game.start();
        assert_ne!(game.phase(), Phase::Lobby, "start must leave Lobby");
        let before = game.snapshot().tick;
        game.update();
        assert_eq!(game.snapshot().tick, before + 1, "update must advance one tick");
    }

    /// Malformed input bytes are dropped without disturbing the match.
    pub fn contract_malformed_input_ignored(game: &mut dyn ArcadeGame, player_id: PlayerId) {
        let before = game.snapshot();
        game.apply_input(player_id, &[0xc1, 0xff, 0x00]);
        assert_eq!(*before, *game.snapshot(), "malformed input must not touch state");
    }

    /// Every published snapshot satisfies the global invariants.
    pub fn contract_invariants_hold(
        game: &mut dyn ArcadeGame,
        players: &[Player],
        ticks: usize,
        max_carried: usize,
    ) {
        let mut providers = scripted_providers(players, &busy_script(97));
        for _ in 0..ticks {
            scripted_tick(game, &mut providers);
            let snap = game.snapshot();
            if let Err(violation) = snap.check_invariants(max_carried) {
                panic!("tick {}: {violation}", snap.tick);
            }
            if game.phase() == Phase::Ended {
                break;
            }
        }
    }

    /// Two games fed the same seed and intents publish identical snapshots.
    pub fn contract_deterministic(
        make: &dyn Fn() -> Box<dyn ArcadeGame>,
        player_count: usize,
        ticks: usize,
    ) {
        let players = make_players(player_count);
        let script = busy_script(89);
        let run = || {
            let mut game = make();
            game.init(&players, &default_config(90, 7));
            game.start();
            let events = run_scripted(game.as_mut(), &players, ticks, &script);
            (game.snapshot(), events)
        };
        let (snap_a, events_a) = run();
        let (snap_b, events_b) = run();
        assert_eq!(*snap_a, *snap_b, "same inputs must yield the same snapshot");
        assert_eq!(events_a, events_b, "same inputs must yield the same events");
    }

    /// reset() returns to the post-init layout in Lobby.
    pub fn contract_reset_restores_layout(game: &mut dyn ArcadeGame, players: &[Player]) {
        let initial = game.snapshot();
        game.start();
        run_scripted(game, players, 30, &busy_script(31));
        game.reset();
        assert_eq!(game.phase(), Phase::Lobby);
        assert_eq!(*initial, *game.snapshot(), "reset must restore the initial layout");
        assert!(game.update().is_empty(), "no ticks before the next start");
    }

    /// Running long enough reaches Ended exactly once; Ended is terminal.
    pub fn contract_match_eventually_ends(game: &mut dyn ArcadeGame, max_ticks: usize) {
        game.start();
        let mut ended = 0;
        for _ in 0..max_ticks {
            ended += game
                .update()
                .iter()
                .filter(|e| matches!(e, SimEvent::MatchEnded { .. }))
                .count();
            if game.phase() == Phase::Ended {
                break;
            }
        }
        assert_eq!(game.phase(), Phase::Ended, "match must end within {max_ticks} ticks");
        assert_eq!(ended, 1, "MatchEnded is emitted once");
        let result = game.result();
        assert!(result.is_some(), "result must be set once Ended");
        let tick = game.snapshot().tick;
        assert!(game.update().is_empty());
        assert_eq!(game.snapshot().tick, tick, "Ended is terminal");
    }
}
