use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use arcade_core::events::SimEvent;
use arcade_core::game_trait::{ArcadeGame, GameConfig, PlayerId};
use arcade_core::intent::{Intent, IntentProvider};
use arcade_core::phase::{MatchResult, Phase};
use arcade_core::player::Player;

use crate::error::HostError;
use crate::registry::{GameId, GameRegistry};

/// Commands sent to a running session.
#[derive(Debug)]
pub enum SessionCommand {
    /// Latest controls for a player.
    Intent {
        player_id: PlayerId,
        intent: Intent,
    },
    /// MessagePack-encoded controls; malformed bytes are dropped by the game.
    Input {
        player_id: PlayerId,
        input_data: Vec<u8>,
    },
    /// Leave the lobby and begin the countdown.
    Start,
    /// Back to the initial layout in the lobby.
    Reset,
    Stop,
}

/// Broadcasts sent from the session loop to every subscriber.
#[derive(Debug, Clone)]
pub enum SessionBroadcast {
    /// MessagePack render view published after a tick.
    /// Uses `Bytes` for zero-copy cloning across subscribers.
    Snapshot(Bytes),
    /// The match just ended; sent once per match.
    Ended(MatchResult),
    /// The loop has exited.
    Stopped,
}

/// Configuration for a session spawned by the host.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub game_id: GameId,
    pub players: Vec<Player>,
    pub game: GameConfig,
    /// Clock multiplier over the game's own tick rate.
    pub speedup: f32,
    pub broadcast_capacity: usize,
}

/// Handle to a running session task.
pub struct SessionHandle {
    pub commands: mpsc::UnboundedSender<SessionCommand>,
    pub broadcasts: broadcast::Receiver<SessionBroadcast>,
    pub task: JoinHandle<()>,
    broadcast_tx: broadcast::Sender<SessionBroadcast>,
}

impl SessionHandle {
    /// A further receiver that sees broadcasts sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionBroadcast> {
        self.broadcast_tx.subscribe()
    }

    /// Queue a command. Returns false once the loop has exited.
    pub fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).is_ok()
    }
}

/// Create the game, initialise it for the roster and run its clock loop
/// as a tokio task.
pub fn spawn_session(
    registry: &GameRegistry,
    config: SessionConfig,
) -> Result<SessionHandle, HostError> {
    let mut game = registry.create(config.game_id)?;
    game.init(&config.players, &config.game);

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (broadcast_tx, broadcast_rx) = broadcast::channel(config.broadcast_capacity.max(1));

    let loop_tx = broadcast_tx.clone();
    let task = tokio::spawn(async move {
        run_session_loop(&mut *game, config, cmd_rx, loop_tx).await;
    });

    Ok(SessionHandle {
        commands: cmd_tx,
        broadcasts: broadcast_rx,
        task,
        broadcast_tx,
    })
}

/// Fresh bots for every bot-flagged participant. Rebuilt on reset so no
/// bot carries memory into the next match.
fn make_bots(
    game: &dyn ArcadeGame,
    players: &[Player],
) -> Vec<(PlayerId, Box<dyn IntentProvider>)> {
    players
        .iter()
        .filter(|p| p.is_bot && !p.is_spectator)
        .map(|p| (p.id, game.bot(p.id)))
        .collect()
}

fn tick_period(game: &dyn ArcadeGame, speedup: f32) -> Duration {
    let rate = game.tick_rate() * speedup;
    if rate.is_finite() && rate > 0.0 {
        Duration::from_secs_f32(1.0 / rate)
    } else {
        Duration::from_millis(50)
    }
}

/// The host clock loop. Each wake-up runs exactly one tick; a late wake-up
/// bursts to catch up rather than dropping simulated time.
async fn run_session_loop(
    game: &mut dyn ArcadeGame,
    config: SessionConfig,
    mut cmd_rx: mpsc::UnboundedReceiver<SessionCommand>,
    broadcast_tx: broadcast::Sender<SessionBroadcast>,
) {
    let period = tick_period(game, config.speedup);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
    let mut bots = make_bots(game, &config.players);

    tracing::info!(
        game = %config.game_id,
        players = config.players.len(),
        bots = bots.len(),
        period_ms = period.as_secs_f32() * 1000.0,
        "Session started"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if matches!(game.phase(), Phase::Lobby | Phase::Ended) {
                    continue;
                }

                let snap = game.snapshot();
                for (id, bot) in &mut bots {
                    let intent = bot.next_intent(&snap, *id);
                    game.set_intent(*id, intent);
                }

                let events = game.update();
                tracing::trace!(tick = game.snapshot().tick, events = events.len(), "Tick");

                // Send errors only mean nobody is subscribed right now
                let state = game.serialize_state();
                let _ = broadcast_tx.send(SessionBroadcast::Snapshot(Bytes::from(state)));

                let ended = events.iter().any(|e| matches!(e, SimEvent::MatchEnded { .. }));
                if ended && let Some(result) = game.result() {
                    tracing::info!(
                        game = %config.game_id,
                        winner = ?result.winner,
                        reason = ?result.reason,
                        ticks = result.duration_ticks,
                        "Session match ended"
                    );
                    let _ = broadcast_tx.send(SessionBroadcast::Ended(result));
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Intent { player_id, intent }) => {
                        game.set_intent(player_id, intent);
                    },
                    Some(SessionCommand::Input { player_id, input_data }) => {
                        game.apply_input(player_id, &input_data);
                    },
                    Some(SessionCommand::Start) => {
                        if game.phase() == Phase::Lobby {
                            game.start();
                            interval.reset();
                            tracing::debug!(game = %config.game_id, "Session match starting");
                        }
                    },
                    Some(SessionCommand::Reset) => {
                        game.reset();
                        bots = make_bots(game, &config.players);
                        tracing::debug!(game = %config.game_id, "Session reset");
                    },
                    Some(SessionCommand::Stop) | None => {
                        break;
                    },
                }
            }
        }
    }

    tracing::info!(game = %config.game_id, "Session stopped");
    let _ = broadcast_tx.send(SessionBroadcast::Stopped);
}
