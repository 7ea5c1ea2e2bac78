//! Match phase state machine and termination rules.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::ticks_to_duration;
use crate::config::{Metric, Objective, SimConfig};
use crate::entity::PlayerState;
use crate::game_trait::PlayerId;
use crate::snapshot::Snapshot;

/// `Lobby → Countdown → Active → Ended`. `Ended` is terminal until reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Lobby,
    Countdown { remaining: u32 },
    Active,
    Ended,
}

impl Phase {
    /// Whether intents are honoured in this phase.
    pub fn accepts_input(self) -> bool {
        self == Phase::Active
    }
}

/// Why the match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    LastSurvivor,
    AllEliminated,
    TimeUp,
    Objective,
}

/// Final standing of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub player_id: PlayerId,
    pub score: i32,
    pub kills: u32,
    pub alive: bool,
    pub health: u32,
}

/// Terminal record emitted once on `Ended`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// `None` is a draw or a match with no survivors.
    pub winner: Option<PlayerId>,
    pub reason: EndReason,
    pub scores: Vec<PlayerScore>,
    /// Ticks spent in `Active`.
    pub duration_ticks: u64,
    pub duration: Duration,
}

impl MatchResult {
    pub fn is_draw(&self) -> bool {
        self.winner.is_none()
    }
}

/// Inspects a freshly resolved snapshot and decides whether the match is over.
pub struct WinEvaluator;

impl WinEvaluator {
    /// First of: objective met, survivors exhausted, shared timer elapsed.
    pub fn evaluate(snapshot: &Snapshot, config: &SimConfig) -> Option<MatchResult> {
        if snapshot.phase != Phase::Active {
            return None;
        }
        let (winner, reason) = Self::objective(snapshot, config)
            .or_else(|| Self::survivors(snapshot, config))
            .or_else(|| Self::timer(snapshot, config))?;

        Some(MatchResult {
            winner,
            reason,
            scores: snapshot
                .players
                .values()
                .map(|p| PlayerScore {
                    player_id: p.id,
                    score: p.score,
                    kills: p.kills,
                    alive: p.alive,
                    health: p.health,
                })
                .collect(),
            duration_ticks: snapshot.active_ticks,
            duration: ticks_to_duration(config.period(), snapshot.active_ticks),
        })
    }

    fn objective(
        snapshot: &Snapshot,
        config: &SimConfig,
    ) -> Option<(Option<PlayerId>, EndReason)> {
        let tick = snapshot.tick;
        let met: Vec<PlayerId> = match config.win.objective {
            Objective::None => return None,
            Objective::FinishLaps | Objective::ReachRegion => snapshot
                .players
                .values()
                .filter(|p| p.progress.finished_at == Some(tick))
                .map(|p| p.id)
                .collect(),
            Objective::HoldZone { hold_ms } => {
                let needed = config.ticks(hold_ms);
                snapshot
                    .players
                    .values()
                    .filter(|p| p.alive && p.hold_streak >= needed)
                    .map(|p| p.id)
                    .collect()
            },
            Objective::Tasks { count } => snapshot
                .players
                .values()
                .filter(|p| p.alive && p.tasks >= count)
                .map(|p| p.id)
                .collect(),
        };
        match met.as_slice() {
            [] => None,
            [only] => Some((Some(*only), EndReason::Objective)),
            // Simultaneous completion in the same tick
            _ => Some((None, EndReason::Objective)),
        }
    }

    fn survivors(
        snapshot: &Snapshot,
        config: &SimConfig,
    ) -> Option<(Option<PlayerId>, EndReason)> {
        let alive: Vec<PlayerId> = snapshot
            .players
            .values()
            .filter(|p| p.alive)
            .map(|p| p.id)
            .collect();
        if alive.is_empty() && !snapshot.players.is_empty() {
            return Some((None, EndReason::AllEliminated));
        }
        // A solo run never ends by "last survivor"
        if config.win.last_survivor && snapshot.players.len() >= 2 && alive.len() == 1 {
            return Some((Some(alive[0]), EndReason::LastSurvivor));
        }
        None
    }

    fn timer(snapshot: &Snapshot, config: &SimConfig) -> Option<(Option<PlayerId>, EndReason)> {
        let limit = config.ticks(config.win.time_limit_ms);
        if limit == 0 || snapshot.active_ticks < u64::from(limit) {
            return None;
        }
        let any_alive = snapshot.players.values().any(|p| p.alive);
        let ranked: Vec<&PlayerState> = snapshot
            .players
            .values()
            .filter(|p| p.alive || !any_alive)
            .collect();
        Some((best_by_metric(&ranked, config.win.metric), EndReason::TimeUp))
    }
}

fn metric_value(player: &PlayerState, metric: Metric) -> i64 {
    match metric {
        Metric::Score => i64::from(player.score),
        Metric::Progress => {
            i64::from(player.progress.checkpoints_passed)
                + i64::from(player.progress.finished_at.is_some())
        },
        Metric::Health => i64::from(player.health),
        Metric::HoldTime => i64::from(player.hold_ticks),
    }
}

/// Unique best player by `metric`, or `None` on a tie.
fn best_by_metric(players: &[&PlayerState], metric: Metric) -> Option<PlayerId> {
    let best = players.iter().map(|p| metric_value(p, metric)).max()?;
    let mut leaders = players.iter().filter(|p| metric_value(p, metric) == best);
    let first = leaders.next()?;
    if leaders.next().is_some() {
        None
    } else {
        Some(first.id)
    }
}

/// Countdown length in ticks.
pub fn countdown_ticks(config: &SimConfig) -> u32 {
    config.ticks(config.countdown_ms)
}
