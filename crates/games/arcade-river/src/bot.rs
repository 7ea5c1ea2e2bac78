use arcade_core::entity::ObstacleKind;
use arcade_core::game_trait::PlayerId;
use arcade_core::geom::Vec2;
use arcade_core::intent::{Intent, IntentProvider};
use arcade_core::snapshot::Snapshot;

const DEADZONE: f32 = 3.0;

/// Steps forward whenever the ground ahead is bank or a log with room to
/// spare; otherwise keeps to the middle of the log it is riding.
#[derive(Debug, Clone)]
pub struct RiverBot {
    pub lookahead: f32,
    pub footing_margin: f32,
}

impl RiverBot {
    pub fn new(lookahead: f32, footing_margin: f32) -> Self {
        Self {
            lookahead,
            footing_margin,
        }
    }

    fn safe(&self, snapshot: &Snapshot, point: Vec2) -> bool {
        let in_water = snapshot
            .obstacles
            .iter()
            .any(|o| o.kind == ObstacleKind::Pit && o.bounds.contains(point));
        if !in_water {
            return true;
        }
        let margin = self.footing_margin;
        snapshot.obstacles.iter().any(|o| {
            o.kind == ObstacleKind::Platform
                && point.x >= o.bounds.min.x + margin
                && point.x <= o.bounds.max.x - margin
                && point.y >= o.bounds.min.y
                && point.y <= o.bounds.max.y
        })
    }
}

impl IntentProvider for RiverBot {
    fn next_intent(&mut self, snapshot: &Snapshot, player_id: PlayerId) -> Intent {
        let Some(me) = snapshot.players.get(&player_id).filter(|p| p.alive) else {
            return Intent::default();
        };
        if me.progress.finished_at.is_some() {
            return Intent::default();
        }

        let ahead = me.position + Vec2::new(0.0, -self.lookahead);
        if self.safe(snapshot, ahead) {
            return Intent {
                up: true,
                ..Intent::default()
            };
        }

        // Keep to the middle of the visible part of the log underfoot
        let Some(log) = me
            .riding
            .and_then(|id| snapshot.obstacles.iter().find(|o| o.id == id))
        else {
            return Intent::default();
        };
        let lo = log.bounds.min.x.max(me.radius);
        let hi = log.bounds.max.x.min(snapshot.arena.width - me.radius);
        let middle = (lo + hi) / 2.0;
        Intent::toward(Vec2::new(middle - me.position.x, 0.0), DEADZONE)
    }
}
