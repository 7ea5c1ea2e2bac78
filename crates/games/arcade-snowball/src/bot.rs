use arcade_core::effects::ResourceKind;
use arcade_core::entity::PlayerState;
use arcade_core::game_trait::PlayerId;
use arcade_core::intent::{Intent, IntentProvider};
use arcade_core::snapshot::Snapshot;

const DEADZONE: f32 = 6.0;

/// Walks into range, digs in behind a fort, then lobs charged snowballs.
/// On a hill map it heads for the hill first and fights from there.
#[derive(Debug, Clone)]
pub struct SnowBot {
    pub range: f32,
    pub charge_ticks: u32,
    held: u32,
}

impl SnowBot {
    pub fn new(range: f32, charge_ticks: u32) -> Self {
        Self {
            range,
            charge_ticks,
            held: 0,
        }
    }
}

fn nearest_opponent<'a>(snapshot: &'a Snapshot, me: &PlayerState) -> Option<&'a PlayerState> {
    snapshot
        .players
        .values()
        .filter(|p| p.alive && p.id != me.id)
        .min_by(|a, b| {
            a.position
                .distance(me.position)
                .total_cmp(&b.position.distance(me.position))
        })
}

impl IntentProvider for SnowBot {
    fn next_intent(&mut self, snapshot: &Snapshot, player_id: PlayerId) -> Intent {
        let Some(me) = snapshot.players.get(&player_id).filter(|p| p.alive) else {
            self.held = 0;
            return Intent::default();
        };

        let off_hill = snapshot
            .hill
            .filter(|hill| !hill.contains(me.position))
            .map(|hill| hill.center - me.position);

        let Some(target) = nearest_opponent(snapshot, me) else {
            return off_hill
                .map(|delta| Intent::toward(delta, DEADZONE))
                .unwrap_or_default();
        };
        let delta = target.position - me.position;
        let in_range = delta.length() <= self.range;

        // Facing follows movement: once on the hill, step toward the target
        let mut intent = match off_hill {
            Some(to_hill) => Intent::toward(to_hill, DEADZONE),
            None => Intent::toward(delta, DEADZONE),
        };
        if !in_range {
            self.held = 0;
            return intent;
        }

        intent.attack = self.held < self.charge_ticks;
        self.held = if intent.attack { self.held + 1 } else { 0 };
        intent.special = me.effects.resource(ResourceKind::IceBall) > 0;
        intent.build =
            snapshot.shelter_of(player_id).is_none() && snapshot.tick >= me.build_ready_at;
        intent
    }
}
