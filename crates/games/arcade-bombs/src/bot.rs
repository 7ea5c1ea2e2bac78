use arcade_core::entity::{Payload, PlayerState};
use arcade_core::game_trait::PlayerId;
use arcade_core::geom::Vec2;
use arcade_core::intent::{Intent, IntentProvider};
use arcade_core::snapshot::Snapshot;

/// Movement deadzone so bots do not jitter around a target.
const DEADZONE: f32 = 2.0;

/// Simple bomb bot: dodge blasts, close to throwing range, lob at the
/// nearest opponent. In hot-potato mode it chases while carrying and flees
/// the carrier otherwise.
#[derive(Debug, Clone)]
pub struct BombBot {
    /// Distance at which the bot starts running from an armed bomb.
    pub danger_radius: f32,
    pub throw_distance: f32,
}

impl BombBot {
    pub fn new(danger_radius: f32, throw_distance: f32) -> Self {
        Self {
            danger_radius,
            throw_distance,
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

impl IntentProvider for BombBot {
    fn next_intent(&mut self, snapshot: &Snapshot, player_id: PlayerId) -> Intent {
        let Some(me) = snapshot.players.get(&player_id).filter(|p| p.alive) else {
            return Intent::default();
        };

        let carrying = snapshot.carried_by(player_id) > 0;
        if carrying {
            return nearest_opponent(snapshot, me)
                .map(|target| Intent::toward(target.position - me.position, DEADZONE))
                .unwrap_or_default();
        }

        // Run from the closest armed bomb (or bomb carrier) inside danger range
        let threat = snapshot
            .hazards
            .iter()
            .filter(|h| h.is_armed() && h.payload != Payload::Simple)
            .map(|h| h.target.unwrap_or(h.position))
            .filter(|&p| p.distance(me.position) < self.danger_radius)
            .min_by(|a, b| a.distance(me.position).total_cmp(&b.distance(me.position)));
        if let Some(threat) = threat {
            let away = me.position - threat;
            let away = if away == Vec2::ZERO {
                Vec2::new(1.0, 0.0)
            } else {
                away
            };
            return Intent::toward(away, DEADZONE);
        }

        let Some(target) = nearest_opponent(snapshot, me) else {
            return Intent::default();
        };
        let delta = target.position - me.position;
        let mut intent = Intent::toward(delta, DEADZONE);
        // Stop short of the target and throw once roughly at range
        if delta.length() <= self.throw_distance * 1.1 {
            intent.attack = true;
            if delta.length() < self.throw_distance * 0.8 {
                let step_back = Intent::toward(-delta, DEADZONE);
                intent = Intent {
                    attack: true,
                    ..step_back
                };
            }
        }
        intent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::entity::Hazard;
    use arcade_core::geom::Arena;

    fn snap(positions: &[(PlayerId, f32, f32)]) -> Snapshot {
        let mut snap = Snapshot::new(Arena::new(800.0, 600.0));
        for &(id, x, y) in positions {
            snap.add_player(PlayerState::new(id, Vec2::new(x, y), 16.0, 3));
        }
        snap
    }

    #[test]
    fn flees_an_armed_bomb() {
        let mut s = snap(&[(1, 100.0, 100.0), (2, 600.0, 100.0)]);
        let id = s.allocate_id();
        s.hazards.push(Hazard::new(
            id,
            Payload::AreaOfEffect,
            Vec2::new(120.0, 100.0),
            8.0,
            30,
        ));
        let intent = BombBot::new(100.0, 150.0).next_intent(&s, 1);
        assert!(intent.left && !intent.right);
        assert!(!intent.attack);
    }

    #[test]
    fn throws_when_in_range() {
        let s = snap(&[(1, 100.0, 100.0), (2, 250.0, 100.0)]);
        let intent = BombBot::new(100.0, 150.0).next_intent(&s, 1);
        assert!(intent.attack);
        assert!(intent.right);
    }

    #[test]
    fn carrier_chases() {
        let mut s = snap(&[(1, 100.0, 100.0), (2, 100.0, 400.0)]);
        let id = s.allocate_id();
        let mut h = Hazard::new(id, Payload::Sticky, Vec2::new(100.0, 100.0), 10.0, 100);
        h.carrier = Some(1);
        s.hazards.push(h);
        let intent = BombBot::new(100.0, 150.0).next_intent(&s, 1);
        assert!(intent.down);
        let runner = BombBot::new(100.0, 150.0).next_intent(&s, 2);
        assert!(!runner.attack);
    }

    #[test]
    fn dead_bot_idles() {
        let mut s = snap(&[(1, 100.0, 100.0)]);
        s.players.get_mut(&1).unwrap().alive = false;
        assert!(BombBot::new(100.0, 150.0).next_intent(&s, 1).is_idle());
    }
}
