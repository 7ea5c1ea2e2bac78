use arcade_core::entity::{Hazard, Payload};
use arcade_core::game_trait::PlayerId;
use arcade_core::geom::Vec2;
use arcade_core::intent::{Intent, IntentProvider};
use arcade_core::snapshot::Snapshot;

const DEADZONE: f32 = 4.0;
/// Weight of "straight away" relative to the sidestep when dodging.
const RETREAT_WEIGHT: f32 = 0.5;

/// Sidesteps the closest incoming rocket, otherwise collects power-ups
/// and keeps off the walls.
#[derive(Debug, Clone)]
pub struct RocketBot {
    pub danger_radius: f32,
    pub wall_margin: f32,
}

impl RocketBot {
    pub fn new(danger_radius: f32, wall_margin: f32) -> Self {
        Self {
            danger_radius,
            wall_margin,
        }
    }
}

/// Direction perpendicular to the rocket's flight, on the side the player
/// is already on, blended with a step straight away.
fn dodge(rocket: &Hazard, me: Vec2) -> Vec2 {
    let away = (me - rocket.position).normalized();
    let flight = rocket.velocity.normalized();
    if flight == Vec2::ZERO {
        return away;
    }
    let mut side = Vec2::new(-flight.y, flight.x);
    if side.dot(away) < 0.0 {
        side = -side;
    }
    side + away * RETREAT_WEIGHT
}

impl IntentProvider for RocketBot {
    fn next_intent(&mut self, snapshot: &Snapshot, player_id: PlayerId) -> Intent {
        let Some(me) = snapshot.players.get(&player_id).filter(|p| p.alive) else {
            return Intent::default();
        };
        let pos = me.position;

        let incoming = snapshot
            .hazards
            .iter()
            .filter(|h| h.is_armed() && h.payload == Payload::Homing)
            .filter(|h| h.position.distance(pos) < self.danger_radius)
            .min_by(|a, b| a.position.distance(pos).total_cmp(&b.position.distance(pos)));
        let mut heading = match incoming {
            Some(rocket) => dodge(rocket, pos) * 100.0,
            None => snapshot
                .powerups
                .iter()
                .min_by(|a, b| a.position.distance(pos).total_cmp(&b.position.distance(pos)))
                .map_or(snapshot.arena.center() - pos, |pu| pu.position - pos),
        };

        // Push back toward the middle when pinned against a wall
        let arena = snapshot.arena;
        if pos.x < self.wall_margin {
            heading.x = heading.x.max(DEADZONE * 2.0);
        } else if pos.x > arena.width - self.wall_margin {
            heading.x = heading.x.min(-DEADZONE * 2.0);
        }
        if pos.y < self.wall_margin {
            heading.y = heading.y.max(DEADZONE * 2.0);
        } else if pos.y > arena.height - self.wall_margin {
            heading.y = heading.y.min(-DEADZONE * 2.0);
        }
        Intent::toward(heading, DEADZONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::entity::PlayerState;
    use arcade_core::geom::Arena;
    use arcade_core::powerup::{PowerUp, PowerUpKind};

    fn snap_at(x: f32, y: f32) -> Snapshot {
        let mut snap = Snapshot::new(Arena::new(800.0, 600.0));
        snap.add_player(PlayerState::new(1, Vec2::new(x, y), 16.0, 3));
        snap
    }

    fn rocket(snap: &mut Snapshot, x: f32, y: f32, velocity: Vec2) {
        let id = snap.allocate_id();
        let mut h = Hazard::new(id, Payload::Homing, Vec2::new(x, y), 10.0, 100);
        h.velocity = velocity;
        h.tracking = Some(1);
        snap.hazards.push(h);
    }

    #[test]
    fn sidesteps_a_rocket_from_the_left() {
        let mut snap = snap_at(400.0, 320.0);
        rocket(&mut snap, 300.0, 300.0, Vec2::new(6.0, 0.0));
        let intent = RocketBot::new(170.0, 60.0).next_intent(&snap, 1);
        // Already slightly below the flight line, so keep going down
        assert!(intent.down);
        assert!(!intent.up);
        assert!(!intent.left);
    }

    #[test]
    fn ignores_distant_rockets() {
        let mut snap = snap_at(400.0, 300.0);
        rocket(&mut snap, 20.0, 20.0, Vec2::new(6.0, 6.0));
        let intent = RocketBot::new(170.0, 60.0).next_intent(&snap, 1);
        // Already at the center with nothing to collect
        assert!(intent.is_idle());
    }

    #[test]
    fn heads_for_a_power_up_when_safe() {
        let mut snap = snap_at(400.0, 300.0);
        let id = snap.allocate_id();
        snap.powerups.push(PowerUp {
            id,
            position: Vec2::new(600.0, 300.0),
            kind: PowerUpKind::Shield,
            radius: 14.0,
            remaining: 100,
        });
        let intent = RocketBot::new(170.0, 60.0).next_intent(&snap, 1);
        assert!(intent.right);
        assert!(!intent.up && !intent.down);
    }

    #[test]
    fn leaves_the_wall() {
        let mut snap = snap_at(20.0, 300.0);
        rocket(&mut snap, 20.0, 200.0, Vec2::new(0.0, 6.0));
        let intent = RocketBot::new(170.0, 60.0).next_intent(&snap, 1);
        assert!(intent.right);
    }
}
