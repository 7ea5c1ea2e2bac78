use arcade_core::effects::ResourceKind;
use arcade_core::game_trait::PlayerId;
use arcade_core::geom::Vec2;
use arcade_core::intent::{Intent, IntentProvider};
use arcade_core::physics::wrap_angle;
use arcade_core::snapshot::Snapshot;

/// Heading error below which the bot stops steering.
const STEER_DEADZONE: f32 = 0.05;
/// Heading error above which the bot lifts off the throttle.
const SHARP_TURN: f32 = 1.2;
/// Heading error below which a nitro charge is worth spending.
const NITRO_ALIGNMENT: f32 = 0.15;

/// Drives the lane centerline corner to corner.
#[derive(Debug, Clone)]
pub struct RaceBot {
    waypoints: Vec<Vec2>,
    next: usize,
    reach: f32,
}

impl RaceBot {
    pub fn new(waypoints: Vec<Vec2>, reach: f32) -> Self {
        Self {
            waypoints,
            next: 0,
            reach,
        }
    }

    /// Index of the corner currently being driven to.
    pub fn target_index(&self) -> usize {
        self.next
    }
}

impl IntentProvider for RaceBot {
    fn next_intent(&mut self, snapshot: &Snapshot, player_id: PlayerId) -> Intent {
        let Some(me) = snapshot.players.get(&player_id).filter(|p| p.alive) else {
            return Intent::default();
        };
        if self.waypoints.is_empty() {
            return Intent::default();
        }

        let mut to = self.waypoints[self.next] - me.position;
        if to.length() < self.reach {
            self.next = (self.next + 1) % self.waypoints.len();
            to = self.waypoints[self.next] - me.position;
        }

        let error = wrap_angle(to.angle() - me.heading);
        Intent {
            up: error.abs() < SHARP_TURN,
            left: error < -STEER_DEADZONE,
            right: error > STEER_DEADZONE,
            special: error.abs() < NITRO_ALIGNMENT
                && me.effects.resource(ResourceKind::Nitro) > 0,
            ..Intent::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::entity::PlayerState;
    use arcade_core::geom::Arena;

    fn snap_with(x: f32, y: f32, heading: f32) -> Snapshot {
        let mut snap = Snapshot::new(Arena::new(1000.0, 700.0));
        let mut p = PlayerState::new(1, Vec2::new(x, y), 14.0, 1);
        p.heading = heading;
        snap.add_player(p);
        snap
    }

    fn square() -> Vec<Vec2> {
        vec![
            Vec2::new(900.0, 600.0),
            Vec2::new(900.0, 100.0),
            Vec2::new(100.0, 100.0),
        ]
    }

    #[test]
    fn drives_straight_at_an_aligned_corner() {
        let snap = snap_with(300.0, 600.0, 0.0);
        let intent = RaceBot::new(square(), 70.0).next_intent(&snap, 1);
        assert!(intent.up);
        assert!(!intent.left && !intent.right);
    }

    #[test]
    fn sharp_corner_steers_without_throttle() {
        // Facing +x with the target straight up (negative y)
        let snap = snap_with(900.0, 400.0, 0.0);
        let mut bot = RaceBot::new(vec![Vec2::new(900.0, 100.0)], 70.0);
        let intent = bot.next_intent(&snap, 1);
        assert!(intent.left);
        assert!(!intent.up);
    }

    #[test]
    fn advances_past_a_reached_corner() {
        let snap = snap_with(880.0, 590.0, 0.0);
        let mut bot = RaceBot::new(square(), 70.0);
        bot.next_intent(&snap, 1);
        assert_eq!(bot.target_index(), 1);
    }

    #[test]
    fn spends_nitro_on_a_straight() {
        let mut snap = snap_with(300.0, 600.0, 0.0);
        snap.players
            .get_mut(&1)
            .unwrap()
            .effects
            .add_resource(ResourceKind::Nitro, 1, 3);
        let intent = RaceBot::new(square(), 70.0).next_intent(&snap, 1);
        assert!(intent.special);
    }
}
