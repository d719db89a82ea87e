use glam::Vec2;
use skirmish::world::{ARENA_SIZE, Player};
use skirmish::{Actions, Intent};

/// Walks the local player in a slow circle around the arena centre and
/// fires a burst now and then. Handy for soak-testing a headless host.
pub struct Bot {
    phase: f32,
    fire_timer: f32,
    burst_left: u32,
}

const ORBIT_SPEED: f32 = 0.6;
const ORBIT_RADIUS: f32 = 220.0;
const BURST_INTERVAL: f32 = 2.0;
const BURST_SHOTS: u32 = 6;

impl Bot {
    pub fn new() -> Self {
        Self {
            phase: 0.0,
            fire_timer: BURST_INTERVAL,
            burst_left: 0,
        }
    }

    pub fn intent(&mut self, dt: f32, player: Option<&Player>) -> Intent {
        self.phase = (self.phase + ORBIT_SPEED * dt) % std::f32::consts::TAU;

        let centre = ARENA_SIZE * 0.5;
        let waypoint = centre + Vec2::from_angle(self.phase) * ORBIT_RADIUS;
        let position = player.map(|p| p.position).unwrap_or(centre);

        let mut actions = Actions::empty();
        self.fire_timer -= dt;
        if self.fire_timer <= 0.0 {
            self.fire_timer = BURST_INTERVAL;
            self.burst_left = BURST_SHOTS;
        }
        if self.burst_left > 0 {
            self.burst_left -= 1;
            actions |= Actions::FIRE;
        }
        if player.is_some_and(|p| p.magazine[p.weapon.index()] == 0 && !p.reloading) {
            actions |= Actions::RELOAD;
        }

        Intent {
            movement: (waypoint - position).normalize_or_zero(),
            aim_target: centre + Vec2::from_angle(self.phase + 1.5) * ORBIT_RADIUS,
            actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_bursts() {
        let mut bot = Bot::new();
        let fired: Vec<bool> = (0..300).map(|_| bot.intent(0.016, None).fire()).collect();
        let shots = fired.iter().filter(|f| **f).count();
        assert!(shots >= BURST_SHOTS as usize);
        assert!(shots < fired.len() / 2);
    }

    #[test]
    fn moves_toward_the_orbit() {
        let mut bot = Bot::new();
        let intent = bot.intent(0.016, None);
        assert!(intent.movement.length() > 0.99);
    }
}
