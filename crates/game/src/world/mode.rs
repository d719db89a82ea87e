use glam::Vec2;
use rand::Rng;

use super::{ARENA_SIZE, PLAYER_RADIUS};
use crate::net::{FLAG_COUNT, FlagState, GameMode, PeerId};

pub const CAPTURE_RADIUS: f32 = 50.0;
pub const TEAM_NAMES: [&str; 2] = ["RED", "BLUE"];

const FLAG_BASES: [Vec2; FLAG_COUNT] = [
    Vec2::new(100.0, ARENA_SIZE.y / 2.0),
    Vec2::new(ARENA_SIZE.x - 100.0, ARENA_SIZE.y / 2.0),
];

pub fn round_length(mode: GameMode) -> f32 {
    match mode {
        GameMode::Deathmatch | GameMode::TeamDeathmatch => 300.0,
        GameMode::CaptureFlag => 600.0,
    }
}

/// Team modes spawn red on the left third and blue on the right third.
pub fn spawn_point(mode: GameMode, team: u8, rng: &mut impl Rng) -> Vec2 {
    let margin = PLAYER_RADIUS;
    let y = rng.gen_range(margin..ARENA_SIZE.y - margin);
    let x = if mode.is_team_based() {
        let third = ARENA_SIZE.x / 3.0;
        if team == 0 {
            rng.gen_range(margin..third)
        } else {
            rng.gen_range(2.0 * third..ARENA_SIZE.x - margin)
        }
    } else {
        rng.gen_range(margin..ARENA_SIZE.x - margin)
    };
    Vec2::new(x, y)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flag {
    pub position: Vec2,
    pub base: Vec2,
    pub captured: bool,
    pub team: u8,
    pub carrier: Option<PeerId>,
}

impl Flag {
    pub fn home(team: u8) -> Self {
        let base = FLAG_BASES[usize::from(team) % FLAG_COUNT];
        Self {
            position: base,
            base,
            captured: false,
            team,
            carrier: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::home(self.team);
    }

    pub fn drop_at(&mut self, position: Vec2) {
        self.position = position;
        self.captured = false;
        self.carrier = None;
    }

    pub fn from_state(state: &FlagState) -> Self {
        Self {
            position: Vec2::from_array(state.position),
            base: Vec2::from_array(state.base_position),
            captured: state.captured,
            team: state.team,
            carrier: (!state.carrier.is_none()).then_some(state.carrier),
        }
    }

    pub fn to_state(&self) -> FlagState {
        FlagState {
            position: self.position.to_array(),
            base_position: self.base.to_array(),
            captured: self.captured,
            team: self.team,
            carrier: self.carrier.unwrap_or(PeerId::NONE),
        }
    }
}

pub fn home_flags() -> [Flag; FLAG_COUNT] {
    [Flag::home(0), Flag::home(1)]
}
