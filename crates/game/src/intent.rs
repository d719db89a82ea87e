use bitflags::bitflags;
use glam::Vec2;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Actions: u8 {
        const FIRE = 1 << 0;
        const RELOAD = 1 << 1;
        const NEXT_WEAPON = 1 << 2;
        const PREV_WEAPON = 1 << 3;
    }
}

/// Input for the local player for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Intent {
    /// Desired direction; normalized before use.
    pub movement: Vec2,
    /// World-space point the player aims at.
    pub aim_target: Vec2,
    pub actions: Actions,
}

impl Intent {
    pub fn fire(&self) -> bool {
        self.actions.contains(Actions::FIRE)
    }
}
