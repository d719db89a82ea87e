use glam::Vec2;

use super::ARENA_SIZE;
use crate::net::{BulletState, PeerId};

#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub position: Vec2,
    pub velocity: Vec2,
    pub rotation: f32,
    pub damage: f32,
    pub owner: PeerId,
    pub color: [u8; 4],
    pub lifetime: f32,
}

impl Bullet {
    pub fn from_state(state: &BulletState) -> Self {
        Self {
            position: Vec2::from_array(state.position),
            velocity: Vec2::from_array(state.velocity),
            rotation: state.rotation,
            damage: state.damage,
            owner: state.owner,
            color: state.color,
            lifetime: state.lifetime,
        }
    }

    pub fn to_state(&self) -> BulletState {
        BulletState {
            position: self.position.to_array(),
            velocity: self.velocity.to_array(),
            rotation: self.rotation,
            damage: self.damage,
            owner: self.owner,
            color: self.color,
            lifetime: self.lifetime,
        }
    }

    /// Moves the bullet and returns where it started this step.
    pub fn advance(&mut self, dt: f32) -> Vec2 {
        let start = self.position;
        self.position += self.velocity * dt;
        self.lifetime -= dt;
        start
    }

    pub fn is_expired(&self) -> bool {
        self.lifetime <= 0.0
            || self.position.x < 0.0
            || self.position.y < 0.0
            || self.position.x > ARENA_SIZE.x
            || self.position.y > ARENA_SIZE.y
    }
}

/// Swept test of the segment `start..end` against a circle.
pub fn segment_hits_circle(start: Vec2, end: Vec2, center: Vec2, radius: f32) -> bool {
    let segment = end - start;
    let length_sq = segment.length_squared();
    let t = if length_sq > 0.0 {
        ((center - start).dot(segment) / length_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (start + segment * t).distance_squared(center) <= radius * radius
}
