use glam::Vec2;
use rand::Rng;

use super::{
    ARENA_SIZE, BULLET_LIFETIME, BULLET_RADIUS, MAX_HEALTH, PLAYER_ACCELERATION, PLAYER_FRICTION,
    PLAYER_RADIUS, PLAYER_SPEED, STOP_SPEED,
};
use crate::intent::{Actions, Intent};
use crate::net::{BulletState, PeerId, PlayerName, PlayerState, WEAPON_COUNT, WeaponKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    pub damage: f32,
    /// Shots per second.
    pub fire_rate: f32,
    pub reload_time: f32,
    pub magazine_size: u16,
    pub max_ammo: u16,
    /// Half-angle of the random cone, radians.
    pub spread: f32,
    pub bullet_speed: f32,
    pub pellets: u8,
    pub color: [u8; 4],
}

const WEAPONS: [WeaponStats; WEAPON_COUNT] = [
    WeaponStats {
        damage: 25.0,
        fire_rate: 5.0,
        reload_time: 1.0,
        magazine_size: 12,
        max_ammo: 120,
        spread: 0.015,
        bullet_speed: 900.0,
        pellets: 1,
        color: [255, 220, 80, 255],
    },
    WeaponStats {
        damage: 35.0,
        fire_rate: 8.0,
        reload_time: 1.8,
        magazine_size: 30,
        max_ammo: 150,
        spread: 0.025,
        bullet_speed: 1100.0,
        pellets: 1,
        color: [255, 160, 60, 255],
    },
    WeaponStats {
        damage: 18.0,
        fire_rate: 1.5,
        reload_time: 2.0,
        magazine_size: 8,
        max_ammo: 64,
        spread: 0.2,
        bullet_speed: 800.0,
        pellets: 8,
        color: [255, 100, 60, 255],
    },
    WeaponStats {
        damage: 18.0,
        fire_rate: 15.0,
        reload_time: 1.6,
        magazine_size: 30,
        max_ammo: 180,
        spread: 0.045,
        bullet_speed: 950.0,
        pellets: 1,
        color: [120, 220, 255, 255],
    },
    WeaponStats {
        damage: 90.0,
        fire_rate: 1.0,
        reload_time: 2.0,
        magazine_size: 5,
        max_ammo: 40,
        spread: 0.002,
        bullet_speed: 1500.0,
        pellets: 1,
        color: [200, 120, 255, 255],
    },
];

pub fn weapon_stats(kind: WeaponKind) -> &'static WeaponStats {
    &WEAPONS[kind.index()]
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PeerId,
    pub name: PlayerName,
    pub position: Vec2,
    pub velocity: Vec2,
    pub aim_angle: f32,
    pub health: f32,
    pub max_health: f32,
    pub weapon: WeaponKind,
    pub magazine: [u16; WEAPON_COUNT],
    pub reserve: [u16; WEAPON_COUNT],
    pub reloading: bool,
    pub reload_timer: f32,
    pub team: u8,
    pub score: i32,
    pub kills: u32,
    pub deaths: u32,
    /// True only for the player driven by this process. Never sent.
    pub is_local: bool,
    pub last_update: f64,
    pub fire_cooldown: f32,
}

impl Player {
    pub fn new(id: PeerId, name: PlayerName, is_local: bool) -> Self {
        let mut magazine = [0; WEAPON_COUNT];
        let mut reserve = [0; WEAPON_COUNT];
        for kind in WeaponKind::ALL {
            let stats = weapon_stats(kind);
            magazine[kind.index()] = stats.magazine_size;
            reserve[kind.index()] = stats.max_ammo - stats.magazine_size;
        }

        Self {
            id,
            name,
            position: ARENA_SIZE * 0.5,
            velocity: Vec2::ZERO,
            aim_angle: 0.0,
            health: MAX_HEALTH,
            max_health: MAX_HEALTH,
            weapon: WeaponKind::Pistol,
            magazine,
            reserve,
            reloading: false,
            reload_timer: 0.0,
            team: 0,
            score: 0,
            kills: 0,
            deaths: 0,
            is_local,
            last_update: 0.0,
            fire_cooldown: 0.0,
        }
    }

    pub fn from_state(state: &PlayerState, is_local: bool, now: f64) -> Self {
        let mut player = Self::new(state.id, state.name, is_local);
        player.position = Vec2::from_array(state.position);
        player.apply_state(state, now);
        player
    }

    /// Overwrites everything except position, which the caller reconciles.
    pub fn apply_state(&mut self, state: &PlayerState, now: f64) {
        self.name = state.name;
        self.velocity = Vec2::from_array(state.velocity);
        self.aim_angle = state.aim_angle;
        self.health = state.health;
        self.max_health = state.max_health;
        self.weapon = state.weapon;
        self.magazine = state.magazine;
        self.reserve = state.reserve;
        self.reloading = state.reloading;
        self.reload_timer = state.reload_timer;
        self.team = state.team;
        self.score = state.score;
        self.kills = state.kills;
        self.deaths = state.deaths;
        self.last_update = now;
    }

    pub fn to_state(&self, timestamp: f64) -> PlayerState {
        PlayerState {
            id: self.id,
            name: self.name,
            position: self.position.to_array(),
            velocity: self.velocity.to_array(),
            aim_angle: self.aim_angle,
            health: self.health,
            max_health: self.max_health,
            weapon: self.weapon,
            magazine: self.magazine,
            reserve: self.reserve,
            reloading: self.reloading,
            reload_timer: self.reload_timer,
            team: self.team,
            score: self.score,
            kills: self.kills,
            deaths: self.deaths,
            timestamp,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn stats(&self) -> &'static WeaponStats {
        weapon_stats(self.weapon)
    }

    pub fn respawn(&mut self, position: Vec2) {
        self.position = position;
        self.velocity = Vec2::ZERO;
        self.health = self.max_health;
        self.reloading = false;
        self.reload_timer = 0.0;
        self.fire_cooldown = 0.0;
    }

    pub fn switch_weapon(&mut self, weapon: WeaponKind) {
        if weapon != self.weapon {
            self.weapon = weapon;
            self.reloading = false;
            self.reload_timer = 0.0;
        }
    }

    pub fn start_reload(&mut self) -> bool {
        let slot = self.weapon.index();
        if self.reloading
            || self.magazine[slot] >= self.stats().magazine_size
            || self.reserve[slot] == 0
        {
            return false;
        }

        self.reloading = true;
        self.reload_timer = self.stats().reload_time;
        true
    }

    pub fn tick_timers(&mut self, dt: f32) {
        self.fire_cooldown = (self.fire_cooldown - dt).max(0.0);

        if !self.reloading {
            return;
        }

        self.reload_timer -= dt;
        if self.reload_timer <= 0.0 {
            let slot = self.weapon.index();
            let needed = self.stats().magazine_size.saturating_sub(self.magazine[slot]);
            let taken = needed.min(self.reserve[slot]);
            self.magazine[slot] += taken;
            self.reserve[slot] -= taken;
            self.reloading = false;
            self.reload_timer = 0.0;
        }
    }

    /// Applies one frame of input. Returns the bullets fired, if any.
    pub fn drive(&mut self, intent: &Intent, dt: f32, rng: &mut impl Rng) -> Vec<BulletState> {
        if !self.is_alive() {
            return Vec::new();
        }

        if intent.actions.contains(Actions::NEXT_WEAPON) {
            self.switch_weapon(self.weapon.next());
        } else if intent.actions.contains(Actions::PREV_WEAPON) {
            self.switch_weapon(self.weapon.prev());
        }

        let direction = intent.movement.normalize_or_zero();
        if direction != Vec2::ZERO {
            self.velocity += direction * PLAYER_ACCELERATION * dt;
            self.velocity = self.velocity.clamp_length_max(PLAYER_SPEED);
        } else {
            let friction = (PLAYER_FRICTION * dt).min(1.0);
            self.velocity -= self.velocity * friction;
            if self.velocity.length() < STOP_SPEED {
                self.velocity = Vec2::ZERO;
            }
        }

        self.position = (self.position + self.velocity * dt).clamp(
            Vec2::splat(PLAYER_RADIUS),
            ARENA_SIZE - Vec2::splat(PLAYER_RADIUS),
        );

        let to_target = intent.aim_target - self.position;
        if to_target.length_squared() > f32::EPSILON {
            self.aim_angle = to_target.y.atan2(to_target.x);
        }

        if intent.actions.contains(Actions::RELOAD) {
            self.start_reload();
        }

        if intent.fire() {
            self.fire(rng)
        } else {
            Vec::new()
        }
    }

    pub fn fire(&mut self, rng: &mut impl Rng) -> Vec<BulletState> {
        if self.reloading || self.fire_cooldown > 0.0 {
            return Vec::new();
        }

        let slot = self.weapon.index();
        if self.magazine[slot] == 0 {
            self.start_reload();
            return Vec::new();
        }

        let stats = self.stats();
        self.magazine[slot] -= 1;
        self.fire_cooldown = 1.0 / stats.fire_rate;

        let bullets = (0..stats.pellets)
            .map(|_| {
                let jitter = if stats.spread > 0.0 {
                    rng.gen_range(-stats.spread..stats.spread)
                } else {
                    0.0
                };
                let angle = self.aim_angle + jitter;
                let direction = Vec2::from_angle(angle);
                BulletState {
                    position: (self.position + direction * (PLAYER_RADIUS + BULLET_RADIUS))
                        .to_array(),
                    velocity: (direction * stats.bullet_speed).to_array(),
                    rotation: angle,
                    damage: stats.damage,
                    owner: self.id,
                    color: stats.color,
                    lifetime: BULLET_LIFETIME,
                }
            })
            .collect();

        if self.magazine[slot] == 0 {
            self.start_reload();
        }

        bullets
    }
}
