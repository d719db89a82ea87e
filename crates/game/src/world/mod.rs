mod bullet;
mod chat;
mod mode;
mod player;
mod slots;

use std::collections::HashMap;

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub use bullet::{Bullet, segment_hits_circle};
pub use chat::{CHAT_CAPACITY, CHAT_LIFETIME, ChatEntry, ChatLog};
pub use mode::{CAPTURE_RADIUS, Flag, TEAM_NAMES, home_flags, round_length, spawn_point};
pub use player::{Player, WeaponStats, weapon_stats};
pub use slots::{Handle, SlotArena};

use crate::intent::Intent;
use crate::net::{BulletState, FLAG_COUNT, FlagState, GameMode, MAX_PEERS, PeerId, PlayerName, rand_u64};

pub const ARENA_SIZE: Vec2 = Vec2::new(1280.0, 720.0);
pub const PLAYER_RADIUS: f32 = 20.0;
pub const PLAYER_SPEED: f32 = 200.0;
pub const PLAYER_ACCELERATION: f32 = 1000.0;
pub const PLAYER_FRICTION: f32 = 5.0;
pub const STOP_SPEED: f32 = 5.0;
pub const MAX_HEALTH: f32 = 100.0;
pub const BULLET_RADIUS: f32 = 5.0;
pub const BULLET_LIFETIME: f32 = 2.0;
pub const MAX_BULLETS: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Killed { victim: PeerId, killer: PeerId },
    FlagTaken { flag: usize, carrier: PeerId },
    FlagReturned { flag: usize },
    FlagCaptured { team: u8 },
    RoundOver { summary: String },
}

struct Hit {
    victim: Handle,
    owner: PeerId,
    damage: f32,
}

/// Everything this process knows about the match: its own player, replicas of the others,
/// bullets in flight, mode, scores, flags and chat.
pub struct World {
    players: SlotArena<Player>,
    by_id: HashMap<PeerId, Handle>,
    bullets: SlotArena<Bullet>,
    local: Option<Handle>,
    mode: GameMode,
    team_scores: [i32; 2],
    flags: [Flag; FLAG_COUNT],
    chat: ChatLog,
    mode_timer: f32,
    rng: ChaCha8Rng,
}

impl Default for World {
    fn default() -> Self {
        Self::new(rand_u64())
    }
}

impl World {
    /// Spawn points and weapon spread draw from a generator seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            players: SlotArena::with_capacity(MAX_PEERS),
            by_id: HashMap::new(),
            bullets: SlotArena::with_capacity(MAX_BULLETS),
            local: None,
            mode: GameMode::Deathmatch,
            team_scores: [0; 2],
            flags: home_flags(),
            chat: ChatLog::default(),
            mode_timer: 0.0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Creates the player driven by this process, replacing any previous one.
    pub fn spawn_local(&mut self, id: PeerId, name: PlayerName) -> Option<Handle> {
        if let Some(previous) = self.local.take() {
            if let Some(player) = self.players.remove(previous) {
                self.by_id.remove(&player.id);
            }
        }
        self.remove_player(id);

        let mut player = Player::new(id, name, true);
        player.position = spawn_point(self.mode, player.team, &mut self.rng);

        let handle = self.players.insert(player)?;
        self.by_id.insert(id, handle);
        self.local = Some(handle);
        Some(handle)
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.local.and_then(|h| self.players.get(h))
    }

    pub fn local_player_mut(&mut self) -> Option<&mut Player> {
        self.local.and_then(|h| self.players.get_mut(h))
    }

    pub fn local_id(&self) -> Option<PeerId> {
        self.local_player().map(|p| p.id)
    }

    pub fn player(&self, id: &PeerId) -> Option<&Player> {
        self.by_id.get(id).and_then(|&h| self.players.get(h))
    }

    pub fn player_mut(&mut self, id: &PeerId) -> Option<&mut Player> {
        self.by_id.get(id).and_then(|&h| self.players.get_mut(h))
    }

    pub fn handle_of(&self, id: &PeerId) -> Option<Handle> {
        self.by_id.get(id).copied()
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().map(|(_, p)| p)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Fetches the replica for `id`, creating an empty one if needed.
    /// Returns `None` when the table is full. The flag is true when the replica is new.
    pub fn replica_entry(&mut self, id: PeerId) -> Option<(&mut Player, bool)> {
        let created = !self.by_id.contains_key(&id);
        if created {
            let handle = self
                .players
                .insert(Player::new(id, PlayerName::default(), false))?;
            self.by_id.insert(id, handle);
        }

        let handle = *self.by_id.get(&id)?;
        self.players.get_mut(handle).map(|p| (p, created))
    }

    pub fn remove_player(&mut self, id: PeerId) -> Option<Player> {
        let handle = self.by_id.remove(&id)?;
        if self.local == Some(handle) {
            self.local = None;
        }
        self.players.remove(handle)
    }

    /// Drops every replica, keeping the local player.
    pub fn clear_replicas(&mut self) {
        let local = self.local;
        self.players.retain(|p| p.is_local);
        self.by_id.retain(|_, h| Some(*h) == local);
        self.bullets.clear();
    }

    pub fn spawn_bullet(&mut self, state: &BulletState) -> Option<Handle> {
        self.bullets.insert(Bullet::from_state(state))
    }

    pub fn bullets(&self) -> impl Iterator<Item = &Bullet> {
        self.bullets.iter().map(|(_, b)| b)
    }

    pub fn bullet_count(&self) -> usize {
        self.bullets.len()
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Starts a fresh round in `mode`: scores, timer and flags reset, teams reassigned.
    pub fn set_mode(&mut self, mode: GameMode) {
        self.mode = mode;
        self.team_scores = [0; 2];
        self.mode_timer = 0.0;
        self.flags = home_flags();

        if mode.is_team_based() {
            self.assign_local_team();
        } else if let Some(local) = self.local_player_mut() {
            local.team = 0;
        }
    }

    /// Every peer sorts the same roster, so teams come out consistent without negotiation.
    fn assign_local_team(&mut self) {
        let Some(local_id) = self.local_id() else {
            return;
        };

        let mut ids: Vec<PeerId> = self.by_id.keys().copied().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        if let Some(position) = ids.iter().position(|id| *id == local_id) {
            if let Some(local) = self.local_player_mut() {
                local.team = (position % 2) as u8;
            }
        }
    }

    pub fn team_scores(&self) -> [i32; 2] {
        self.team_scores
    }

    pub fn set_team_scores(&mut self, scores: [i32; 2]) {
        self.team_scores = scores;
    }

    pub fn flags(&self) -> &[Flag; FLAG_COUNT] {
        &self.flags
    }

    pub fn flag_state(&self, index: usize) -> Option<FlagState> {
        self.flags.get(index).map(Flag::to_state)
    }

    pub fn set_flag(&mut self, index: usize, state: &FlagState) -> bool {
        match self.flags.get_mut(index) {
            Some(flag) => {
                *flag = Flag::from_state(state);
                true
            }
            None => false,
        }
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    pub fn push_chat(&mut self, sender: &str, text: &str) {
        self.chat.push(sender, text);
    }

    pub fn time_left(&self) -> f32 {
        (round_length(self.mode) - self.mode_timer).max(0.0)
    }

    /// Applies input to the local player and spawns its shots. The shots are returned
    /// so they can be announced to other peers.
    pub fn drive_local(&mut self, intent: &Intent, dt: f32) -> Vec<BulletState> {
        let Some(handle) = self.local else {
            return Vec::new();
        };
        let Some(player) = self.players.get_mut(handle) else {
            return Vec::new();
        };

        let shots = player.drive(intent, dt, &mut self.rng);
        for shot in &shots {
            self.bullets.insert(Bullet::from_state(shot));
        }
        shots
    }

    pub fn step(&mut self, dt: f32) -> Vec<WorldEvent> {
        let mut events = Vec::new();

        for (_, player) in self.players.iter_mut() {
            if !player.is_local {
                player.position = (player.position + player.velocity * dt).clamp(
                    Vec2::splat(PLAYER_RADIUS),
                    ARENA_SIZE - Vec2::splat(PLAYER_RADIUS),
                );
            }
            player.tick_timers(dt);
        }

        let hits = self.move_bullets(dt);
        for hit in hits {
            self.apply_hit(hit, &mut events);
        }

        if self.mode == GameMode::CaptureFlag {
            self.update_flags(&mut events);
        }

        self.chat.tick(dt);

        self.mode_timer += dt;
        if self.mode_timer >= round_length(self.mode) {
            events.push(WorldEvent::RoundOver {
                summary: self.round_summary(),
            });
            if let Some(local) = self.local_player_mut() {
                local.score = 0;
                local.kills = 0;
                local.deaths = 0;
            }
            self.set_mode(self.mode);
        }

        events
    }

    fn move_bullets(&mut self, dt: f32) -> Vec<Hit> {
        let mut hits = Vec::new();
        let players = &self.players;
        let by_id = &self.by_id;
        let team_mode = self.mode.is_team_based();

        self.bullets.retain(|bullet| {
            let start = bullet.advance(dt);
            if bullet.is_expired() {
                return false;
            }

            let owner_team = by_id
                .get(&bullet.owner)
                .and_then(|&h| players.get(h))
                .map(|p| p.team);

            let victim = players.iter().find(|(_, p)| {
                p.is_alive()
                    && p.id != bullet.owner
                    && !(team_mode && owner_team == Some(p.team))
                    && segment_hits_circle(
                        start,
                        bullet.position,
                        p.position,
                        PLAYER_RADIUS + BULLET_RADIUS,
                    )
            });

            match victim {
                Some((handle, _)) => {
                    hits.push(Hit {
                        victim: handle,
                        owner: bullet.owner,
                        damage: bullet.damage,
                    });
                    false
                }
                None => true,
            }
        });

        hits
    }

    fn apply_hit(&mut self, hit: Hit, events: &mut Vec<WorldEvent>) {
        let mode = self.mode;
        let Some(victim) = self.players.get_mut(hit.victim) else {
            return;
        };
        if !victim.is_alive() || victim.id == hit.owner {
            return;
        }

        victim.health -= hit.damage;
        if victim.is_alive() {
            return;
        }

        let victim_id = victim.id;
        let victim_team = victim.team;
        let position = victim.position;

        if victim.is_local {
            victim.deaths += 1;
            let spawn = spawn_point(mode, victim_team, &mut self.rng);
            victim.respawn(spawn);
        } else {
            victim.health = 0.0;
        }

        for flag in &mut self.flags {
            if flag.carrier == Some(victim_id) {
                flag.drop_at(position);
            }
        }

        let killer_team = self.player(&hit.owner).map(|p| p.team);
        if let Some(local) = self.local_player_mut() {
            if local.id == hit.owner {
                local.kills += 1;
                if mode == GameMode::Deathmatch {
                    local.score += 1;
                }
            }
        }

        if mode == GameMode::TeamDeathmatch {
            let team = killer_team.unwrap_or(1 - victim_team.min(1));
            self.team_scores[usize::from(team.min(1))] += 1;
        }

        events.push(WorldEvent::Killed {
            victim: victim_id,
            killer: hit.owner,
        });
    }

    fn update_flags(&mut self, events: &mut Vec<WorldEvent>) {
        for index in 0..FLAG_COUNT {
            if self.flags[index].captured {
                let carrier = self.flags[index]
                    .carrier
                    .and_then(|id| self.player(&id))
                    .filter(|p| p.is_alive())
                    .map(|p| (p.position, p.team));

                let Some((position, team)) = carrier else {
                    self.flags[index].reset();
                    events.push(WorldEvent::FlagReturned { flag: index });
                    continue;
                };

                self.flags[index].position = position;

                let home = self.flags[usize::from(team.min(1))].base;
                if team != self.flags[index].team && position.distance(home) < CAPTURE_RADIUS {
                    self.team_scores[usize::from(team.min(1))] += 1;
                    self.flags[index].reset();
                    events.push(WorldEvent::FlagCaptured { team });
                }
            } else {
                let flag_position = self.flags[index].position;
                let flag_team = self.flags[index].team;
                let taker = self
                    .players()
                    .find(|p| {
                        p.is_alive()
                            && p.team != flag_team
                            && p.position.distance(flag_position) < PLAYER_RADIUS
                    })
                    .map(|p| p.id);

                if let Some(carrier) = taker {
                    let flag = &mut self.flags[index];
                    flag.captured = true;
                    flag.carrier = Some(carrier);
                    events.push(WorldEvent::FlagTaken {
                        flag: index,
                        carrier,
                    });
                }
            }
        }
    }

    fn round_summary(&self) -> String {
        if self.mode.is_team_based() {
            let [red, blue] = self.team_scores;
            return match red.cmp(&blue) {
                std::cmp::Ordering::Greater => format!("{} wins {}-{}", TEAM_NAMES[0], red, blue),
                std::cmp::Ordering::Less => format!("{} wins {}-{}", TEAM_NAMES[1], blue, red),
                std::cmp::Ordering::Equal => format!("tie at {}", red),
            };
        }

        match self.players().max_by_key(|p| p.score) {
            Some(best) if best.score > 0 => {
                format!("{} wins with {}", best.name.as_str(), best.score)
            }
            _ => "no winner".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::PlayerState;

    fn world_with_local() -> World {
        let mut world = World::new(3);
        world.spawn_local(PeerId::new("local"), PlayerName::new("me"));
        world.local_player_mut().unwrap().position = Vec2::new(640.0, 650.0);
        world
    }

    fn add_replica(world: &mut World, id: &str, position: Vec2) {
        let (player, _) = world.replica_entry(PeerId::new(id)).unwrap();
        player.position = position;
    }

    fn bullet_at(owner: &str, position: Vec2, velocity: Vec2) -> BulletState {
        BulletState {
            position: position.to_array(),
            velocity: velocity.to_array(),
            damage: 25.0,
            owner: PeerId::new(owner),
            lifetime: BULLET_LIFETIME,
            ..Default::default()
        }
    }

    #[test]
    fn one_slot_per_peer() {
        let mut world = world_with_local();
        let (_, created) = world.replica_entry(PeerId::new("abc123")).unwrap();
        assert!(created);
        let (_, created) = world.replica_entry(PeerId::new("abc123")).unwrap();
        assert!(!created);
        assert_eq!(world.player_count(), 2);
    }

    #[test]
    fn table_is_bounded() {
        let mut world = world_with_local();
        for i in 0..MAX_PEERS - 1 {
            assert!(world.replica_entry(PeerId::new(&format!("p{}", i))).is_some());
        }
        assert!(world.replica_entry(PeerId::new("overflow")).is_none());

        world.remove_player(PeerId::new("p0"));
        assert!(world.replica_entry(PeerId::new("overflow")).is_some());
    }

    #[test]
    fn bullet_never_damages_its_owner() {
        let mut world = world_with_local();
        add_replica(&mut world, "abc123", Vec2::new(600.0, 300.0));

        world.spawn_bullet(&bullet_at(
            "abc123",
            Vec2::new(590.0, 300.0),
            Vec2::new(100.0, 0.0),
        ));
        world.step(0.1);

        assert_eq!(world.player(&PeerId::new("abc123")).unwrap().health, MAX_HEALTH);
    }

    #[test]
    fn bullet_damages_others_and_is_consumed() {
        let mut world = world_with_local();
        add_replica(&mut world, "abc123", Vec2::new(600.0, 300.0));

        world.spawn_bullet(&bullet_at("xyz789", Vec2::new(500.0, 300.0), Vec2::new(900.0, 0.0)));
        world.step(0.2);

        assert_eq!(world.player(&PeerId::new("abc123")).unwrap().health, 75.0);
        assert_eq!(world.bullet_count(), 0);
    }

    #[test]
    fn teammates_are_not_hit_in_team_modes() {
        let mut world = world_with_local();
        world.set_mode(GameMode::TeamDeathmatch);
        add_replica(&mut world, "shooter", Vec2::new(100.0, 100.0));
        add_replica(&mut world, "mate", Vec2::new(600.0, 300.0));
        world.player_mut(&PeerId::new("shooter")).unwrap().team = 1;
        world.player_mut(&PeerId::new("mate")).unwrap().team = 1;

        world.spawn_bullet(&bullet_at("shooter", Vec2::new(500.0, 300.0), Vec2::new(900.0, 0.0)));
        world.step(0.2);

        assert_eq!(world.player(&PeerId::new("mate")).unwrap().health, MAX_HEALTH);
    }

    #[test]
    fn local_kill_scores_in_deathmatch() {
        let mut world = world_with_local();
        add_replica(&mut world, "victim", Vec2::new(600.0, 300.0));
        world.player_mut(&PeerId::new("victim")).unwrap().health = 10.0;

        world.spawn_bullet(&bullet_at("local", Vec2::new(500.0, 300.0), Vec2::new(900.0, 0.0)));
        let events = world.step(0.2);

        assert!(events.contains(&WorldEvent::Killed {
            victim: PeerId::new("victim"),
            killer: PeerId::new("local"),
        }));
        let local = world.local_player().unwrap();
        assert_eq!((local.kills, local.score), (1, 1));
        assert_eq!(world.player(&PeerId::new("victim")).unwrap().health, 0.0);
    }

    #[test]
    fn replicas_dead_reckon() {
        let mut world = world_with_local();
        let (player, _) = world.replica_entry(PeerId::new("abc123")).unwrap();
        player.position = Vec2::new(100.0, 100.0);
        player.velocity = Vec2::new(50.0, 0.0);

        world.step(0.5);
        assert_eq!(world.player(&PeerId::new("abc123")).unwrap().position, Vec2::new(125.0, 100.0));
    }

    #[test]
    fn flag_capture_scores_for_carrier_team() {
        let mut world = world_with_local();
        world.set_mode(GameMode::CaptureFlag);
        let blue_base = world.flags()[1].base;
        let red_base = world.flags()[0].base;

        add_replica(&mut world, "runner", blue_base);
        world.player_mut(&PeerId::new("runner")).unwrap().team = 0;

        let events = world.step(0.01);
        assert!(matches!(events.as_slice(), [WorldEvent::FlagTaken { flag: 1, .. }]));

        world.player_mut(&PeerId::new("runner")).unwrap().position = red_base;
        let events = world.step(0.01);
        assert!(events.contains(&WorldEvent::FlagCaptured { team: 0 }));
        assert_eq!(world.team_scores(), [1, 0]);
        assert!(!world.flags()[1].captured);
    }

    #[test]
    fn missing_carrier_returns_flag() {
        let mut world = world_with_local();
        world.set_mode(GameMode::CaptureFlag);
        let mut state = world.flag_state(0).unwrap();
        state.captured = true;
        state.carrier = PeerId::new("gone");
        state.position = [400.0, 400.0];
        world.set_flag(0, &state);

        let events = world.step(0.01);
        assert!(events.contains(&WorldEvent::FlagReturned { flag: 0 }));
        assert_eq!(world.flags()[0].position, world.flags()[0].base);
    }

    #[test]
    fn team_follows_sorted_roster() {
        let mut world = World::new(3);
        world.spawn_local(PeerId::new("m"), PlayerName::new("me"));
        world.replica_entry(PeerId::new("a"));
        world.replica_entry(PeerId::new("z"));

        world.set_mode(GameMode::TeamDeathmatch);
        assert_eq!(world.local_player().unwrap().team, 1);
    }

    #[test]
    fn round_ends_and_resets() {
        let mut world = world_with_local();
        world.set_mode(GameMode::TeamDeathmatch);
        world.set_team_scores([3, 1]);

        let mut summary = None;
        for _ in 0..301 {
            for event in world.step(1.0) {
                if let WorldEvent::RoundOver { summary: s } = event {
                    summary = Some(s);
                }
            }
        }

        assert_eq!(summary.as_deref(), Some("RED wins 3-1"));
        assert_eq!(world.team_scores(), [0, 0]);
    }

    #[test]
    fn replica_from_state_snapshot() {
        let mut world = world_with_local();
        let mut state = PlayerState {
            id: PeerId::new("abc123"),
            ..Default::default()
        };
        state.position = [10.0, 20.0];
        state.health = 50.0;

        let (player, _) = world.replica_entry(state.id).unwrap();
        *player = Player::from_state(&state, false, 0.0);

        assert_eq!(world.player(&state.id).unwrap().health, 50.0);
        assert_eq!(world.handle_of(&state.id).map(|h| h.index()), Some(1));
    }
}
