use std::collections::VecDeque;
use std::net::SocketAddr;

use glam::Vec2;
use log::{debug, info, warn};

use super::outbox::{Destination, Outbox};
use super::reconcile::reconcile_position;
use crate::config::NetConfig;
use crate::event::{LeaveReason, SessionEvent};
use crate::net::{
    BulletState, ChatPayload, ChatText, FLAG_COUNT, FlagState, GameMode, Inbound, NetworkMessage,
    Payload, PeerId, PeerRegistry, PlayerName, PlayerState,
};
use crate::world::{Player, World};

/// Fires once every `interval` seconds of accumulated time.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    interval: f64,
    elapsed: f64,
}

impl IntervalTimer {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            elapsed: 0.0,
        }
    }

    pub fn tick(&mut self, dt: f64) -> bool {
        self.elapsed += dt;
        if self.elapsed >= self.interval {
            self.elapsed = 0.0;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}

/// The session state the replicator works on for one call.
pub struct Context<'a> {
    pub hosting: bool,
    pub local_id: PeerId,
    pub now: f64,
    pub world: &'a mut World,
    pub registry: &'a mut PeerRegistry,
    pub outbox: &'a mut Outbox,
    pub events: &'a mut VecDeque<SessionEvent>,
}

impl Context<'_> {
    /// Where locally originated traffic goes: every peer when hosting, the host otherwise.
    fn fan_out(&self) -> Destination {
        if self.hosting {
            Destination::Peers { except: None }
        } else {
            Destination::Host
        }
    }

    fn relay(&mut self, message: NetworkMessage, from: SocketAddr) {
        if self.hosting {
            self.outbox.push(message, Destination::Peers { except: Some(from) });
        }
    }

    fn send(&mut self, payload: Payload) {
        let destination = self.fan_out();
        self.outbox
            .push(NetworkMessage::new(self.local_id, payload), destination);
    }
}

pub struct Replicator {
    state_timer: IntervalTimer,
    ping_timer: IntervalTimer,
    mode_timer: IntervalTimer,
    flag_timer: IntervalTimer,
    eviction_timer: IntervalTimer,
    ping_started: Option<f64>,
    ping_ms: Option<f32>,
    snap_threshold: f32,
    blend: f32,
}

impl Replicator {
    pub fn new(config: &NetConfig) -> Self {
        Self {
            state_timer: IntervalTimer::new(config.state_interval),
            ping_timer: IntervalTimer::new(config.ping_interval),
            mode_timer: IntervalTimer::new(config.mode_interval),
            flag_timer: IntervalTimer::new(config.flag_interval),
            eviction_timer: IntervalTimer::new(config.eviction_interval),
            ping_started: None,
            ping_ms: None,
            snap_threshold: config.snap_threshold,
            blend: config.blend,
        }
    }

    /// Called on every role change.
    pub fn reset(&mut self) {
        self.state_timer.reset();
        self.ping_timer.reset();
        self.mode_timer.reset();
        self.flag_timer.reset();
        self.eviction_timer.reset();
        self.ping_started = None;
        self.ping_ms = None;
    }

    pub fn ping_ms(&self) -> Option<f32> {
        self.ping_ms
    }

    pub fn announce_join(&self, ctx: &mut Context<'_>) {
        if let Some(local) = ctx.world.local_player() {
            let state = local.to_state(ctx.now);
            ctx.send(Payload::Join(state));
        }
    }

    pub fn announce_shots(&self, ctx: &mut Context<'_>, shots: &[BulletState]) {
        for shot in shots {
            ctx.send(Payload::Shoot(*shot));
        }
    }

    pub fn announce_chat(&self, ctx: &mut Context<'_>, chat: ChatPayload) {
        ctx.send(Payload::Chat(chat));
    }

    pub fn announce_mode(&self, ctx: &mut Context<'_>, mode: GameMode) {
        ctx.send(Payload::ModeChange(mode));
    }

    pub fn announce_leave(&self, ctx: &mut Context<'_>) {
        ctx.send(Payload::Leave);
    }

    /// Runs the outbound timers and queues whatever is due.
    pub fn publish(&mut self, ctx: &mut Context<'_>, dt: f64) {
        if self.state_timer.tick(dt) {
            if let Some(local) = ctx.world.local_player() {
                let state = local.to_state(ctx.now);
                ctx.send(Payload::Update(state));
            }
        }

        if self.ping_timer.tick(dt) {
            let now = ctx.now;
            self.ping_started = Some(now);
            ctx.send(Payload::Ping { sent_at: now });
        }

        let mode = ctx.world.mode();
        if ctx.hosting && self.mode_timer.tick(dt) {
            ctx.send(Payload::ModeChange(mode));
            if mode.is_team_based() {
                let scores = ctx.world.team_scores();
                ctx.send(Payload::TeamScores(scores));
            }
        }

        if mode == GameMode::CaptureFlag && self.flag_timer.tick(dt) {
            for index in 0..FLAG_COUNT {
                if let Some(flag) = ctx.world.flag_state(index) {
                    ctx.send(Payload::Flag {
                        flag,
                        index: index as u8,
                    });
                }
            }
        }

        if ctx.hosting && self.eviction_timer.tick(dt) {
            self.evict_idle(ctx);
        }
    }

    fn evict_idle(&mut self, ctx: &mut Context<'_>) {
        for peer in ctx.registry.evict_idle(ctx.now) {
            info!("evicting idle peer {}", peer.addr);
            let Some(id) = peer.peer_id else {
                continue;
            };

            if ctx.world.remove_player(id).is_some() {
                ctx.events.push_back(SessionEvent::PeerLeft {
                    id,
                    reason: LeaveReason::Timeout,
                });
            }
            ctx.outbox.push(
                NetworkMessage::new(id, Payload::Leave),
                Destination::Peers { except: None },
            );
        }
    }

    pub fn handle_inbound(&mut self, ctx: &mut Context<'_>, inbound: &Inbound) {
        let Inbound { message, from } = *inbound;
        let sender = message.sender;

        if ctx.hosting {
            ctx.registry.touch(from, ctx.now);
        }

        debug!("{} from {} ({})", message.payload.kind(), sender, from);

        match message.payload {
            Payload::Join(state) => self.on_join(ctx, sender, &state, from),
            Payload::Leave => self.on_leave(ctx, message, from),
            Payload::Update(state) => self.on_update(ctx, message, &state, from),
            Payload::Shoot(bullet) => {
                if sender == ctx.local_id {
                    return;
                }
                ctx.world.spawn_bullet(&bullet);
                ctx.relay(message, from);
            }
            Payload::Ping { sent_at } => {
                if ctx.hosting || sender != ctx.local_id {
                    ctx.outbox.push(
                        NetworkMessage::new(sender, Payload::Pong { sent_at }),
                        Destination::Unicast(from),
                    );
                }
            }
            Payload::Pong { .. } => {
                if sender == ctx.local_id {
                    if let Some(started) = self.ping_started {
                        self.ping_ms = Some(((ctx.now - started) * 1000.0) as f32);
                    }
                }
            }
            Payload::ModeChange(mode) => {
                if sender == ctx.local_id || mode == ctx.world.mode() {
                    return;
                }
                info!("mode changed to {} by {}", mode.name(), sender);
                ctx.world.set_mode(mode);
                ctx.events.push_back(SessionEvent::ModeChanged { mode });
                ctx.relay(message, from);
            }
            Payload::TeamScores(scores) => {
                if sender == ctx.local_id
                    || !ctx.world.mode().is_team_based()
                    || scores == ctx.world.team_scores()
                {
                    return;
                }
                ctx.world.set_team_scores(scores);
                ctx.relay(message, from);
            }
            Payload::Flag { flag, index } => self.on_flag(ctx, message, &flag, index, from),
            Payload::Chat(chat) => {
                if sender == ctx.local_id {
                    return;
                }
                let name = chat.sender_name.as_str().to_string();
                let text = chat.text.as_str().to_string();
                ctx.world.push_chat(&name, &text);
                ctx.events.push_back(SessionEvent::Chat { sender: name, text });
                ctx.relay(message, from);
            }
        }
    }

    fn on_join(
        &mut self,
        ctx: &mut Context<'_>,
        sender: PeerId,
        state: &PlayerState,
        from: SocketAddr,
    ) {
        if sender == ctx.local_id {
            warn!("ignoring join from {} carrying our own id", from);
            return;
        }

        let now = ctx.now;
        let Some((player, created)) = ctx.world.replica_entry(sender) else {
            warn!("player table full, dropping join from {}", sender);
            return;
        };
        *player = Player::from_state(state, false, now);
        player.id = sender;
        let name = player.name.as_str().to_string();

        if created {
            info!("{} ({}) joined from {}", name, sender, from);
            ctx.events.push_back(SessionEvent::PeerJoined { id: sender, name });
        }

        if ctx.hosting {
            let added = ctx.registry.add_if_absent(from, now);
            if !added && !ctx.registry.contains(from) {
                warn!("peer registry full, {} will not receive broadcasts", from);
            }
            for stale in ctx.registry.bind_peer(from, sender) {
                info!("{} moved from {} to {}", sender, stale.addr, from);
            }
            if added {
                self.send_snapshot(ctx, sender, from);
            }
        }
    }

    /// Late-join catch-up: everything a newcomer needs, unicast to it alone.
    fn send_snapshot(&self, ctx: &mut Context<'_>, joiner: PeerId, to: SocketAddr) {
        let destination = Destination::Unicast(to);
        let now = ctx.now;

        let states: Vec<PlayerState> = ctx
            .world
            .players()
            .filter(|p| p.id != joiner)
            .map(|p| p.to_state(now))
            .collect();
        for state in states {
            ctx.outbox
                .push(NetworkMessage::new(state.id, Payload::Join(state)), destination);
        }

        let mode = ctx.world.mode();
        let local = ctx.local_id;
        ctx.outbox
            .push(NetworkMessage::new(local, Payload::ModeChange(mode)), destination);

        if mode.is_team_based() {
            let scores = ctx.world.team_scores();
            ctx.outbox
                .push(NetworkMessage::new(local, Payload::TeamScores(scores)), destination);
        }

        if mode == GameMode::CaptureFlag {
            for index in 0..FLAG_COUNT {
                if let Some(flag) = ctx.world.flag_state(index) {
                    let payload = Payload::Flag {
                        flag,
                        index: index as u8,
                    };
                    ctx.outbox
                        .push(NetworkMessage::new(local, payload), destination);
                }
            }
        }
    }

    fn on_leave(&mut self, ctx: &mut Context<'_>, message: NetworkMessage, from: SocketAddr) {
        let sender = message.sender;
        if sender == ctx.local_id {
            return;
        }

        if ctx.world.remove_player(sender).is_some() {
            info!("{} left", sender);
            ctx.events.push_back(SessionEvent::PeerLeft {
                id: sender,
                reason: LeaveReason::Graceful,
            });
        }

        if ctx.hosting {
            ctx.registry.remove(from);
            ctx.relay(message, from);
        }
    }

    fn on_update(
        &mut self,
        ctx: &mut Context<'_>,
        message: NetworkMessage,
        state: &PlayerState,
        from: SocketAddr,
    ) {
        let sender = message.sender;
        if sender == ctx.local_id {
            warn!("ignoring update from {} carrying our own id", from);
            return;
        }

        let now = ctx.now;
        let Some((player, created)) = ctx.world.replica_entry(sender) else {
            warn!("player table full, dropping update from {}", sender);
            return;
        };

        if created {
            *player = Player::from_state(state, false, now);
            player.id = sender;
            ctx.events.push_back(SessionEvent::PeerJoined {
                id: sender,
                name: player.name.as_str().to_string(),
            });
        } else {
            player.position = reconcile_position(
                player.position,
                Vec2::from_array(state.position),
                self.snap_threshold,
                self.blend,
            );
            player.apply_state(state, now);
        }

        ctx.relay(message, from);
    }

    fn on_flag(
        &mut self,
        ctx: &mut Context<'_>,
        message: NetworkMessage,
        flag: &FlagState,
        index: u8,
        from: SocketAddr,
    ) {
        let index = usize::from(index);
        if message.sender == ctx.local_id
            || ctx.world.mode() != GameMode::CaptureFlag
            || index >= FLAG_COUNT
            || ctx.world.flag_state(index).as_ref() == Some(flag)
        {
            return;
        }

        ctx.world.set_flag(index, flag);
        ctx.relay(message, from);
    }
}

/// Builds the chat payload for `text` sent by `name`.
pub fn chat_payload(name: &str, text: &str) -> ChatPayload {
    ChatPayload {
        text: ChatText::new(text),
        sender_name: PlayerName::new(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Harness {
        world: World,
        registry: PeerRegistry,
        outbox: Outbox,
        events: VecDeque<SessionEvent>,
        replicator: Replicator,
        hosting: bool,
        now: f64,
    }

    impl Harness {
        fn new(hosting: bool) -> Self {
            let mut world = World::new(5);
            world.spawn_local(PeerId::new("xyz789"), PlayerName::new("host"));
            Self {
                world,
                registry: PeerRegistry::new(16, 10.0),
                outbox: Outbox::default(),
                events: VecDeque::new(),
                replicator: Replicator::new(&NetConfig::default()),
                hosting,
                now: 0.0,
            }
        }

        fn receive(&mut self, message: NetworkMessage, from: SocketAddr) {
            let mut ctx = Context {
                hosting: self.hosting,
                local_id: PeerId::new("xyz789"),
                now: self.now,
                world: &mut self.world,
                registry: &mut self.registry,
                outbox: &mut self.outbox,
                events: &mut self.events,
            };
            self.replicator
                .handle_inbound(&mut ctx, &Inbound { message, from });
        }

        fn publish(&mut self, dt: f64) {
            self.now += dt;
            let mut ctx = Context {
                hosting: self.hosting,
                local_id: PeerId::new("xyz789"),
                now: self.now,
                world: &mut self.world,
                registry: &mut self.registry,
                outbox: &mut self.outbox,
                events: &mut self.events,
            };
            self.replicator.publish(&mut ctx, dt);
        }

        fn sends(&mut self) -> Vec<(NetworkMessage, SocketAddr)> {
            self.outbox.resolve(&self.registry, None)
        }
    }

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    fn player(id: &str, x: f32, y: f32) -> PlayerState {
        PlayerState {
            id: PeerId::new(id),
            name: PlayerName::new(id),
            position: [x, y],
            health: 100.0,
            max_health: 100.0,
            ..Default::default()
        }
    }

    fn join(id: &str) -> NetworkMessage {
        NetworkMessage::new(PeerId::new(id), Payload::Join(player(id, 50.0, 50.0)))
    }

    fn update(id: &str) -> NetworkMessage {
        NetworkMessage::new(PeerId::new(id), Payload::Update(player(id, 50.0, 50.0)))
    }

    #[test]
    fn late_join_gets_roster_and_mode_only() {
        let mut host = Harness::new(true);
        host.registry.add_if_absent(addr("198.51.100.1:5000"), 0.0);
        let newcomer = addr("203.0.113.5:40000");

        host.receive(join("abc123"), newcomer);

        assert_eq!(host.world.player_count(), 2);
        assert!(host.registry.contains(newcomer));

        let sends = host.sends();
        assert_eq!(sends.len(), 2);
        assert!(sends.iter().all(|(_, to)| *to == newcomer));
        assert!(matches!(sends[0].0.payload, Payload::Join(_)));
        assert_eq!(sends[0].0.sender, PeerId::new("xyz789"));
        assert!(matches!(
            sends[1].0.payload,
            Payload::ModeChange(GameMode::Deathmatch)
        ));
    }

    #[test]
    fn late_join_in_capture_flag_includes_scores_and_flags() {
        let mut host = Harness::new(true);
        host.world.set_mode(GameMode::CaptureFlag);
        host.receive(join("p1"), addr("10.0.0.1:1"));
        host.sends();

        host.receive(join("p2"), addr("10.0.0.2:2"));
        let kinds: Vec<&str> = host.sends().iter().map(|(m, _)| m.payload.kind()).collect();
        assert_eq!(kinds, vec!["join", "join", "mode", "scores", "flag", "flag"]);
    }

    #[test]
    fn relayed_update_skips_its_source() {
        let mut host = Harness::new(true);
        let peers = [addr("10.0.0.1:1"), addr("10.0.0.2:2"), addr("10.0.0.3:3")];
        for (i, peer) in peers.iter().enumerate() {
            host.receive(join(&format!("p{}", i)), *peer);
        }
        host.sends();

        let update = NetworkMessage::new(PeerId::new("p0"), Payload::Update(player("p0", 60.0, 50.0)));
        host.receive(update, peers[0]);

        let targets: Vec<SocketAddr> = host.sends().into_iter().map(|(_, to)| to).collect();
        assert_eq!(targets, vec![peers[1], peers[2]]);
    }

    #[test]
    fn client_does_not_relay() {
        let mut client = Harness::new(false);
        let update = NetworkMessage::new(PeerId::new("p0"), Payload::Update(player("p0", 60.0, 50.0)));
        client.receive(update, addr("10.0.0.9:7777"));

        assert!(client.outbox.is_empty());
        assert!(client.world.player(&PeerId::new("p0")).is_some());
    }

    #[test]
    fn update_reconciles_position() {
        let mut client = Harness::new(false);
        let host = addr("10.0.0.9:7777");
        client.receive(join("p0"), host);

        let near = NetworkMessage::new(PeerId::new("p0"), Payload::Update(player("p0", 60.0, 50.0)));
        client.receive(near, host);
        let x = client.world.player(&PeerId::new("p0")).unwrap().position.x;
        assert!(x > 50.0 && x < 60.0);

        let far = NetworkMessage::new(PeerId::new("p0"), Payload::Update(player("p0", 900.0, 50.0)));
        client.receive(far, host);
        assert_eq!(
            client.world.player(&PeerId::new("p0")).unwrap().position,
            Vec2::new(900.0, 50.0)
        );
    }

    #[test]
    fn own_id_never_overwrites_local_player() {
        let mut client = Harness::new(false);
        let before = client.world.local_player().unwrap().position;

        let forged = NetworkMessage::new(
            PeerId::new("xyz789"),
            Payload::Update(player("xyz789", 1.0, 1.0)),
        );
        client.receive(forged, addr("10.0.0.9:7777"));

        assert_eq!(client.world.local_player().unwrap().position, before);
    }

    #[test]
    fn leave_removes_replica_and_is_relayed() {
        let mut host = Harness::new(true);
        let (a, b) = (addr("10.0.0.1:1"), addr("10.0.0.2:2"));
        host.receive(join("p1"), a);
        host.receive(join("p2"), b);
        host.sends();

        host.receive(NetworkMessage::new(PeerId::new("p1"), Payload::Leave), a);

        assert!(host.world.player(&PeerId::new("p1")).is_none());
        assert!(!host.registry.contains(a));
        let sends = host.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].1, b);
    }

    #[test]
    fn ping_is_answered_and_pong_measures_rtt() {
        let mut host = Harness::new(true);
        let client = addr("10.0.0.1:1");
        host.receive(join("p1"), client);
        host.sends();

        host.receive(
            NetworkMessage::new(PeerId::new("p1"), Payload::Ping { sent_at: 3.0 }),
            client,
        );
        let sends = host.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].0.sender, PeerId::new("p1"));
        assert!(matches!(sends[0].0.payload, Payload::Pong { sent_at } if sent_at == 3.0));

        host.publish(1.0);
        host.sends();
        host.now += 0.05;
        host.receive(
            NetworkMessage::new(PeerId::new("xyz789"), Payload::Pong { sent_at: 1.0 }),
            client,
        );
        let ping = host.replicator.ping_ms().unwrap();
        assert!((ping - 50.0).abs() < 0.01);
    }

    #[test]
    fn client_applies_only_differing_mode() {
        let mut client = Harness::new(false);
        let host = addr("10.0.0.9:7777");

        client.receive(
            NetworkMessage::new(PeerId::new("h"), Payload::ModeChange(GameMode::Deathmatch)),
            host,
        );
        assert!(client.events.is_empty());

        client.receive(
            NetworkMessage::new(PeerId::new("h"), Payload::ModeChange(GameMode::TeamDeathmatch)),
            host,
        );
        assert_eq!(client.world.mode(), GameMode::TeamDeathmatch);
        assert_eq!(
            client.events.pop_back(),
            Some(SessionEvent::ModeChanged {
                mode: GameMode::TeamDeathmatch
            })
        );

        client.receive(
            NetworkMessage::new(PeerId::new("h"), Payload::TeamScores([2, 5])),
            host,
        );
        assert_eq!(client.world.team_scores(), [2, 5]);
    }

    #[test]
    fn flags_ignored_outside_capture_flag() {
        let mut client = Harness::new(false);
        let mut flag = client.world.flag_state(0).unwrap();
        flag.position = [500.0, 500.0];

        let message = NetworkMessage::new(PeerId::new("h"), Payload::Flag { flag, index: 0 });
        client.receive(message, addr("10.0.0.9:7777"));
        assert_ne!(client.world.flags()[0].position, Vec2::new(500.0, 500.0));

        client.world.set_mode(GameMode::CaptureFlag);
        client.receive(message, addr("10.0.0.9:7777"));
        assert_eq!(client.world.flags()[0].position, Vec2::new(500.0, 500.0));

        let bad = NetworkMessage::new(PeerId::new("h"), Payload::Flag { flag, index: 7 });
        client.receive(bad, addr("10.0.0.9:7777"));
    }

    #[test]
    fn chat_is_logged_and_relayed() {
        let mut host = Harness::new(true);
        let (a, b) = (addr("10.0.0.1:1"), addr("10.0.0.2:2"));
        host.receive(join("p1"), a);
        host.receive(join("p2"), b);
        host.sends();

        let chat = NetworkMessage::new(PeerId::new("p1"), Payload::Chat(chat_payload("p1", "hello")));
        host.receive(chat, a);

        assert_eq!(host.world.chat().iter().next().unwrap().text, "hello");
        let sends = host.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].1, b);
    }

    #[test]
    fn host_publishes_on_its_timers() {
        let mut host = Harness::new(true);
        host.receive(join("p1"), addr("10.0.0.1:1"));
        host.sends();

        host.publish(0.034);
        let kinds: Vec<&str> = host.sends().iter().map(|(m, _)| m.payload.kind()).collect();
        assert_eq!(kinds, vec!["update"]);

        for _ in 0..150 {
            host.publish(0.034);
        }
        let kinds: Vec<&str> = host.sends().iter().map(|(m, _)| m.payload.kind()).collect();
        assert!(kinds.contains(&"ping"));
        assert!(kinds.contains(&"mode"));
        assert!(!kinds.contains(&"flag"));
    }

    #[test]
    fn rejoin_from_new_port_replaces_the_old_address() {
        let mut host = Harness::new(true);
        let (old, b) = (addr("10.0.0.1:1000"), addr("10.0.0.2:2"));
        let new = addr("10.0.0.1:2000");
        host.receive(join("p1"), old);
        host.receive(join("p2"), b);

        host.now = 5.0;
        host.receive(join("p1"), new);
        assert!(!host.registry.contains(old));
        assert!(host.registry.contains(new));
        assert_eq!(host.registry.len(), 2);
        host.sends();
        host.events.clear();

        host.now = 10.0;
        host.receive(update("p1"), new);
        host.receive(update("p2"), b);
        host.sends();

        host.publish(1.5);

        assert!(host.world.player(&PeerId::new("p1")).is_some());
        assert!(host.events.is_empty());
        let sends = host.sends();
        assert!(sends.iter().all(|(m, _)| m.payload != Payload::Leave));
        let updates: Vec<SocketAddr> = sends
            .iter()
            .filter(|(m, _)| matches!(m.payload, Payload::Update(_)))
            .map(|(_, to)| *to)
            .collect();
        assert_eq!(updates, vec![b, new]);
    }

    #[test]
    fn repeated_join_from_known_address_gets_no_snapshot() {
        let mut host = Harness::new(true);
        let a = addr("10.0.0.1:1");
        host.receive(join("p1"), a);
        assert_eq!(host.sends().len(), 2);

        host.receive(join("p1"), a);
        assert!(host.sends().is_empty());
        assert_eq!(host.world.player_count(), 2);
        assert_eq!(host.registry.len(), 1);
    }

    #[test]
    fn shots_spawn_bullets_and_relay_to_the_others() {
        let mut host = Harness::new(true);
        let (a, b, c) = (addr("10.0.0.1:1"), addr("10.0.0.2:2"), addr("10.0.0.3:3"));
        host.receive(join("p1"), a);
        host.receive(join("p2"), b);
        host.receive(join("p3"), c);
        host.sends();

        let bullet = BulletState {
            position: [300.0, 300.0],
            velocity: [400.0, 0.0],
            damage: 25.0,
            owner: PeerId::new("p1"),
            lifetime: 2.0,
            ..Default::default()
        };
        host.receive(NetworkMessage::new(PeerId::new("p1"), Payload::Shoot(bullet)), a);

        assert_eq!(host.world.bullet_count(), 1);
        assert_eq!(host.world.bullets().next().unwrap().owner, PeerId::new("p1"));
        let targets: Vec<SocketAddr> = host.sends().into_iter().map(|(_, to)| to).collect();
        assert_eq!(targets, vec![b, c]);

        let echoed = BulletState {
            owner: PeerId::new("xyz789"),
            ..bullet
        };
        host.receive(NetworkMessage::new(PeerId::new("xyz789"), Payload::Shoot(echoed)), b);
        assert_eq!(host.world.bullet_count(), 1);
        assert!(host.sends().is_empty());
    }

    #[test]
    fn idle_peer_is_evicted_and_announced() {
        let mut host = Harness::new(true);
        let (a, b) = (addr("10.0.0.1:1"), addr("10.0.0.2:2"));
        host.receive(join("p1"), a);
        host.now = 9.0;
        host.receive(join("p2"), b);
        host.sends();

        host.publish(2.0);

        assert!(host.world.player(&PeerId::new("p1")).is_none());
        assert!(!host.registry.contains(a));
        let leaves: Vec<(PeerId, SocketAddr)> = host
            .sends()
            .into_iter()
            .filter(|(m, _)| m.payload == Payload::Leave)
            .map(|(m, to)| (m.sender, to))
            .collect();
        assert_eq!(leaves, vec![(PeerId::new("p1"), b)]);
    }
}
