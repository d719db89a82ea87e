use std::collections::VecDeque;
use std::net::SocketAddr;

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::config::NetConfig;
use crate::error::SessionError;
use crate::event::SessionEvent;
use crate::intent::Intent;
use crate::net::{
    BulletState, Connector, GameMode, Inbound, NetworkStats, PeerId, PeerRegistry, PlayerName,
    Transport, UdpConnector, generate_peer_id, rand_u64,
};
use crate::replication::{Context, Outbox, Replicator, chat_payload};
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Disconnected,
    Hosting,
    Joined,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Disconnected => "disconnected",
            Role::Hosting => "hosting",
            Role::Joined => "joined",
        }
    }
}

/// What a rebuild reconnects to.
#[derive(Debug, Clone, PartialEq)]
enum Target {
    Port(u16),
    Remote { host: String, port: u16 },
}

#[derive(Debug, Clone, Default)]
struct LinkHealth {
    failures: u32,
    last_attempt: f64,
    reconnects: u32,
    down_reported: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub role: Role,
    pub local_id: String,
    pub local_addr: Option<SocketAddr>,
    pub host_addr: Option<SocketAddr>,
    pub ping_ms: Option<f32>,
    pub stats: NetworkStats,
    pub peers: usize,
    pub players: usize,
    pub mode: GameMode,
    pub failures: u32,
    pub reconnects: u32,
    pub uptime: f64,
}

/// One participant's view of a match plus the socket that keeps it in sync.
pub struct Session<C: Connector = UdpConnector> {
    connector: C,
    transport: Option<C::Transport>,
    role: Role,
    target: Option<Target>,
    host_addr: Option<SocketAddr>,
    local_id: PeerId,
    name: PlayerName,
    config: NetConfig,
    world: World,
    registry: PeerRegistry,
    replicator: Replicator,
    outbox: Outbox,
    inbound: Vec<Inbound>,
    events: VecDeque<SessionEvent>,
    clock: f64,
    started_at: f64,
    link: LinkHealth,
}

impl Session<UdpConnector> {
    pub fn new(name: &str, config: NetConfig) -> Self {
        Self::with_connector(
            UdpConnector,
            generate_peer_id(),
            name,
            config,
            rand_u64(),
        )
    }
}

impl<C: Connector> Session<C> {
    pub fn with_connector(
        connector: C,
        local_id: PeerId,
        name: &str,
        config: NetConfig,
        seed: u64,
    ) -> Self {
        Self {
            connector,
            transport: None,
            role: Role::Disconnected,
            target: None,
            host_addr: None,
            local_id,
            name: PlayerName::new(name),
            registry: PeerRegistry::new(config.max_peers, config.peer_idle_timeout),
            replicator: Replicator::new(&config),
            world: World::new(seed),
            outbox: Outbox::default(),
            inbound: Vec::new(),
            events: VecDeque::new(),
            clock: 0.0,
            started_at: 0.0,
            link: LinkHealth::default(),
            config,
        }
    }

    pub fn start_host(&mut self, port: u16) -> Result<(), SessionError> {
        self.teardown();

        let transport = self.connector.bind(port)?;
        let addr = transport.local_addr();
        self.transport = Some(transport);
        self.role = Role::Hosting;
        self.target = Some(Target::Port(addr.port()));
        self.enter_session();

        info!("hosting on {} as {}", addr, self.local_id);
        self.events.push_back(SessionEvent::Hosting { addr });
        Ok(())
    }

    pub fn join_host(&mut self, host: &str, port: u16) -> Result<(), SessionError> {
        self.teardown();

        let transport = self.connector.connect(host, port)?;
        self.host_addr = transport.remote_addr();
        self.transport = Some(transport);
        self.role = Role::Joined;
        self.target = Some(Target::Remote {
            host: host.to_string(),
            port,
        });
        self.enter_session();

        let (replicator, mut ctx) = self.split();
        replicator.announce_join(&mut ctx);
        self.flush();

        if let Some(host) = self.host_addr {
            info!("joined {} as {}", host, self.local_id);
            self.events.push_back(SessionEvent::Joined { host });
        }
        Ok(())
    }

    /// Best-effort `Leave` to everyone we talk to, then back to disconnected.
    pub fn leave_session(&mut self) {
        if self.role == Role::Disconnected {
            return;
        }

        let (replicator, mut ctx) = self.split();
        replicator.announce_leave(&mut ctx);
        self.flush();

        info!("left session");
        self.teardown();
        self.events.push_back(SessionEvent::Left);
    }

    pub fn send_chat(&mut self, text: &str) {
        let sender = self.name.as_str().to_string();
        self.world.push_chat(&sender, text);

        if self.role != Role::Disconnected {
            let payload = chat_payload(&sender, text);
            let (replicator, mut ctx) = self.split();
            replicator.announce_chat(&mut ctx, payload);
        }
    }

    pub fn send_shot(&mut self, bullet: BulletState) {
        let bullet = BulletState {
            owner: self.local_id,
            ..bullet
        };
        self.world.spawn_bullet(&bullet);

        if self.role != Role::Disconnected {
            let (replicator, mut ctx) = self.split();
            replicator.announce_shots(&mut ctx, &[bullet]);
        }
    }

    pub fn change_mode(&mut self, mode: GameMode) {
        self.world.set_mode(mode);
        self.events.push_back(SessionEvent::ModeChanged { mode });

        if self.role != Role::Disconnected {
            let (replicator, mut ctx) = self.split();
            replicator.announce_mode(&mut ctx, mode);
        }
    }

    /// Advances the session by `dt` seconds: drain, apply, simulate, publish, supervise.
    pub fn update(&mut self, dt: f64, intent: Option<&Intent>) {
        self.clock += dt;
        if self.role == Role::Disconnected {
            return;
        }

        self.poll_inbound();

        let inbound = std::mem::take(&mut self.inbound);
        {
            let (replicator, mut ctx) = self.split();
            for item in &inbound {
                replicator.handle_inbound(&mut ctx, item);
            }
        }
        self.inbound = inbound;

        let idle = Intent::default();
        let shots = self.world.drive_local(intent.unwrap_or(&idle), dt as f32);
        for event in self.world.step(dt as f32) {
            self.events.push_back(SessionEvent::World(event));
        }

        {
            let (replicator, mut ctx) = self.split();
            replicator.announce_shots(&mut ctx, &shots);
            replicator.publish(&mut ctx, dt);
        }

        self.flush();
        self.supervise();
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn local_id(&self) -> PeerId {
        self.local_id
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = SessionEvent> + '_ {
        self.events.drain(..)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            role: self.role,
            local_id: self.local_id.to_string(),
            local_addr: self.transport.as_ref().map(|t| t.local_addr()),
            host_addr: self.host_addr,
            ping_ms: self.replicator.ping_ms(),
            stats: self
                .transport
                .as_ref()
                .map(|t| t.stats().clone())
                .unwrap_or_default(),
            peers: self.registry.len(),
            players: self.world.player_count(),
            mode: self.world.mode(),
            failures: self.link.failures,
            reconnects: self.link.reconnects,
            uptime: if self.role == Role::Disconnected {
                0.0
            } else {
                self.clock - self.started_at
            },
        }
    }

    fn split(&mut self) -> (&mut Replicator, Context<'_>) {
        let ctx = Context {
            hosting: self.role == Role::Hosting,
            local_id: self.local_id,
            now: self.clock,
            world: &mut self.world,
            registry: &mut self.registry,
            outbox: &mut self.outbox,
            events: &mut self.events,
        };
        (&mut self.replicator, ctx)
    }

    fn enter_session(&mut self) {
        self.replicator.reset();
        self.registry.clear();
        self.outbox.clear();
        self.world.clear_replicas();
        if self.world.local_player().is_none() {
            self.world.spawn_local(self.local_id, self.name);
        }
        self.world.set_mode(self.config.initial_mode);
        self.started_at = self.clock;
        self.link = LinkHealth {
            last_attempt: self.clock,
            ..LinkHealth::default()
        };
    }

    fn teardown(&mut self) {
        self.transport = None;
        self.role = Role::Disconnected;
        self.target = None;
        self.host_addr = None;
        self.registry.clear();
        self.outbox.clear();
        self.world.clear_replicas();
        self.replicator.reset();
    }

    fn poll_inbound(&mut self) {
        self.inbound.clear();

        let mut malformed = 0;
        let outcome = match self.transport.as_mut() {
            Some(transport) => {
                let before = transport.stats().malformed;
                let result = transport
                    .drain_inbound(&mut self.inbound)
                    .map_err(|e| e.to_string());
                malformed = transport.stats().malformed - before;
                result
            }
            None => Err("no socket".to_string()),
        };

        // Any datagram read counts as a live link, even one we could not decode.
        if !self.inbound.is_empty() || malformed > 0 {
            self.link.failures = 0;
            self.link.down_reported = false;
        }

        if let Err(reason) = outcome {
            self.link.failures += 1;
            debug!("receive failure #{}: {}", self.link.failures, reason);
        }
    }

    fn flush(&mut self) {
        let Some(transport) = self.transport.as_mut() else {
            self.outbox.clear();
            return;
        };

        for (message, addr) in self.outbox.resolve(&self.registry, self.host_addr) {
            if let Err(e) = transport.send_to(&message, addr) {
                warn!("dropped {}: {}", message.payload.kind(), e);
            }
        }
    }

    fn supervise(&mut self) {
        if self.link.failures < self.config.failure_threshold {
            return;
        }

        if !self.link.down_reported {
            self.link.down_reported = true;
            warn!("{} consecutive receive failures", self.link.failures);
            self.events.push_back(SessionEvent::LinkDown {
                failures: self.link.failures,
            });
        }

        if self.clock - self.link.last_attempt >= self.config.reconnect_delay {
            self.rebuild();
        }
    }

    /// Replaces the socket in the same role. The registry and replicas survive.
    fn rebuild(&mut self) {
        self.link.last_attempt = self.clock;
        self.transport = None;

        let result = match &self.target {
            Some(Target::Port(port)) => self.connector.bind(*port),
            Some(Target::Remote { host, port }) => self.connector.connect(host, *port),
            None => return,
        };

        match result {
            Ok(transport) => {
                if self.role == Role::Joined {
                    self.host_addr = transport.remote_addr();
                }
                self.transport = Some(transport);
                self.link.failures = 0;
                self.link.down_reported = false;
                self.link.reconnects += 1;
                self.replicator.reset();

                if self.role == Role::Joined {
                    let (replicator, mut ctx) = self.split();
                    replicator.announce_join(&mut ctx);
                    self.flush();
                }

                info!("rebuilt {} socket", self.role.as_str());
                self.events.push_back(SessionEvent::Reconnected {
                    attempt: self.link.reconnects,
                });
            }
            Err(e) => {
                error!("rebuild failed: {}", e);
                self.events.push_back(SessionEvent::ReconnectFailed {
                    message: e.to_string(),
                });
            }
        }
    }
}
