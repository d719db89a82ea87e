pub mod config;
pub mod error;
pub mod event;
pub mod intent;
pub mod net;
pub mod replication;
pub mod session;
pub mod world;

pub use config::NetConfig;
pub use error::SessionError;
pub use event::{LeaveReason, SessionEvent};
pub use intent::{Actions, Intent};
pub use net::{
    BulletState, ChatPayload, CodecError, Connector, DEFAULT_PORT, FlagState, GameMode, Inbound,
    MAX_PEERS, MESSAGE_SIZE, NetworkMessage, NetworkStats, Payload, PeerId, PeerRegistry,
    PlayerName, PlayerState, Transport, TransportError, UdpConnector, UdpTransport, WeaponKind,
};
pub use replication::{Destination, Outbox, Replicator, reconcile_position};
pub use session::{Diagnostics, Role, Session};
pub use world::{Bullet, Flag, Handle, Player, SlotArena, World, WorldEvent};
