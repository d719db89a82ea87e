mod protocol;
mod registry;
mod stats;
mod transport;

pub use protocol::{
    ArchivedNetworkMessage, BulletState, CHAT_TEXT_LEN, ChatPayload, ChatText, CodecError,
    DEFAULT_PORT, FLAG_COUNT, FlagState, GameMode, MAX_PEERS, MESSAGE_SIZE, NAME_LEN,
    NetworkMessage, PEER_ID_LEN, Payload, PeerId, PlayerName, PlayerState, WEAPON_COUNT,
    WeaponKind,
};
pub use registry::{PeerRegistry, RegisteredPeer};
pub use stats::{NetworkStats, generate_peer_id, rand_u64};
pub use transport::{
    Connector, Inbound, Transport, TransportError, UdpConnector, UdpTransport, resolve,
};
