use std::fmt;

use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize, rancor};

pub const DEFAULT_PORT: u16 = 7777;
pub const MAX_PEERS: usize = 16;
pub const PEER_ID_LEN: usize = 32;
pub const NAME_LEN: usize = 32;
pub const CHAT_TEXT_LEN: usize = 256;
pub const WEAPON_COUNT: usize = 5;
pub const FLAG_COUNT: usize = 2;

/// Every datagram on the wire is exactly this many bytes.
pub const MESSAGE_SIZE: usize = std::mem::size_of::<ArchivedNetworkMessage>();

fn pack<const N: usize>(text: &str) -> [u8; N] {
    let mut bytes = [0u8; N];
    let mut end = text.len().min(N - 1);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    bytes[..end].copy_from_slice(&text.as_bytes()[..end]);
    bytes
}

fn unpack(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    match std::str::from_utf8(&bytes[..end]) {
        Ok(text) => text,
        Err(e) => std::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Archive, Serialize, Deserialize)]
pub struct PeerId(pub [u8; PEER_ID_LEN]);

impl PeerId {
    pub const NONE: PeerId = PeerId([0; PEER_ID_LEN]);

    pub fn new(id: &str) -> Self {
        Self(pack(id))
    }

    pub fn as_str(&self) -> &str {
        unpack(&self.0)
    }

    pub fn is_none(&self) -> bool {
        self.0[0] == 0
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PeerId").field(&self.as_str()).finish()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Archive, Serialize, Deserialize)]
pub struct PlayerName(pub [u8; NAME_LEN]);

impl PlayerName {
    pub fn new(name: &str) -> Self {
        Self(pack(name))
    }

    pub fn as_str(&self) -> &str {
        unpack(&self.0)
    }
}

impl fmt::Debug for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PlayerName").field(&self.as_str()).finish()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct ChatText(pub [u8; CHAT_TEXT_LEN]);

impl ChatText {
    pub fn new(text: &str) -> Self {
        Self(pack(text))
    }

    pub fn as_str(&self) -> &str {
        unpack(&self.0)
    }
}

impl fmt::Debug for ChatText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChatText").field(&self.as_str()).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Archive, Serialize, Deserialize)]
pub enum WeaponKind {
    #[default]
    Pistol,
    Rifle,
    Shotgun,
    Smg,
    Sniper,
}

impl WeaponKind {
    pub const ALL: [WeaponKind; WEAPON_COUNT] = [
        WeaponKind::Pistol,
        WeaponKind::Rifle,
        WeaponKind::Shotgun,
        WeaponKind::Smg,
        WeaponKind::Sniper,
    ];

    pub fn index(self) -> usize {
        match self {
            WeaponKind::Pistol => 0,
            WeaponKind::Rifle => 1,
            WeaponKind::Shotgun => 2,
            WeaponKind::Smg => 3,
            WeaponKind::Sniper => 4,
        }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % WEAPON_COUNT]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + WEAPON_COUNT - 1) % WEAPON_COUNT]
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Archive,
    Serialize,
    Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum GameMode {
    #[default]
    Deathmatch,
    TeamDeathmatch,
    CaptureFlag,
}

impl GameMode {
    pub const ALL: [GameMode; 3] = [
        GameMode::Deathmatch,
        GameMode::TeamDeathmatch,
        GameMode::CaptureFlag,
    ];

    pub fn is_team_based(self) -> bool {
        matches!(self, GameMode::TeamDeathmatch | GameMode::CaptureFlag)
    }

    pub fn next(self) -> Self {
        match self {
            GameMode::Deathmatch => GameMode::TeamDeathmatch,
            GameMode::TeamDeathmatch => GameMode::CaptureFlag,
            GameMode::CaptureFlag => GameMode::Deathmatch,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GameMode::Deathmatch => "Deathmatch",
            GameMode::TeamDeathmatch => "Team Deathmatch",
            GameMode::CaptureFlag => "Capture the Flag",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Archive, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PeerId,
    pub name: PlayerName,
    pub position: [f32; 2],
    pub velocity: [f32; 2],
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
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Archive, Serialize, Deserialize)]
pub struct BulletState {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub rotation: f32,
    pub damage: f32,
    pub owner: PeerId,
    pub color: [u8; 4],
    pub lifetime: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Archive, Serialize, Deserialize)]
pub struct FlagState {
    pub position: [f32; 2],
    pub base_position: [f32; 2],
    pub captured: bool,
    pub team: u8,
    pub carrier: PeerId,
}

#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
pub struct ChatPayload {
    pub text: ChatText,
    pub sender_name: PlayerName,
}

#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
pub enum Payload {
    Join(PlayerState),
    Leave,
    Update(PlayerState),
    Shoot(BulletState),
    Ping { sent_at: f64 },
    Pong { sent_at: f64 },
    ModeChange(GameMode),
    TeamScores([i32; 2]),
    Flag { flag: FlagState, index: u8 },
    Chat(ChatPayload),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Join(_) => "join",
            Payload::Leave => "leave",
            Payload::Update(_) => "update",
            Payload::Shoot(_) => "shoot",
            Payload::Ping { .. } => "ping",
            Payload::Pong { .. } => "pong",
            Payload::ModeChange(_) => "mode",
            Payload::TeamScores(_) => "scores",
            Payload::Flag { .. } => "flag",
            Payload::Chat(_) => "chat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
pub struct NetworkMessage {
    pub sender: PeerId,
    pub payload: Payload,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
    #[error("datagram is {actual} bytes, expected {expected}")]
    Size { expected: usize, actual: usize },
}

impl NetworkMessage {
    pub fn new(sender: PeerId, payload: Payload) -> Self {
        Self { sender, payload }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let bytes = rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(CodecError::Serialize)?;

        if bytes.len() != MESSAGE_SIZE {
            return Err(CodecError::Size {
                expected: MESSAGE_SIZE,
                actual: bytes.len(),
            });
        }

        Ok(bytes)
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() != MESSAGE_SIZE {
            return Err(CodecError::Size {
                expected: MESSAGE_SIZE,
                actual: data.len(),
            });
        }

        // Receive buffers carry no alignment guarantee.
        let mut aligned = AlignedVec::<16>::with_capacity(MESSAGE_SIZE);
        aligned.extend_from_slice(data);

        rkyv::from_bytes::<Self, rancor::Error>(&aligned).map_err(CodecError::Deserialize)
    }
}
