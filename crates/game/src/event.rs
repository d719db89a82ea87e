use std::net::SocketAddr;

use crate::net::{GameMode, PeerId};
use crate::world::{TEAM_NAMES, WorldEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Hosting {
        addr: SocketAddr,
    },
    Joined {
        host: SocketAddr,
    },
    Left,
    PeerJoined {
        id: PeerId,
        name: String,
    },
    PeerLeft {
        id: PeerId,
        reason: LeaveReason,
    },
    ModeChanged {
        mode: GameMode,
    },
    Chat {
        sender: String,
        text: String,
    },
    World(WorldEvent),
    LinkDown {
        failures: u32,
    },
    Reconnected {
        attempt: u32,
    },
    ReconnectFailed {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    Graceful,
    Timeout,
}

impl LeaveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveReason::Graceful => "left",
            LeaveReason::Timeout => "timed out",
        }
    }
}

impl SessionEvent {
    /// One-line text for a status bar or log.
    pub fn status_line(&self) -> String {
        match self {
            SessionEvent::Hosting { addr } => format!("Hosting on {}", addr),
            SessionEvent::Joined { host } => format!("Joined {}", host),
            SessionEvent::Left => "Left the session".to_string(),
            SessionEvent::PeerJoined { id, name } => format!("{} ({}) joined", name, id),
            SessionEvent::PeerLeft { id, reason } => format!("{} {}", id, reason.as_str()),
            SessionEvent::ModeChanged { mode } => format!("Mode: {}", mode.name()),
            SessionEvent::Chat { sender, text } => format!("{}: {}", sender, text),
            SessionEvent::World(WorldEvent::Killed { victim, killer }) => {
                format!("{} eliminated {}", killer, victim)
            }
            SessionEvent::World(WorldEvent::FlagTaken { flag, carrier }) => {
                format!("{} took the {} flag", carrier, TEAM_NAMES[flag % 2])
            }
            SessionEvent::World(WorldEvent::FlagReturned { flag }) => {
                format!("{} flag returned", TEAM_NAMES[flag % 2])
            }
            SessionEvent::World(WorldEvent::FlagCaptured { team }) => {
                format!("{} team captured a flag", TEAM_NAMES[usize::from(*team) % 2])
            }
            SessionEvent::World(WorldEvent::RoundOver { summary }) => {
                format!("Round over: {}", summary)
            }
            SessionEvent::LinkDown { failures } => {
                format!("Connection lost ({} receive failures)", failures)
            }
            SessionEvent::Reconnected { attempt } => format!("Reconnected (#{})", attempt),
            SessionEvent::ReconnectFailed { message } => format!("Reconnect failed: {}", message),
        }
    }
}
