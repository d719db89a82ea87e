use serde::{Deserialize, Serialize};

use crate::net::{DEFAULT_PORT, GameMode, MAX_PEERS};

/// Tunables for a session. All durations are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    pub port: u16,
    pub max_peers: usize,
    pub state_interval: f64,
    pub ping_interval: f64,
    pub mode_interval: f64,
    pub flag_interval: f64,
    pub snap_threshold: f32,
    pub blend: f32,
    pub failure_threshold: u32,
    pub reconnect_delay: f64,
    pub peer_idle_timeout: f64,
    pub eviction_interval: f64,
    pub initial_mode: GameMode,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_peers: MAX_PEERS,
            state_interval: 0.033,
            ping_interval: 1.0,
            mode_interval: 5.0,
            flag_interval: 0.5,
            snap_threshold: 100.0,
            blend: 0.15,
            failure_threshold: 20,
            reconnect_delay: 5.0,
            peer_idle_timeout: 10.0,
            eviction_interval: 1.0,
            initial_mode: GameMode::Deathmatch,
        }
    }
}
