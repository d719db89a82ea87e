use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use skirmish::{GameMode, NetConfig};

#[derive(Debug, Clone)]
pub struct PeerConfig {
    pub name: String,
    pub fps: u32,
    pub bot: bool,
    pub net: NetConfig,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            name: "player".to_string(),
            fps: 60,
            bot: false,
            net: NetConfig::default(),
        }
    }
}

impl PeerConfig {
    pub fn frame_time(&self) -> f64 {
        1.0 / f64::from(self.fps.max(1))
    }
}

/// Reads a JSON tuning file. Missing keys fall back to their defaults.
pub fn load_net_config(path: &Path) -> Result<NetConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: NetConfig = serde_json::from_str(&text)
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// The command-line port wins over the one in the config file.
pub fn session_port(arg: Option<u16>, net: &NetConfig) -> u16 {
    arg.unwrap_or(net.port)
}

pub fn parse_mode(value: &str) -> Result<GameMode, String> {
    match value.to_ascii_lowercase().as_str() {
        "dm" | "deathmatch" => Ok(GameMode::Deathmatch),
        "tdm" | "team" | "teamdeathmatch" => Ok(GameMode::TeamDeathmatch),
        "ctf" | "flag" | "captureflag" => Ok(GameMode::CaptureFlag),
        other => Err(format!("unknown mode '{}' (dm, tdm, ctf)", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: NetConfig = serde_json::from_str(r#"{ "ping_interval": 2.5 }"#).unwrap();
        assert_eq!(config.ping_interval, 2.5);
        assert_eq!(config.port, NetConfig::default().port);
        assert_eq!(config.failure_threshold, 20);
    }

    #[test]
    fn port_comes_from_the_config_file_unless_given() {
        let net: NetConfig = serde_json::from_str(r#"{ "port": 9000 }"#).unwrap();
        assert_eq!(session_port(None, &net), 9000);
        assert_eq!(session_port(Some(7000), &net), 7000);
        assert_eq!(session_port(None, &NetConfig::default()), skirmish::DEFAULT_PORT);
    }

    #[test]
    fn mode_names() {
        assert_eq!(parse_mode("CTF"), Ok(GameMode::CaptureFlag));
        assert_eq!(parse_mode("tdm"), Ok(GameMode::TeamDeathmatch));
        assert!(parse_mode("race").is_err());
    }

    #[test]
    fn frame_time_guards_zero_fps() {
        let config = PeerConfig {
            fps: 0,
            ..Default::default()
        };
        assert_eq!(config.frame_time(), 1.0);
    }
}
