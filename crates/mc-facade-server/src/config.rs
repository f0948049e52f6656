use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Contents written to disk when no config file exists yet.
pub const DEFAULT_CONFIG_TEXT: &str = r#"[server]
address = "0.0.0.0"
port = 25565
motd = """
§aA Minecraft Server
§7Welcome!"""
version_text = "1.20.4"
kick_message = """
You cannot join this server.
Please contact an admin."""
# Path to a 64x64 PNG served as the server-list icon. Empty = no icon.
icon = ""
max_players = 10
online_players = 0

[logging]
level = "info"

[limits]
max_packet_bytes = 1048576
idle_timeout_secs = 5
shutdown_grace_secs = 10
"#;

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub server: ServerSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub limits: LimitsSection,
    /// Raw PNG bytes read from `server.icon` at load time. Not part of the
    /// config file itself.
    #[serde(skip)]
    pub icon_bytes: Option<Vec<u8>>,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub motd: String,
    pub version_text: String,
    pub kick_message: String,
    #[serde(default)]
    pub icon: String,
    pub max_players: u32,
    #[serde(default)]
    pub online_players: u32,
}

fn default_address() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    25565
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LimitsSection {
    /// Cap on a single outgoing packet (id + body). Also bounds the icon.
    #[serde(default = "default_max_packet_bytes")]
    pub max_packet_bytes: usize,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_max_packet_bytes() -> usize {
    1024 * 1024
}

fn default_idle_timeout_secs() -> u64 {
    5
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_packet_bytes: default_max_packet_bytes(),
            idle_timeout_secs: default_idle_timeout_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl LimitsSection {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;
        if !config.server.icon.is_empty() {
            let bytes = std::fs::read(&config.server.icon)?;
            if bytes.len() > config.limits.max_packet_bytes {
                return Err(format!(
                    "icon {} is {} bytes, larger than max_packet_bytes ({})",
                    config.server.icon,
                    bytes.len(),
                    config.limits.max_packet_bytes
                )
                .into());
            }
            config.icon_bytes = Some(bytes);
        }
        Ok(config)
    }

    /// Write the commented default config. The caller is expected to exit
    /// and let the operator edit it, matching first-run behavior.
    pub fn write_default<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
        std::fs::write(path, DEFAULT_CONFIG_TEXT)
    }
}
