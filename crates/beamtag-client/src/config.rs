use serde::Deserialize;

use beamtag_core::game::rules::GameRules;

/// Client configuration, loaded from `beamtag.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Authority address, host:port.
    pub server_addr: String,
    pub serial: SerialConfig,
    pub rules: GameRules,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:7079".to_string(),
            serial: SerialConfig::default(),
            rules: GameRules::default(),
        }
    }
}

/// Gun-link settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial device path; a non-device path replays a recorded session.
    pub device: String,
    pub baud: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud: 115_200,
        }
    }
}

impl ClientConfig {
    /// Validate configuration values, exiting on fatal problems.
    pub fn validate(&self) {
        if self.server_addr.is_empty() {
            tracing::error!("server_addr must not be empty");
            std::process::exit(1);
        }
        if self.serial.device.is_empty() {
            tracing::error!("serial.device must not be empty");
            std::process::exit(1);
        }
        if self.serial.baud == 0 {
            tracing::error!("serial.baud must be greater than 0");
            std::process::exit(1);
        }
        if self.rules.starting_health == 0 {
            tracing::error!("rules.starting_health must be greater than 0");
            std::process::exit(1);
        }
        if self.rules.max_ammo == 0 {
            tracing::warn!("rules.max_ammo is 0, the gun will never fire");
        }
    }

    /// Load configuration from `beamtag.toml` if present, then apply
    /// environment variable overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("beamtag.toml") {
            Ok(content) => match toml::from_str::<ClientConfig>(&content) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from beamtag.toml");
                    config
                },
                Err(e) => {
                    tracing::warn!("Failed to parse beamtag.toml: {e}, using defaults");
                    ClientConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No beamtag.toml found, using defaults");
                ClientConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("BEAMTAG_SERVER_ADDR")
            && !addr.is_empty()
        {
            config.server_addr = addr;
        }
        if let Ok(device) = std::env::var("BEAMTAG_SERIAL_DEVICE")
            && !device.is_empty()
        {
            config.serial.device = device;
        }
        if let Ok(baud) = std::env::var("BEAMTAG_SERIAL_BAUD")
            && let Ok(baud) = baud.parse::<u32>()
        {
            config.serial.baud = baud;
        }

        config
    }
}
