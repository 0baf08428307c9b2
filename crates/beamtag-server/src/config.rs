use serde::Deserialize;

/// Authority configuration, loaded from `beamtag.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub game: GameConfig,
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:7079".to_string(),
            game: GameConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Match clock defaults and team layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seconds a match runs when `start` is given without a duration.
    pub default_duration_secs: u32,
    /// Teams to rotate new players across.
    pub team_count: u8,
    /// How often the clock is checked against the configured duration.
    pub timer_interval_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: 120,
            team_count: 2,
            timer_interval_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_clients: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { max_clients: 32 }
    }
}

impl ServerConfig {
    /// Validate configuration values, exiting on fatal problems. The wire
    /// grammar caps teams at 7 and player ids at 32.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(addr = %self.listen_addr, "listen_addr is not a valid socket address");
            std::process::exit(1);
        }
        if self.game.default_duration_secs == 0 {
            tracing::error!("game.default_duration_secs must be greater than 0");
            std::process::exit(1);
        }
        if self.game.team_count == 0 || self.game.team_count > 7 {
            tracing::error!("game.team_count must be between 1 and 7");
            std::process::exit(1);
        }
        if self.game.timer_interval_ms == 0 {
            tracing::error!("game.timer_interval_ms must be greater than 0");
            std::process::exit(1);
        }
        if self.limits.max_clients == 0 || self.limits.max_clients > 32 {
            tracing::error!("limits.max_clients must be between 1 and 32");
            std::process::exit(1);
        }
    }

    /// Load configuration from `beamtag.toml` if present, then apply
    /// environment variable overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("beamtag.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from beamtag.toml");
                    config
                },
                Err(e) => {
                    tracing::warn!("Failed to parse beamtag.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No beamtag.toml found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("BEAMTAG_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(duration) = std::env::var("BEAMTAG_DEFAULT_DURATION")
            && let Ok(duration) = duration.parse::<u32>()
        {
            config.game.default_duration_secs = duration;
        }
        if let Ok(teams) = std::env::var("BEAMTAG_TEAM_COUNT")
            && let Ok(teams) = teams.parse::<u8>()
        {
            config.game.team_count = teams;
        }
        if let Ok(max) = std::env::var("BEAMTAG_MAX_CLIENTS")
            && let Ok(max) = max.parse::<usize>()
        {
            config.limits.max_clients = max;
        }

        config
    }
}
