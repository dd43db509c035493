use std::env;
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,

    // Session defaults (spec §3, §4.1)
    pub session_default_timeout_ms: u64,
    pub session_pin_length: usize,

    // Expiry scheduler (spec §4.6)
    pub expiry_sweep_interval_secs: u64,
    pub expiry_grace_period_secs: u64,

    // Transport (spec §4.5)
    pub ws_max_frame_bytes: usize,
    pub ws_rate_limit_per_sec: u32,
    pub ws_rate_limit_burst: u32,
    pub ws_outbound_queue_depth: usize,
    pub ws_heartbeat_interval_secs: u64,

    // Tunnel collaborator (spec §6.3)
    pub tunnel_enabled: bool,
    pub public_base_url: String,

    // CORS
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: env("HOST", "0.0.0.0"),
            port: env("PORT", "8000").parse().expect("PORT must be a number"),

            session_default_timeout_ms: env("SESSION_DEFAULT_TIMEOUT_MS", "900000")
                .parse()
                .unwrap_or(900_000),
            session_pin_length: env("SESSION_PIN_LENGTH", "8").parse().unwrap_or(8),

            expiry_sweep_interval_secs: env("EXPIRY_SWEEP_INTERVAL_SECS", "60").parse().unwrap_or(60),
            expiry_grace_period_secs: env("EXPIRY_GRACE_PERIOD_SECS", "300").parse().unwrap_or(300),

            ws_max_frame_bytes: env("WS_MAX_FRAME_BYTES", "262144").parse().unwrap_or(262_144),
            ws_rate_limit_per_sec: env("WS_RATE_LIMIT_PER_SEC", "20").parse().unwrap_or(20),
            ws_rate_limit_burst: env("WS_RATE_LIMIT_BURST", "40").parse().unwrap_or(40),
            ws_outbound_queue_depth: env("WS_OUTBOUND_QUEUE_DEPTH", "64").parse().unwrap_or(64),
            ws_heartbeat_interval_secs: env("WS_HEARTBEAT_INTERVAL_SECS", "30").parse().unwrap_or(30),

            tunnel_enabled: env("TUNNEL_ENABLED", "false").parse().unwrap_or(false),
            public_base_url: env("PUBLIC_BASE_URL", "http://localhost:8000"),

            cors_origins: env("CORS_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port).parse().expect("Invalid address")
    }
}

fn env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[allow(dead_code)]
fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}
