use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file, created if missing.
    pub path: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Period of the due-check scan, in seconds.
    pub tick_seconds: u64,
    /// Upper bound on a single probe attempt, in seconds.
    pub probe_timeout_seconds: u64,
    /// Cap on probes in flight at once within a tick.
    pub max_concurrent_probes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let mut cfg = config::Config::builder();

        cfg = cfg
            .set_default("database.path", "data/url_monitor.db")?
            .set_default("database.max_connections", 10)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("scheduler.tick_seconds", 30)?
            .set_default("scheduler.probe_timeout_seconds", 10)?
            .set_default("scheduler.max_concurrent_probes", 8)?;

        if let Ok(path) = env::var("DATABASE_PATH") {
            cfg = cfg.set_override("database.path", path)?;
        }

        if let Ok(host) = env::var("HOST") {
            cfg = cfg.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            cfg = cfg.set_override("server.port", port.parse::<u16>().unwrap_or(8080))?;
        }

        if let Ok(tick) = env::var("SCHEDULER_TICK_SECONDS") {
            cfg = cfg.set_override("scheduler.tick_seconds", tick.parse::<u64>().unwrap_or(30))?;
        }

        if let Ok(timeout) = env::var("PROBE_TIMEOUT_SECONDS") {
            cfg = cfg.set_override(
                "scheduler.probe_timeout_seconds",
                timeout.parse::<u64>().unwrap_or(10),
            )?;
        }

        if let Ok(max) = env::var("MAX_CONCURRENT_PROBES") {
            cfg = cfg.set_override(
                "scheduler.max_concurrent_probes",
                max.parse::<u64>().unwrap_or(8),
            )?;
        }

        cfg.build()?.try_deserialize()
    }
}
