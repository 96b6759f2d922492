use serde::Deserialize;

use crate::extract;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub application: ApplicationConfig,
    pub ingest: IngestConfig,
    pub database: DatabaseConfig,
    pub flush: FlushConfig,
}

/// Identity written into every snapshot row.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationConfig {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Field of the incoming record that holds the raw log text.
    pub source_field: String,
    /// Extraction pattern; opaque apart from the capture-group contract.
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    extract::DEFAULT_COMBINED_PATTERN.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlushConfig {
    /// Seconds between snapshot flushes to the store.
    #[serde(default = "default_flush_interval_secs")]
    pub interval_secs: u64,
    /// How often to log app stats (records seen, rows written) at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

fn default_flush_interval_secs() -> u64 {
    60
}

fn default_stats_log_interval_secs() -> u64 {
    300
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.application.name.is_empty(),
            "application.name must be non-empty"
        );
        anyhow::ensure!(
            !self.ingest.source_field.is_empty(),
            "ingest.source_field must be non-empty"
        );
        // Compilability and group count are checked up front so a bad
        // pattern fails at startup, not on the first log line.
        extract::LogPattern::new(&self.ingest.format)?;
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.flush.interval_secs > 0,
            "flush.interval_secs must be > 0, got {}",
            self.flush.interval_secs
        );
        anyhow::ensure!(
            self.flush.stats_log_interval_secs > 0,
            "flush.stats_log_interval_secs must be > 0, got {}",
            self.flush.stats_log_interval_secs
        );
        Ok(())
    }
}
