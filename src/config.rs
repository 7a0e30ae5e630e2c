use serde::Deserialize;
use std::time::Duration;

/// Environment variable that overrides `device.password`.
pub const PASSWORD_ENV: &str = "MIKROTIK_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub device: DeviceConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub metrics_store: MetricsStoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub host: String,
    #[serde(default = "default_device_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Deadline for each word read from the device.
    #[serde(default = "default_timeout_secs")]
    pub read_timeout_secs: u64,
}

impl DeviceConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

fn default_device_port() -> u16 {
    8728
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// Interfaces to poll; empty polls every interface.
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// WAN-facing interfaces: tx is upload. Everything else is shown swapped.
    #[serde(default)]
    pub uplink_interfaces: Vec<String>,
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// Number of recent rates kept per interface for rolling avg/peak (1..=60).
    #[serde(default = "default_stats_window_size")]
    pub stats_window_size: usize,
    /// Drop per-interface rate state after this long without a sample. Unset keeps it forever.
    #[serde(default)]
    pub stale_after_secs: Option<u64>,
    /// How often to log app stats at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            interfaces: Vec::new(),
            uplink_interfaces: Vec::new(),
            sample_interval_ms: default_sample_interval_ms(),
            stats_window_size: default_stats_window_size(),
            stale_after_secs: None,
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

fn default_sample_interval_ms() -> u64 {
    1000
}

fn default_stats_window_size() -> usize {
    10
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsStoreConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_store_url")]
    pub url: String,
    /// Aggregation granularities, each exported with an `interval="<n>s"` label.
    #[serde(default = "default_intervals_secs")]
    pub intervals_secs: Vec<u64>,
    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries after the first failed push (0..=10).
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// Linear backoff unit: attempt `n` waits `n * retry_backoff_ms`.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Completed windows waiting for the exporter; overflow is dropped with a warning.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for MetricsStoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_store_url(),
            intervals_secs: default_intervals_secs(),
            timeout_secs: default_store_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl MetricsStoreConfig {
    /// Configured granularities, ascending and without duplicates.
    pub fn intervals(&self) -> Vec<Duration> {
        let mut secs = self.intervals_secs.clone();
        secs.sort_unstable();
        secs.dedup();
        secs.into_iter().map(Duration::from_secs).collect()
    }
}

fn default_store_url() -> String {
    "http://localhost:8428".into()
}

fn default_intervals_secs() -> Vec<u64> {
    vec![10, 300]
}

fn default_store_timeout_secs() -> u64 {
    5
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_queue_capacity() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Max number of live updates buffered per realtime client (slow clients may lag).
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_server_host(),
            port: default_server_port(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_server_host() -> String {
    "0.0.0.0".into()
}

fn default_server_port() -> u16 {
    8080
}

fn default_broadcast_capacity() -> usize {
    60
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        let mut config: AppConfig = toml::from_str(&s)?;
        if let Ok(password) = std::env::var(PASSWORD_ENV)
            && !password.is_empty()
        {
            config.device.password = password;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.device.host.is_empty(), "device.host must be non-empty");
        anyhow::ensure!(
            self.device.port > 0,
            "device.port must be between 1 and 65535, got {}",
            self.device.port
        );
        anyhow::ensure!(
            !self.device.username.is_empty(),
            "device.username must be non-empty"
        );
        anyhow::ensure!(
            !self.device.password.is_empty(),
            "device.password must be set (or provide {})",
            PASSWORD_ENV
        );
        anyhow::ensure!(
            self.device.connect_timeout_secs > 0,
            "device.connect_timeout_secs must be > 0, got {}",
            self.device.connect_timeout_secs
        );
        anyhow::ensure!(
            self.device.read_timeout_secs > 0,
            "device.read_timeout_secs must be > 0, got {}",
            self.device.read_timeout_secs
        );
        anyhow::ensure!(
            self.monitoring.sample_interval_ms > 0,
            "monitoring.sample_interval_ms must be > 0, got {}",
            self.monitoring.sample_interval_ms
        );
        anyhow::ensure!(
            (1..=60).contains(&self.monitoring.stats_window_size),
            "monitoring.stats_window_size must be between 1 and 60, got {}",
            self.monitoring.stats_window_size
        );
        anyhow::ensure!(
            self.monitoring.stale_after_secs != Some(0),
            "monitoring.stale_after_secs must be > 0 when set"
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        if self.metrics_store.enabled {
            anyhow::ensure!(
                !self.metrics_store.url.is_empty(),
                "metrics_store.url must be non-empty when metrics_store.enabled"
            );
            anyhow::ensure!(
                !self.metrics_store.intervals_secs.is_empty(),
                "metrics_store.intervals_secs must list at least one interval"
            );
            anyhow::ensure!(
                self.metrics_store.intervals_secs.iter().all(|&s| s >= 1),
                "metrics_store.intervals_secs must all be >= 1, got {:?}",
                self.metrics_store.intervals_secs
            );
            anyhow::ensure!(
                self.metrics_store.timeout_secs > 0,
                "metrics_store.timeout_secs must be > 0, got {}",
                self.metrics_store.timeout_secs
            );
            anyhow::ensure!(
                self.metrics_store.retry_count <= 10,
                "metrics_store.retry_count must be between 0 and 10, got {}",
                self.metrics_store.retry_count
            );
            anyhow::ensure!(
                self.metrics_store.queue_capacity > 0,
                "metrics_store.queue_capacity must be > 0, got {}",
                self.metrics_store.queue_capacity
            );
        }
        if self.server.enabled {
            anyhow::ensure!(
                self.server.port > 0,
                "server.port must be between 1 and 65535, got {}",
                self.server.port
            );
            anyhow::ensure!(
                self.server.broadcast_capacity > 0,
                "server.broadcast_capacity must be > 0, got {}",
                self.server.broadcast_capacity
            );
        }
        Ok(())
    }
}
