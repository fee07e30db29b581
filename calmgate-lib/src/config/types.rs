use serde::Deserialize;
use std::net::SocketAddr;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address and port to listen on
    /// Example: "0.0.0.0:7000" or "127.0.0.1:8080"
    pub listen: SocketAddr,
    /// Upstream server address (host:port format) that admitted requests
    /// are forwarded to
    pub backend: String,
    /// Rate-limiting gate configuration
    #[serde(default)]
    pub dos: DosConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    /// Default: "info"
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Show module path (target) in log messages
    /// Default: false
    #[serde(default)]
    pub show_target: bool,
}

/// Identity derivation policy: how a request is mapped to the string the
/// gate tracks request rates under.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdPolicy {
    /// Track by remote IP address only
    #[default]
    RemoteAddress,
    /// Track by remote address and port tuple
    RemoteAddressPort,
    /// Track by remote port only
    /// Useful when an untrusted intermediary hides the address and the port
    /// is a surrogate for the connection
    RemotePort,
    /// Track by opaque connection identifier (strongest per-flow isolation)
    ConnectionId,
}

/// How rejected requests are answered.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RejectMode {
    /// Respond immediately with the rejection status
    Immediate,
    /// Hold the exchange open for `delay_ms` before responding, to slow
    /// abusive callers and soften retry storms
    #[default]
    Delayed,
}

/// Rate-limiting gate configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DosConfig {
    /// Enable the gate
    /// Default: true
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Identity derivation policy
    /// Default: "remote_address"
    #[serde(default)]
    pub id: IdPolicy,
    /// Maximum smoothed requests per second allowed per identity
    /// Default: 100
    #[serde(default = "default_max_requests_per_second")]
    pub max_requests_per_second: u32,
    /// Maximum number of identities to track concurrently.
    /// Values <= 0 select the default.
    /// Default: 10000
    #[serde(default = "default_max_trackers")]
    pub max_trackers: i64,
    /// Rate estimator sample window in milliseconds, 1..=1000
    /// Default: 100
    #[serde(default = "default_sample_period_ms")]
    pub sample_period_ms: u64,
    /// EMA smoothing factor, in (0, 1]
    /// Default: 0.2
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Rejection mode
    /// Default: "delayed"
    #[serde(default)]
    pub reject: RejectMode,
    /// Delay in milliseconds before a delayed rejection is answered
    /// Default: 1000
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Maximum number of rejected exchanges held in the delay queue
    /// Default: 1000
    #[serde(default = "default_max_delay_queue")]
    pub max_delay_queue: usize,
    /// HTTP status written on rejection
    /// Default: 420 ("Enhance Your Calm")
    #[serde(default = "default_reject_status")]
    pub reject_status: u16,
}

impl Default for DosConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            id: IdPolicy::default(),
            max_requests_per_second: default_max_requests_per_second(),
            max_trackers: default_max_trackers(),
            sample_period_ms: default_sample_period_ms(),
            alpha: default_alpha(),
            reject: RejectMode::default(),
            delay_ms: default_delay_ms(),
            max_delay_queue: default_max_delay_queue(),
            reject_status: default_reject_status(),
        }
    }
}

impl DosConfig {
    /// The tracker cap with the <= 0 sentinel resolved.
    pub fn effective_max_trackers(&self) -> usize {
        if self.max_trackers <= 0 {
            default_max_trackers() as usize
        } else {
            self.max_trackers as usize
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_requests_per_second() -> u32 {
    100
}

fn default_max_trackers() -> i64 {
    10_000
}

fn default_sample_period_ms() -> u64 {
    100
}

fn default_alpha() -> f64 {
    0.2
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_max_delay_queue() -> usize {
    1000
}

fn default_reject_status() -> u16 {
    420
}
