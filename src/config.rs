//! Layered configuration.
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! config file, `MQTTWATCH_*` environment variables, and command line flags.
//!
//! ```toml
//! [broker]
//! host = "localhost"
//! port = 1883
//! keep_alive_secs = 60
//! reconnect = false
//!
//! [output]
//! color = "auto"
//!
//! [log]
//! level = "warn"
//! ```
//!
//! Environment variables use `__` between sections, e.g.
//! `MQTTWATCH_BROKER__PORT=1884`.

use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Topics the monitor subscribes to on every connection.
pub const TOPICS: [&str; 3] = [
    "datacenter/fuzzy/control",
    "datacenter/fuzzy/temp",
    "datacenter/fuzzy/alert",
];

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "MQTTWATCH";

/// Floor for the pause between reconnect attempts.
pub const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(100);

/// Complete monitor configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub broker: BrokerConfig,
    pub output: OutputConfig,
    pub log: LogConfig,
}

/// Broker connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    /// Sent as a 16-bit field in CONNECT.
    pub keep_alive_secs: u16,
    /// Client identifier; a per-process id is generated when unset.
    pub client_id: Option<String>,
    /// Let the client library reconnect after an established session drops.
    pub reconnect: bool,
    pub reconnect_delay_ms: u64,
    /// Capacity of the event queue between transport and monitor.
    pub channel_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            keep_alive_secs: 60,
            client_id: None,
            reconnect: false,
            reconnect_delay_ms: 1000,
            channel_capacity: 64,
        }
    }
}

impl BrokerConfig {
    /// `host:port` for display.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(u64::from(self.keep_alive_secs))
    }

    /// Pause between reconnect attempts, never below [`MIN_RECONNECT_DELAY`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms).max(MIN_RECONNECT_DELAY)
    }

    /// The configured client id, or `mqttwatch-<pid>`.
    pub fn client_id(&self) -> String {
        self.client_id
            .clone()
            .unwrap_or_else(|| format!("mqttwatch-{}", std::process::id()))
    }
}

/// When to emit ANSI colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Colour only when stdout is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Resolve against the actual stdout.
    pub fn enabled(self) -> bool {
        match self {
            ColorMode::Auto => std::io::stdout().is_terminal(),
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// Console output settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub color: ColorMode,
}

/// Diagnostic logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive. `RUST_LOG` wins when set.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Values given on the command line. `None` leaves the loaded value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub keep_alive_secs: Option<u16>,
    pub client_id: Option<String>,
    pub reconnect: bool,
    pub color: Option<ColorMode>,
    pub log_level: Option<String>,
}

impl MonitorConfig {
    /// Load defaults, then `path` (if given), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Apply command line overrides on top of the loaded values.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.host {
            self.broker.host = host;
        }
        if let Some(port) = overrides.port {
            self.broker.port = port;
        }
        if let Some(secs) = overrides.keep_alive_secs {
            self.broker.keep_alive_secs = secs;
        }
        if overrides.client_id.is_some() {
            self.broker.client_id = overrides.client_id;
        }
        if overrides.reconnect {
            self.broker.reconnect = true;
        }
        if let Some(color) = overrides.color {
            self.output.color = color;
        }
        if let Some(level) = overrides.log_level {
            self.log.level = level;
        }
    }
}
