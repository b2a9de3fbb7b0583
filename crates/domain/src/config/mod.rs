mod messenger;
mod observability;
mod server;
mod sessions;

pub use messenger::*;
pub use observability::*;
pub use server::*;
pub use sessions::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub messenger: MessengerConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }

        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }

        if self.server.max_concurrent_requests == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.max_concurrent_requests".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.messenger.graph_api_base.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "messenger.graph_api_base".into(),
                message: "graph_api_base must not be empty".into(),
            });
        }

        if self.messenger.send_timeout_ms == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "messenger.send_timeout_ms".into(),
                message: "send timeout must be greater than 0".into(),
            });
        }

        if self.sessions.idle_minutes == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sessions.idle_minutes".into(),
                message: "idle timeout must be greater than 0".into(),
            });
        }

        for (channel, minutes) in &self.sessions.idle_by_channel {
            if channel.parse::<crate::Channel>().is_err() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("sessions.idle_by_channel.{channel}"),
                    message: "unknown channel, override is never applied".into(),
                });
            }
            if *minutes == 0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("sessions.idle_by_channel.{channel}"),
                    message: "idle timeout must be greater than 0".into(),
                });
            }
        }

        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "observability.sample_rate".into(),
                message: "sample_rate must be between 0.0 and 1.0".into(),
            });
        }

        // CORS: warn if wildcard is used.
        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "wildcard \"*\" allows all origins (not recommended for production)".into(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_only_warnings() {
        let issues = Config::default().validate();
        assert!(issues.iter().all(|i| i.severity == ConfigSeverity::Warning));
    }

    #[test]
    fn zero_idle_override_is_an_error() {
        let mut cfg = Config::default();
        cfg.sessions.idle_by_channel.insert("instagram".into(), 0);
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.field == "sessions.idle_by_channel.instagram"
                && i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn unknown_idle_override_channel_warns() {
        let mut cfg = Config::default();
        cfg.sessions.idle_by_channel.insert("whatsapp".into(), 10);
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.field == "sessions.idle_by_channel.whatsapp"
                && i.severity == ConfigSeverity::Warning));
    }

    #[test]
    fn config_error_display() {
        let e = ConfigError {
            severity: ConfigSeverity::Warning,
            field: "server.cors".into(),
            message: "too open".into(),
        };
        assert_eq!(e.to_string(), "[WARN] server.cors: too open");
    }
}
