use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::vacancy::matching::MatchRules;
use crate::workflows::vacancy::sla::{SlaPolicy, SuspiciousDateRules};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub reconciliation: ReconciliationConfig,
    pub poller: PollerConfig,
    pub snapshot_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let defaults = ReconciliationConfig::default();
        let role_qualifiers = match env::var("STAFFING_ROLE_QUALIFIERS") {
            Ok(raw) if !raw.trim().is_empty() => raw
                .split(',')
                .map(|value| value.trim().to_lowercase())
                .filter(|value| !value.is_empty())
                .collect(),
            _ => defaults.role_qualifiers.clone(),
        };

        let reconciliation = ReconciliationConfig {
            chunk_size: number_var("STAFFING_CHUNK_SIZE", defaults.chunk_size)?,
            match_limit: number_var("STAFFING_MATCH_LIMIT", defaults.match_limit)?,
            critical_after_days: number_var("STAFFING_CRITICAL_DAYS", defaults.critical_after_days)?,
            workload_critical_days: number_var(
                "STAFFING_WORKLOAD_CRITICAL_DAYS",
                defaults.workload_critical_days,
            )?,
            opened_before_event_days: number_var(
                "STAFFING_SUSPICIOUS_OPENED_BEFORE_EVENT_DAYS",
                defaults.opened_before_event_days,
            )?,
            undated_open_days: number_var(
                "STAFFING_SUSPICIOUS_UNDATED_OPEN_DAYS",
                defaults.undated_open_days,
            )?,
            role_qualifiers,
        };

        let poller = PollerConfig {
            enabled: bool_var("STAFFING_POLL_ENABLED", true)?,
            interval_secs: number_var("STAFFING_POLL_INTERVAL_SECS", 30)?,
        };

        let snapshot_dir = env::var("STAFFING_SNAPSHOT_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            reconciliation,
            poller,
            snapshot_dir,
        })
    }
}

fn number_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { variable: name }),
        Err(_) => Ok(default),
    }
}

fn bool_var(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { variable: name }),
        },
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Tunables for the reconciliation core.
///
/// The suspicious-date thresholds are heuristics, so they live here rather
/// than as constants next to the SLA code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationConfig {
    /// Maximum ids sent per list-membership lookup.
    pub chunk_size: usize,
    pub match_limit: usize,
    pub critical_after_days: i64,
    pub workload_critical_days: i64,
    pub opened_before_event_days: i64,
    pub undated_open_days: i64,
    pub role_qualifiers: Vec<String>,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            match_limit: 50,
            critical_after_days: 30,
            workload_critical_days: 45,
            opened_before_event_days: 60,
            undated_open_days: 365,
            role_qualifiers: MatchRules::default().qualifiers,
        }
    }
}

impl ReconciliationConfig {
    pub fn sla_policy(&self) -> SlaPolicy {
        SlaPolicy {
            critical_after_days: self.critical_after_days,
            suspicious: SuspiciousDateRules {
                opened_before_event_days: self.opened_before_event_days,
                undated_open_days: self.undated_open_days,
            },
        }
    }

    pub fn match_rules(&self) -> MatchRules {
        MatchRules {
            qualifiers: self.role_qualifiers.clone(),
            limit: self.match_limit,
        }
    }
}

/// Background poller cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str },
    InvalidFlag { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable } => {
                write!(f, "{variable} must be a non-negative integer")
            }
            ConfigError::InvalidFlag { variable } => {
                write!(f, "{variable} must be true or false")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidFlag { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "STAFFING_CHUNK_SIZE",
            "STAFFING_MATCH_LIMIT",
            "STAFFING_CRITICAL_DAYS",
            "STAFFING_WORKLOAD_CRITICAL_DAYS",
            "STAFFING_SUSPICIOUS_OPENED_BEFORE_EVENT_DAYS",
            "STAFFING_SUSPICIOUS_UNDATED_OPEN_DAYS",
            "STAFFING_ROLE_QUALIFIERS",
            "STAFFING_POLL_ENABLED",
            "STAFFING_POLL_INTERVAL_SECS",
            "STAFFING_SNAPSHOT_DIR",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.reconciliation, ReconciliationConfig::default());
        assert_eq!(config.reconciliation.chunk_size, 100);
        assert_eq!(config.poller, PollerConfig::default());
        assert!(config.snapshot_dir.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn suspicious_thresholds_are_configurable() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("STAFFING_SUSPICIOUS_OPENED_BEFORE_EVENT_DAYS", "90");
        env::set_var("STAFFING_SUSPICIOUS_UNDATED_OPEN_DAYS", "180");
        env::set_var("STAFFING_ROLE_QUALIFIERS", "Lead, Interim ,");
        let config = AppConfig::load().expect("config loads");
        let policy = config.reconciliation.sla_policy();
        assert_eq!(policy.suspicious.opened_before_event_days, 90);
        assert_eq!(policy.suspicious.undated_open_days, 180);
        assert_eq!(
            config.reconciliation.role_qualifiers,
            vec!["lead".to_string(), "interim".to_string()]
        );
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_chunk_size() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("STAFFING_CHUNK_SIZE", "lots");
        let error = AppConfig::load().expect_err("invalid chunk size rejected");
        assert!(error.to_string().contains("STAFFING_CHUNK_SIZE"));
        reset_env();
    }

    #[test]
    fn poller_flag_parses_common_spellings() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("STAFFING_POLL_ENABLED", "off");
        env::set_var("STAFFING_POLL_INTERVAL_SECS", "5");
        let config = AppConfig::load().expect("config loads");
        assert!(!config.poller.enabled);
        assert_eq!(config.poller.interval(), Duration::from_secs(5));
        reset_env();
    }
}
