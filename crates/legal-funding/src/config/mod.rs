use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
    pub lending: LendingConfig,
    pub seed_demo: bool,
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
        let seed_demo = env::var("APP_SEED_DEMO")
            .map(|value| parse_flag(&value))
            .unwrap_or(false);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            lending: LendingConfig::from_env()?,
            seed_demo,
        })
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub ansi: bool,
}

/// Business dials for intake validation and agreement rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct LendingConfig {
    pub minimum_amount: u64,
    pub minimum_purpose_chars: usize,
    /// Attempts made to find a free application number before giving up.
    pub number_attempts: u8,
    /// Displayed annual rate in basis points (750 = 7.5%).
    pub annual_rate_bps: u32,
    pub default_term: String,
    pub lender_name: String,
    pub lender_address: Vec<String>,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            minimum_amount: 1000,
            minimum_purpose_chars: 10,
            number_attempts: 3,
            annual_rate_bps: 750,
            default_term: "12 months".to_string(),
            lender_name: "Capital Legal Funding".to_string(),
            lender_address: vec![
                "123 Financial District".to_string(),
                "New York, NY 10005".to_string(),
            ],
        }
    }
}

impl LendingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let minimum_amount = parse_var("LENDING_MIN_AMOUNT", defaults.minimum_amount)?;
        let minimum_purpose_chars =
            parse_var("LENDING_MIN_PURPOSE_CHARS", defaults.minimum_purpose_chars)?;
        let number_attempts = parse_var("LENDING_NUMBER_ATTEMPTS", defaults.number_attempts)?;
        if number_attempts == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "LENDING_NUMBER_ATTEMPTS",
            });
        }
        let annual_rate_bps = parse_var("LENDING_RATE_BPS", defaults.annual_rate_bps)?;

        let default_term = env::var("LENDING_DEFAULT_TERM").unwrap_or(defaults.default_term);
        let lender_name = env::var("LENDING_LENDER_NAME").unwrap_or(defaults.lender_name);
        let lender_address = match env::var("LENDING_LENDER_ADDRESS") {
            Ok(raw) => raw
                .split('|')
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => defaults.lender_address,
        };

        Ok(Self {
            minimum_amount,
            minimum_purpose_chars,
            number_attempts,
            annual_rate_bps,
            default_term,
            lender_name,
            lender_address,
        })
    }

    /// Human readable rate, e.g. `7.5%`.
    pub fn rate_label(&self) -> String {
        let whole = self.annual_rate_bps / 100;
        let fraction = self.annual_rate_bps % 100;
        if fraction == 0 {
            format!("{whole}%")
        } else if fraction % 10 == 0 {
            format!("{whole}.{}%", fraction / 10)
        } else {
            format!("{whole}.{fraction:02}%")
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a positive whole number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
