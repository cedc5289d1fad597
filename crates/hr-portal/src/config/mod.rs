use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

const DEVELOPMENT_SECRET: &str = "hr-portal-development-secret";

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
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub bootstrap_admin: Option<BootstrapAdmin>,
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

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://hr_management.db".to_string()),
            max_connections: parse_number("DATABASE_MAX_CONNECTIONS", 5)?,
        };

        let secret_key = match non_empty_var("SECRET_KEY") {
            Some(secret) => secret,
            None if environment == AppEnvironment::Production => {
                return Err(ConfigError::Missing("SECRET_KEY"))
            }
            None => DEVELOPMENT_SECRET.to_string(),
        };
        let session = SessionConfig {
            secret_key,
            ttl_minutes: parse_number("SESSION_TTL_MINUTES", 720)?,
            secure_cookie: environment == AppEnvironment::Production,
        };

        let storage = StorageConfig {
            backend: StorageBackend::from_env()?,
            max_resume_bytes: parse_number("MAX_RESUME_BYTES", 10 * 1024 * 1024)?,
        };

        let bootstrap_admin = match (non_empty_var("ADMIN_EMAIL"), non_empty_var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            database,
            session,
            storage,
            bootstrap_admin,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidNumber(key)),
        None => Ok(default),
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
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Signing material and lifetime for admin sessions.
#[derive(Clone)]
pub struct SessionConfig {
    pub secret_key: String,
    pub ttl_minutes: i64,
    pub secure_cookie: bool,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("ttl_minutes", &self.ttl_minutes)
            .field("secure_cookie", &self.secure_cookie)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub max_resume_bytes: usize,
}

/// Where uploaded resumes are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Local {
        directory: PathBuf,
    },
    ObjectStore {
        bucket: String,
        region: String,
        endpoint: Option<String>,
    },
}

impl StorageBackend {
    fn from_env() -> Result<Self, ConfigError> {
        let kind = env::var("RESUME_STORE").unwrap_or_else(|_| "local".to_string());
        match kind.trim().to_ascii_lowercase().as_str() {
            "local" | "" => Ok(Self::Local {
                directory: PathBuf::from(
                    non_empty_var("RESUME_DIR").unwrap_or_else(|| "uploads/resumes".to_string()),
                ),
            }),
            "s3" | "object" => Ok(Self::ObjectStore {
                bucket: non_empty_var("S3_BUCKET").ok_or(ConfigError::Missing("S3_BUCKET"))?,
                region: non_empty_var("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                endpoint: non_empty_var("S3_ENDPOINT"),
            }),
            other => Err(ConfigError::UnknownStorageBackend(other.to_string())),
        }
    }
}

/// Credentials seeded into the admin table at startup when no row exists yet.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber(&'static str),
    Missing(&'static str),
    UnknownStorageBackend(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber(key) => write!(f, "{key} must be a valid number"),
            ConfigError::Missing(key) => write!(f, "{key} must be set"),
            ConfigError::UnknownStorageBackend(kind) => {
                write!(f, "RESUME_STORE '{kind}' is not one of: local, s3")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
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
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "DATABASE_URL",
            "DATABASE_MAX_CONNECTIONS",
            "SECRET_KEY",
            "SESSION_TTL_MINUTES",
            "RESUME_STORE",
            "RESUME_DIR",
            "S3_BUCKET",
            "S3_REGION",
            "S3_ENDPOINT",
            "MAX_RESUME_BYTES",
            "ADMIN_EMAIL",
            "ADMIN_PASSWORD",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().unwrap_or_else(|e| e.into_inner());
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.database.url, "sqlite://hr_management.db");
        assert_eq!(config.session.ttl_minutes, 720);
        assert_eq!(
            config.storage.backend,
            StorageBackend::Local {
                directory: PathBuf::from("uploads/resumes")
            }
        );
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().unwrap_or_else(|e| e.into_inner());
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn production_requires_secret_key() {
        let _lock = env_guard().lock().unwrap_or_else(|e| e.into_inner());
        reset_env();
        env::set_var("APP_ENV", "production");
        match AppConfig::load() {
            Err(ConfigError::Missing("SECRET_KEY")) => {}
            other => panic!("expected missing secret, got {other:?}"),
        }

        env::set_var("SECRET_KEY", "prod-secret");
        let config = AppConfig::load().expect("config loads with secret");
        assert!(config.session.secure_cookie);
        reset_env();
    }

    #[test]
    fn object_store_requires_bucket() {
        let _lock = env_guard().lock().unwrap_or_else(|e| e.into_inner());
        reset_env();
        env::set_var("RESUME_STORE", "s3");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::Missing("S3_BUCKET"))
        ));

        env::set_var("S3_BUCKET", "resumes");
        env::set_var("S3_ENDPOINT", "http://localhost:9000");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.storage.backend,
            StorageBackend::ObjectStore {
                bucket: "resumes".to_string(),
                region: "us-east-1".to_string(),
                endpoint: Some("http://localhost:9000".to_string()),
            }
        );
        reset_env();
    }

    #[test]
    fn bootstrap_admin_requires_both_credentials() {
        let _lock = env_guard().lock().unwrap_or_else(|e| e.into_inner());
        reset_env();
        env::set_var("ADMIN_EMAIL", "hr@company.com");
        assert!(AppConfig::load().expect("loads").bootstrap_admin.is_none());

        env::set_var("ADMIN_PASSWORD", "changeme");
        let admin = AppConfig::load()
            .expect("loads")
            .bootstrap_admin
            .expect("admin configured");
        assert_eq!(admin.email, "hr@company.com");
        reset_env();
    }

    #[test]
    fn rejects_unparsable_numbers() {
        let _lock = env_guard().lock().unwrap_or_else(|e| e.into_inner());
        reset_env();
        env::set_var("MAX_RESUME_BYTES", "lots");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber("MAX_RESUME_BYTES"))
        ));
        reset_env();
    }
}
