use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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

    /// Internal error details are only returned to clients outside production.
    pub fn exposes_internal_errors(self) -> bool {
        !matches!(self, Self::Production)
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub documents: DocumentConfig,
    pub mail: MailConfig,
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

        let output_dir = env::var("DOCUMENTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("public/documents"));
        let public_url = env::var("DOCUMENTS_PUBLIC_URL")
            .unwrap_or_else(|_| "/documents".to_string())
            .trim_end_matches('/')
            .to_string();
        if public_url.is_empty() {
            return Err(ConfigError::InvalidPublicUrl);
        }
        let font_dir = env::var("DOCUMENTS_FONT_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let font_family =
            env::var("DOCUMENTS_FONT_FAMILY").unwrap_or_else(|_| "LiberationSans".to_string());

        let sender =
            env::var("MAIL_SENDER").unwrap_or_else(|_| "noreply@union.local".to_string());
        if !sender.contains('@') {
            return Err(ConfigError::InvalidMailSender(sender));
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                include_targets: false,
                ansi: environment == AppEnvironment::Development,
            },
            documents: DocumentConfig {
                output_dir,
                public_url,
                font_dir,
                font_family,
            },
            mail: MailConfig { sender },
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
    pub include_targets: bool,
    pub ansi: bool,
}

/// Where generated document packages are written and how they are addressed.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    pub output_dir: PathBuf,
    pub public_url: String,
    /// Directory holding `<family>-Regular.ttf` and friends. Without it packages render as HTML.
    pub font_dir: Option<PathBuf>,
    pub font_family: String,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub sender: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPublicUrl,
    InvalidMailSender(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPublicUrl => {
                write!(f, "DOCUMENTS_PUBLIC_URL must not be empty")
            }
            ConfigError::InvalidMailSender(value) => {
                write!(f, "MAIL_SENDER '{value}' is not an e-mail address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidPublicUrl
            | ConfigError::InvalidMailSender(_) => None,
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
            "DOCUMENTS_DIR",
            "DOCUMENTS_PUBLIC_URL",
            "DOCUMENTS_FONT_DIR",
            "DOCUMENTS_FONT_FAMILY",
            "MAIL_SENDER",
        ] {
            env::remove_var(key);
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
        assert_eq!(config.documents.output_dir, PathBuf::from("public/documents"));
        assert_eq!(config.documents.public_url, "/documents");
        assert!(config.documents.font_dir.is_none());
        assert_eq!(config.mail.sender, "noreply@union.local");
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
    fn trims_trailing_slash_from_public_url() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("DOCUMENTS_PUBLIC_URL", "https://union.example/files/");
        env::set_var("DOCUMENTS_FONT_DIR", "/usr/share/fonts/liberation");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.documents.public_url, "https://union.example/files");
        assert_eq!(
            config.documents.font_dir,
            Some(PathBuf::from("/usr/share/fonts/liberation"))
        );
        reset_env();
    }

    #[test]
    fn rejects_malformed_sender() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MAIL_SENDER", "union office");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidMailSender(_))
        ));
        reset_env();
    }

    #[test]
    fn production_hides_internal_errors() {
        assert!(!AppEnvironment::from_str("prod").exposes_internal_errors());
        assert!(AppEnvironment::from_str("ci").exposes_internal_errors());
        assert!(AppEnvironment::from_str("anything").exposes_internal_errors());
    }
}
