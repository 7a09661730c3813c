// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults and the [`AppConfig`] loaded from the
//! environment at startup. Blank values are treated as unset.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `APP_ENV` / `NODE_ENV` | `development`, `production` or `test` | `development` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `DATA_DIR` | Directory holding the embedded database | `./data` |
//! | `JWT_SECRET` | HS256 signing secret | Required in production |
//! | `JWT_EXPIRES_IN` | Token lifetime (`3600`, `15m`, `1h`, `7d`) | `1h` |
//! | `STELLAR_NETWORK` | `testnet` or `public` | `testnet` |
//! | `STELLAR_HORIZON_URL` | Horizon base URL | Network default |
//! | `STELLAR_ISSUER_PUBLIC_KEY` | Platform issuing account | Optional |
//! | `STELLAR_ISSUER_SECRET_KEY` | Platform signing seed | Optional |
//! | `ALLOWED_ORIGINS` | Comma-separated CORS origins | `http://localhost:5173` |
//! | `SENTRY_DSN` | Sentry project DSN | Optional |
//! | `ENABLE_SENTRY` | Turn error tracking on | `false` |
//! | `EMAIL_SERVICE` | `smtp` or `sendgrid` | `smtp` |
//! | `EMAIL_HOST` / `EMAIL_PORT` | SMTP relay | Log transport / `587` |
//! | `EMAIL_USERNAME` / `EMAIL_PASSWORD` | SMTP credentials | Optional |
//! | `EMAIL_FROM` | Sender address | `noreply@stellarcert.com` |
//! | `SENDGRID_API_KEY` | SendGrid API key | Optional |
//! | `APP_URL` | Public web URL used in email links | `https://stellarcert.com` |
//! | `REDIS_URL` | Ignored; the email queue lives in the embedded database | - |
//! | `ADMIN_EMAIL` / `ADMIN_PASSWORD` | Seed an admin account at startup | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=info` |

use std::{env, path::PathBuf, time::Duration};

use tracing::{info, warn};

use crate::stellar::{keys, StellarNetwork};

pub const APP_ENV_ENV: &str = "APP_ENV";
pub const NODE_ENV_ENV: &str = "NODE_ENV";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Directory holding `stellarwave.redb`. Created on first start.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_EXPIRES_IN_ENV: &str = "JWT_EXPIRES_IN";
pub const STELLAR_NETWORK_ENV: &str = "STELLAR_NETWORK";
pub const STELLAR_HORIZON_URL_ENV: &str = "STELLAR_HORIZON_URL";
pub const STELLAR_ISSUER_PUBLIC_KEY_ENV: &str = "STELLAR_ISSUER_PUBLIC_KEY";
pub const STELLAR_ISSUER_SECRET_KEY_ENV: &str = "STELLAR_ISSUER_SECRET_KEY";
pub const ALLOWED_ORIGINS_ENV: &str = "ALLOWED_ORIGINS";
pub const SENTRY_DSN_ENV: &str = "SENTRY_DSN";
pub const ENABLE_SENTRY_ENV: &str = "ENABLE_SENTRY";
pub const EMAIL_SERVICE_ENV: &str = "EMAIL_SERVICE";
pub const EMAIL_HOST_ENV: &str = "EMAIL_HOST";
pub const EMAIL_PORT_ENV: &str = "EMAIL_PORT";
pub const EMAIL_USERNAME_ENV: &str = "EMAIL_USERNAME";
pub const EMAIL_PASSWORD_ENV: &str = "EMAIL_PASSWORD";
pub const EMAIL_FROM_ENV: &str = "EMAIL_FROM";
pub const SENDGRID_API_KEY_ENV: &str = "SENDGRID_API_KEY";
pub const APP_URL_ENV: &str = "APP_URL";
pub const REDIS_URL_ENV: &str = "REDIS_URL";
pub const ADMIN_EMAIL_ENV: &str = "ADMIN_EMAIL";
pub const ADMIN_PASSWORD_ENV: &str = "ADMIN_PASSWORD";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_JWT_EXPIRES_IN: &str = "1h";
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173";
pub const DEFAULT_EMAIL_PORT: u16 = 587;
pub const DEFAULT_EMAIL_FROM: &str = "noreply@stellarcert.com";
pub const DEFAULT_APP_URL: &str = "https://stellarcert.com";
pub const DEFAULT_LOG_LEVEL: &str = "info,tower_http=info";

/// Database file name inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "stellarwave.redb";

/// Global per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Only used outside production when `JWT_SECRET` is unset.
const DEVELOPMENT_JWT_SECRET: &str = "stellarwave-development-secret-change-me";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

/// Which relay the email service talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailProvider {
    /// smtp.sendgrid.net with the API key as password.
    SendGrid { api_key: String },
    Smtp {
        host: String,
        port: u16,
        username: Option<String>,
        password: Option<String>,
    },
    /// No relay configured; messages are logged.
    Log,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub provider: EmailProvider,
    pub from: String,
    pub app_url: String,
}

#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    pub stellar_network: StellarNetwork,
    pub horizon_url: String,
    pub issuer_public_key: Option<String>,
    pub issuer_secret_key: Option<String>,
    pub allowed_origins: Vec<String>,
    pub sentry: SentryConfig,
    pub email: EmailConfig,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = env_optional(APP_ENV_ENV)
            .or_else(|| env_optional(NODE_ENV_ENV))
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Development);

        let host = env_or_default(HOST_ENV, DEFAULT_HOST);
        let port = match env_optional(PORT_ENV) {
            Some(raw) => parse_port(PORT_ENV, &raw)?,
            None => DEFAULT_PORT,
        };
        let data_dir = PathBuf::from(env_or_default(DATA_DIR_ENV, DEFAULT_DATA_DIR));

        let jwt_secret = match env_optional(JWT_SECRET_ENV) {
            Some(secret) => secret,
            None if environment.is_production() => {
                return Err(ConfigError::Missing(JWT_SECRET_ENV))
            }
            None => {
                warn!("JWT_SECRET not set; using the development secret");
                DEVELOPMENT_JWT_SECRET.to_string()
            }
        };
        let jwt_expires_in = parse_duration(&env_or_default(
            JWT_EXPIRES_IN_ENV,
            DEFAULT_JWT_EXPIRES_IN,
        ))
        .ok_or_else(|| ConfigError::Invalid {
            name: JWT_EXPIRES_IN_ENV,
            reason: "expected seconds or a number suffixed with s, m, h or d".to_string(),
        })?;

        let stellar_network = match env_optional(STELLAR_NETWORK_ENV) {
            Some(raw) => StellarNetwork::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                name: STELLAR_NETWORK_ENV,
                reason: format!("unknown network '{raw}'"),
            })?,
            None => StellarNetwork::Testnet,
        };
        let horizon_url = env_optional(STELLAR_HORIZON_URL_ENV)
            .unwrap_or_else(|| stellar_network.default_horizon_url().to_string());
        url::Url::parse(&horizon_url).map_err(|e| ConfigError::Invalid {
            name: STELLAR_HORIZON_URL_ENV,
            reason: e.to_string(),
        })?;

        let issuer_public_key = env_optional(STELLAR_ISSUER_PUBLIC_KEY_ENV);
        let issuer_secret_key = env_optional(STELLAR_ISSUER_SECRET_KEY_ENV);
        check_issuer_keys(issuer_public_key.as_deref(), issuer_secret_key.as_deref())?;

        let allowed_origins = parse_origins(&env_or_default(
            ALLOWED_ORIGINS_ENV,
            DEFAULT_ALLOWED_ORIGINS,
        ));

        let sentry = SentryConfig {
            dsn: env_optional(SENTRY_DSN_ENV),
            enabled: env_optional(ENABLE_SENTRY_ENV)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        };
        if sentry.enabled && sentry.dsn.is_none() {
            warn!("ENABLE_SENTRY is true but SENTRY_DSN is not set; error tracking disabled");
        }

        let email = EmailConfig {
            provider: email_provider_from_env()?,
            from: env_or_default(EMAIL_FROM_ENV, DEFAULT_EMAIL_FROM),
            app_url: env_or_default(APP_URL_ENV, DEFAULT_APP_URL),
        };

        if env_optional(REDIS_URL_ENV).is_some() {
            info!("REDIS_URL is set but unused; email jobs are persisted in the embedded database");
        }

        Ok(Self {
            environment,
            host,
            port,
            data_dir,
            jwt_secret,
            jwt_expires_in,
            stellar_network,
            horizon_url,
            issuer_public_key,
            issuer_secret_key,
            allowed_origins,
            sentry,
            email,
            admin_email: env_optional(ADMIN_EMAIL_ENV),
            admin_password: env_optional(ADMIN_PASSWORD_ENV),
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configuration used by unit tests: log transport, testnet, fixed secret.
    pub fn for_tests() -> Self {
        Self {
            environment: Environment::Test,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            jwt_secret: "test-secret".to_string(),
            jwt_expires_in: Duration::from_secs(3600),
            stellar_network: StellarNetwork::Testnet,
            horizon_url: StellarNetwork::Testnet.default_horizon_url().to_string(),
            issuer_public_key: None,
            issuer_secret_key: None,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGINS.to_string()],
            sentry: SentryConfig {
                dsn: None,
                enabled: false,
            },
            email: EmailConfig {
                provider: EmailProvider::Log,
                from: DEFAULT_EMAIL_FROM.to_string(),
                app_url: DEFAULT_APP_URL.to_string(),
            },
            admin_email: None,
            admin_password: None,
        }
    }
}

fn email_provider_from_env() -> Result<EmailProvider, ConfigError> {
    let service = env_or_default(EMAIL_SERVICE_ENV, "smtp").to_lowercase();
    let sendgrid_key = env_optional(SENDGRID_API_KEY_ENV);

    if service == "sendgrid" || sendgrid_key.is_some() {
        let api_key = sendgrid_key.ok_or(ConfigError::Missing(SENDGRID_API_KEY_ENV))?;
        return Ok(EmailProvider::SendGrid { api_key });
    }

    match env_optional(EMAIL_HOST_ENV) {
        Some(host) => {
            let port = match env_optional(EMAIL_PORT_ENV) {
                Some(raw) => parse_port(EMAIL_PORT_ENV, &raw)?,
                None => DEFAULT_EMAIL_PORT,
            };
            Ok(EmailProvider::Smtp {
                host,
                port,
                username: env_optional(EMAIL_USERNAME_ENV),
                password: env_optional(EMAIL_PASSWORD_ENV),
            })
        }
        None => Ok(EmailProvider::Log),
    }
}

fn check_issuer_keys(public: Option<&str>, secret: Option<&str>) -> Result<(), ConfigError> {
    if let Some(public) = public {
        if !keys::is_valid_public_key(public) {
            return Err(ConfigError::Invalid {
                name: STELLAR_ISSUER_PUBLIC_KEY_ENV,
                reason: "not a valid Stellar account id".to_string(),
            });
        }
    }
    if let Some(secret) = secret {
        let derived = keys::public_key_from_secret(secret).ok_or_else(|| ConfigError::Invalid {
            name: STELLAR_ISSUER_SECRET_KEY_ENV,
            reason: "not a valid Stellar secret seed".to_string(),
        })?;
        if let Some(public) = public {
            if derived != public {
                return Err(ConfigError::Invalid {
                    name: STELLAR_ISSUER_SECRET_KEY_ENV,
                    reason: "does not match STELLAR_ISSUER_PUBLIC_KEY".to_string(),
                });
            }
        }
    }
    Ok(())
}

fn parse_port(name: &'static str, raw: &str) -> Result<u16, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        name,
        reason: format!("'{raw}' is not a valid port"),
    })
}

/// Parse `3600`, `30s`, `15m`, `1h` or `7d`.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let unit_start = raw.len() - raw.chars().last()?.len_utf8();
    let (number, unit) = raw.split_at(unit_start);
    let value: u64 = number.parse().ok()?;
    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return None,
    };
    value.checked_mul(multiplier).map(Duration::from_secs)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

fn env_optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_suffixes() {
        assert_eq!(parse_duration("3600"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("15m"), Some(Duration::from_secs(900)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("7d"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_duration("1w"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("h"), None);
    }

    #[test]
    fn environment_parse_defaults_to_development() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse("TEST"), Environment::Test);
        assert_eq!(Environment::parse("staging"), Environment::Development);
    }

    #[test]
    fn parse_origins_trims_and_drops_empty() {
        let origins = parse_origins("http://a.test/, ,https://b.test");
        assert_eq!(origins, vec!["http://a.test", "https://b.test"]);
    }

    #[test]
    fn parse_port_rejects_garbage() {
        assert!(parse_port(PORT_ENV, "80").is_ok());
        assert!(matches!(
            parse_port(PORT_ENV, "eighty"),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
    }

    #[test]
    fn issuer_keys_must_be_valid() {
        assert!(check_issuer_keys(None, None).is_ok());
        assert!(check_issuer_keys(Some("GABC"), None).is_err());
        assert!(check_issuer_keys(None, Some("SABC")).is_err());
    }

    #[test]
    fn database_path_joins_file_name() {
        let config = AppConfig::for_tests();
        assert!(config.database_path().ends_with(DATABASE_FILE));
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }
}
