use std::{fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, anyhow};
use tracing::{info, warn};

const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;
const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub media_dir: PathBuf,
    pub media_base_url: String,
    pub bcrypt_cost: u32,
    pub session_idle_minutes: i64,
    pub delivery_timeout: Duration,
    pub max_upload_bytes: usize,
    pub twilio: Option<TwilioConfig>,
    pub mail: Option<MailConfig>,
}

#[derive(Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// HTTP mail API taking a SendGrid-style JSON body with a bearer key.
#[derive(Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0:8080".to_owned(),
            database_url: "sqlite://lovebirds.db?mode=rwc".to_owned(),
            media_dir: PathBuf::from("media"),
            media_base_url: "/media".to_owned(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            session_idle_minutes: 60,
            delivery_timeout: Duration::from_secs(10),
            max_upload_bytes: 25 * 1024 * 1024,
            twilio: None,
            mail: None,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let defaults = Config::default();

        let config = Config {
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            media_dir: var("MEDIA_DIR").map(PathBuf::from).unwrap_or(defaults.media_dir),
            media_base_url: var("MEDIA_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.media_base_url),
            bcrypt_cost: try_load("BCRYPT_COST", defaults.bcrypt_cost)?,
            session_idle_minutes: try_load("SESSION_IDLE_MINUTES", defaults.session_idle_minutes)?,
            delivery_timeout: Duration::from_secs(try_load(
                "DELIVERY_TIMEOUT_SECS",
                defaults.delivery_timeout.as_secs(),
            )?),
            max_upload_bytes: try_load("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            twilio: twilio_config(),
            mail: mail_config(),
        };

        config.check()?;
        Ok(config)
    }

    fn check(&self) -> anyhow::Result<()> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(anyhow!(
                "BCRYPT_COST must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}"
            ));
        }
        Ok(())
    }
}

fn var(key: &str) -> Option<String> {
    dotenv::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("invalid {key} value {raw:?}")),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn twilio_config() -> Option<TwilioConfig> {
    match (
        var("TWILIO_ACCOUNT_SID"),
        var("TWILIO_AUTH_TOKEN"),
        var("TWILIO_PHONE_NUMBER"),
    ) {
        (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
            account_sid,
            auth_token,
            from_number,
        }),
        (None, None, None) => None,
        _ => {
            warn!("Twilio settings are incomplete, SMS delivery disabled");
            None
        }
    }
}

fn mail_config() -> Option<MailConfig> {
    match (var("MAIL_API_URL"), var("MAIL_API_KEY"), var("MAIL_FROM")) {
        (Some(api_url), Some(api_key), Some(from)) => Some(MailConfig {
            api_url,
            api_key,
            from,
        }),
        (None, None, None) => None,
        _ => {
            warn!("mail settings are incomplete, email delivery disabled");
            None
        }
    }
}
