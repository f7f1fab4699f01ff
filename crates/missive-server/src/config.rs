use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use tracing::warn;

const DEV_SECRET: &str = "dev-secret-change-me";

/// Secrets that must never sign sessions on a deployment with secure cookies.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", DEV_SECRET];

#[derive(Debug, Clone)]
pub struct Config {
    pub secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub secure_cookies: bool,
    pub session_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret = match lookup("MISSIVE_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                warn!("MISSIVE_SECRET is unset, using the development secret");
                DEV_SECRET.to_string()
            }
        };
        let secure_cookies: bool = parse_or(&lookup, "MISSIVE_SECURE_COOKIES", false)?;

        if secure_cookies && PLACEHOLDER_SECRETS.contains(&secret.as_str()) {
            bail!("MISSIVE_SECRET is unset or still a placeholder while MISSIVE_SECURE_COOKIES is on");
        }

        Ok(Self {
            secret,
            db_path: lookup("MISSIVE_DB_PATH").unwrap_or_else(|| "missive.db".into()).into(),
            host: lookup("MISSIVE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "MISSIVE_PORT", 3000)?,
            static_dir: lookup("MISSIVE_STATIC_DIR").unwrap_or_else(|| "static".into()).into(),
            secure_cookies,
            session_days: parse_or(&lookup, "MISSIVE_SESSION_DAYS", 30)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("invalid {key}: '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.secret, DEV_SECRET);
        assert_eq!(config.db_path, PathBuf::from("missive.db"));
        assert!(!config.secure_cookies);
        assert_eq!(config.session_days, 30);
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("MISSIVE_SECRET", "s3cret"),
            ("MISSIVE_PORT", "8080"),
            ("MISSIVE_SECURE_COOKIES", "true"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.secure_cookies);
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = load(&[("MISSIVE_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("MISSIVE_PORT"));
    }

    #[test]
    fn placeholder_secret_with_secure_cookies_is_fatal() {
        assert!(load(&[("MISSIVE_SECURE_COOKIES", "true")]).is_err());
        assert!(load(&[("MISSIVE_SECRET", "change-me-to-a-random-string"), ("MISSIVE_SECURE_COOKIES", "true")]).is_err());
    }
}
