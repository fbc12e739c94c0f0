use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::warn;
use wisp_db::Lifetimes;

/// Admin passwords shipped in sample env files. Treated as unset.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "changeme", "admin", "password"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub admin_password: Option<String>,
    pub trust_forwarded_for: bool,
    pub lifetimes: Lifetimes,
    pub sweep_interval_secs: u64,
    pub sweep_probability: f64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let admin_password = match var("WISP_ADMIN_PASSWORD") {
            Some(p) if p.is_empty() => None,
            Some(p) if PLACEHOLDER_SECRETS.contains(&p.as_str()) => {
                warn!("WISP_ADMIN_PASSWORD is a placeholder; admin actions are disabled");
                None
            }
            Some(p) => Some(p),
            None => None,
        };

        let defaults = Lifetimes::default();
        let lifetimes = Lifetimes {
            poll_grace: secs(&var, "WISP_POLL_GRACE_SECS", defaults.poll_grace)?,
            sweep_grace: secs(&var, "WISP_SWEEP_GRACE_SECS", defaults.sweep_grace)?,
            message_ttl: secs(&var, "WISP_MESSAGE_TTL_SECS", defaults.message_ttl)?,
            public_room_window: defaults.public_room_window,
        };
        lifetimes.validate()?;

        let sweep_interval_secs = parsed(&var, "WISP_SWEEP_INTERVAL_SECS", 60u64)?;
        if sweep_interval_secs == 0 {
            bail!("WISP_SWEEP_INTERVAL_SECS must be non-zero");
        }

        let sweep_probability = parsed(&var, "WISP_SWEEP_PROBABILITY", 0.05f64)?;
        if !(0.0..=1.0).contains(&sweep_probability) {
            bail!("WISP_SWEEP_PROBABILITY must be within [0, 1], got {sweep_probability}");
        }

        Ok(Self {
            host: var("WISP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parsed(&var, "WISP_PORT", 8787)?,
            db_path: var("WISP_DB_PATH").unwrap_or_else(|| "wisp.db".into()).into(),
            admin_password,
            trust_forwarded_for: parsed(&var, "WISP_TRUST_FORWARDED_FOR", false)?,
            lifetimes,
            sweep_interval_secs,
            sweep_probability,
        })
    }
}

fn parsed<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn secs(var: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> anyhow::Result<Duration> {
    parsed(var, key, default.as_secs()).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8787);
        assert_eq!(config.db_path, PathBuf::from("wisp.db"));
        assert!(config.admin_password.is_none());
        assert!(!config.trust_forwarded_for);
        assert_eq!(config.lifetimes, Lifetimes::default());
        assert_eq!(config.sweep_interval_secs, 60);
        assert_eq!(config.sweep_probability, 0.05);
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("WISP_PORT", "9000"),
            ("WISP_ADMIN_PASSWORD", "s3cret-enough"),
            ("WISP_TRUST_FORWARDED_FOR", "true"),
            ("WISP_POLL_GRACE_SECS", "15"),
            ("WISP_SWEEP_PROBABILITY", "1"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.admin_password.as_deref(), Some("s3cret-enough"));
        assert!(config.trust_forwarded_for);
        assert_eq!(config.lifetimes.poll_grace, Duration::from_secs(15));
        assert_eq!(config.sweep_probability, 1.0);
    }

    #[test]
    fn placeholder_password_disables_admin() {
        let config = load(&[("WISP_ADMIN_PASSWORD", "change-me")]).unwrap();
        assert!(config.admin_password.is_none());
    }

    #[test]
    fn rejects_inconsistent_settings() {
        assert!(load(&[("WISP_POLL_GRACE_SECS", "700")]).is_err());
        assert!(load(&[("WISP_MESSAGE_TTL_SECS", "0")]).is_err());
        assert!(load(&[("WISP_SWEEP_INTERVAL_SECS", "0")]).is_err());
        assert!(load(&[("WISP_SWEEP_PROBABILITY", "1.5")]).is_err());
        assert!(load(&[("WISP_PORT", "eighty")]).is_err());
    }
}
