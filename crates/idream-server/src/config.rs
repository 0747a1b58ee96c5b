use std::path::PathBuf;

use anyhow::{Context, bail};
use idream_types::lifecycle::MAX_PREMIER_DAYS;

/// Placeholder JWT secrets that MUST NOT be used outside development.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub ai_api_key: Option<String>,
    pub ai_model: Option<String>,
    pub premier_days: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let allow_dev_secret = non_empty("IDREAM_ALLOW_DEV_SECRET").as_deref() == Some("1");
        let jwt_secret = match non_empty("IDREAM_JWT_SECRET") {
            Some(secret) if !PLACEHOLDER_SECRETS.contains(&secret.as_str()) => secret,
            Some(secret) if allow_dev_secret => secret,
            None if allow_dev_secret => "dev-secret-change-me".to_string(),
            _ => bail!(
                "IDREAM_JWT_SECRET is unset or still a placeholder. \
                 Set it in your .env file (or IDREAM_ALLOW_DEV_SECRET=1 for local development)."
            ),
        };

        let port = match non_empty("IDREAM_PORT") {
            Some(p) => p.parse().with_context(|| format!("invalid IDREAM_PORT '{}'", p))?,
            None => 3000,
        };

        let premier_days = match non_empty("IDREAM_PREMIER_DAYS") {
            Some(d) => d
                .parse()
                .with_context(|| format!("invalid IDREAM_PREMIER_DAYS '{}'", d))?,
            None => 7,
        };
        if premier_days == 0 || premier_days > MAX_PREMIER_DAYS {
            bail!("IDREAM_PREMIER_DAYS must be between 1 and {}", MAX_PREMIER_DAYS);
        }

        Ok(Self {
            jwt_secret,
            db_path: non_empty("IDREAM_DB_PATH")
                .unwrap_or_else(|| "idream.db".into())
                .into(),
            host: non_empty("IDREAM_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            ai_api_key: non_empty("IDREAM_AI_API_KEY").or_else(|| non_empty("GEMINI_API_KEY")),
            ai_model: non_empty("IDREAM_AI_MODEL"),
            premier_days,
        })
    }
}
