use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

pub const DEFAULT_AI_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Clone)]
pub struct Config {
    pub ai_model: String,
    pub ai_api_key: String,
    pub ai_api_base_url: String,
    pub backend_secret: String,
    pub llm_timeout: Duration,
    pub llm_max_tokens: u32,
    pub max_query_chars: usize,
    /// Reject output that fails the structural check instead of only logging it.
    pub strict_orm_output: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend_secret = require("BACKEND_SECRET")?;
        if backend_secret.trim() != backend_secret {
            bail!("BACKEND_SECRET must not have leading or trailing whitespace");
        }

        Ok(Config {
            ai_model: require("AI_MODEL")?,
            ai_api_key: require("AI_API_KEY")?,
            ai_api_base_url: optional("AI_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_AI_API_BASE_URL.to_string()),
            backend_secret,
            llm_timeout: Duration::from_secs(parse_positive(
                "LLM_TIMEOUT_SECS",
                optional("LLM_TIMEOUT_SECS").as_deref(),
                60,
            )?),
            llm_max_tokens: parse_positive("LLM_MAX_TOKENS", optional("LLM_MAX_TOKENS").as_deref(), 1024)?,
            max_query_chars: parse_positive(
                "MAX_QUERY_CHARS",
                optional("MAX_QUERY_CHARS").as_deref(),
                2000,
            )?,
            strict_orm_output: optional("STRICT_ORM_OUTPUT")
                .map(|v| parse_flag(&v))
                .transpose()
                .context("STRICT_ORM_OUTPUT must be true or false")?
                .unwrap_or(false),
            port: optional("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("ai_model", &self.ai_model)
            .field("ai_api_key", &"<redacted>")
            .field("ai_api_base_url", &self.ai_api_base_url)
            .field("backend_secret", &"<redacted>")
            .field("llm_timeout", &self.llm_timeout)
            .field("llm_max_tokens", &self.llm_max_tokens)
            .field("max_query_chars", &self.max_query_chars)
            .field("strict_orm_output", &self.strict_orm_output)
            .field("port", &self.port)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

/// Parses a numeric setting that must be greater than zero; `default` when unset.
fn parse_positive<T>(key: &str, value: Option<&str>, default: T) -> Result<T>
where
    T: FromStr + PartialEq + Default,
{
    let Some(value) = value else {
        return Ok(default);
    };
    let parsed = value
        .trim()
        .parse::<T>()
        .map_err(|_| anyhow!("{key} must be a positive integer, got '{value}'"))?;
    if parsed == T::default() {
        bail!("{key} must be a positive integer, got '{value}'");
    }
    Ok(parsed)
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognized boolean '{other}'"),
    }
}
