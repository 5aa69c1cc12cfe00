//! Configuration loading for Tutor Cerdas.
//!
//! Layers, later wins:
//!   1. built-in defaults
//!   2. `tutor.toml` (or the path in `TUTOR_CONFIG`)
//!   3. process environment, after `.env` has been loaded with dotenvy
//!
//! `DATABASE_URL` and `JWT_SECRET` have no usable default; `Config::load`
//! fails when they are still empty after all layers are applied.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub llm: LlmConfig,
    pub indexer: IndexerConfig,
    pub uploads: UploadConfig,
    pub chat: ChatConfig,
}

// ── Server ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. Empty means permissive.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 3000, cors_origins: Vec::new() }
    }
}

// ── Database ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Apply embedded migrations at startup.
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 2,
            acquire_timeout_secs: 5,
            run_migrations: true,
        }
    }
}

// ── Auth ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { jwt_secret: String::new(), token_ttl_hours: 168 }
    }
}

// ── LLM ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Gemini,
    OpenaiCompatible,
    Ollama,
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(LlmProvider::Gemini),
            "openai_compatible" | "openai-compatible" | "openai" => {
                Ok(LlmProvider::OpenaiCompatible)
            }
            "ollama" => Ok(LlmProvider::Ollama),
            other => Err(ConfigError::Invalid { key: "LLM_PROVIDER", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            model: "gemini-2.5-flash".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.7,
            max_output_tokens: 2048,
            timeout_secs: 60,
        }
    }
}

// ── Indexer ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub top_k: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self { url: "http://localhost:8000".to_string(), timeout_secs: 30, top_k: 5 }
    }
}

// ── Uploads ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("./uploads"), max_bytes: 10 * 1024 * 1024 }
    }
}

// ── Chat ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Past exchanges fed back into the prompt.
    pub history_window: i64,
    pub max_message_chars: usize,
    pub session_title_chars: usize,
    pub sessions_limit: i64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_window: 5,
            max_message_chars: 2000,
            session_title_chars: 100,
            sessions_limit: 50,
        }
    }
}

impl Config {
    /// Load configuration from `.env`, the TOML file and the environment.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }

        let explicit = std::env::var("TUTOR_CONFIG").ok();
        let path = explicit.clone().unwrap_or_else(|| "tutor.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else if explicit.is_some() {
            return Err(ConfigError::Io {
                path: PathBuf::from(&path),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            });
        } else {
            tracing::info!("{} not found, using defaults and environment", path);
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = get("JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port =
                v.parse().map_err(|_| ConfigError::Invalid { key: "PORT", value: v })?;
        }
        if let Some(v) = get("CORS_ORIGINS") {
            self.server.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = get("LLM_PROVIDER") {
            self.llm.provider = v.parse()?;
        }
        if let Some(v) = get("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Some(v) = get("GEMINI_API_KEY").or_else(|| get("LLM_API_KEY")) {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("INDEXER_URL") {
            self.indexer.url = v;
        }
        if let Some(v) = get("UPLOAD_DIR") {
            self.uploads.dir = PathBuf::from(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "auth.token_ttl_hours",
                value: self.auth.token_ttl_hours.to_string(),
            });
        }
        if self.llm.provider == LlmProvider::Gemini && self.llm.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; chat requests will fail");
        }
        if self.chat.history_window < 0 {
            return Err(ConfigError::Invalid {
                key: "chat.history_window",
                value: self.chat.history_window.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
