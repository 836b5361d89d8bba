//! TOML configuration.
//!
//! Every field has a default, so a missing file or a partial one is fine. The
//! bot token and chat id can come from the environment instead of the file.

use std::path::Path;
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogExtractor;
use crate::catalog::extract::DEFAULT_BLOCK_MARKER;
use crate::catalog::fetch::HttpFetcherOptions;
use crate::catalog::source::SourceUrls;
use crate::channel::telegram::TelegramSettings;
use crate::recommend::{DEFAULT_PRIORITY_MARKER, RecommendationSelector};

/// Environment variable overriding `[telegram] token`.
pub const TOKEN_ENV: &str = "DECK_SCOUT_TOKEN";
/// Environment variable overriding `[telegram] chat_id`.
pub const CHAT_ID_ENV: &str = "DECK_SCOUT_CHAT_ID";

const MAX_RETRIES: u32 = 10;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    #[diagnostic(
        code(scout::config::read),
        help("Check that the file exists and is readable, or run `deck-scout init`.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config file: {path}")]
    #[diagnostic(
        code(scout::config::write),
        help("Check that the parent directory is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {message}")]
    #[diagnostic(
        code(scout::config::parse),
        help("The file must be valid TOML with [telegram], [source], [catalog] and [fetch] sections.")
    )]
    Parse { path: String, message: String },

    #[error("failed to serialize config: {message}")]
    #[diagnostic(code(scout::config::serialize), help("This is a bug; please report it."))]
    Serialize { message: String },

    #[error("invalid value for {field}: {reason}")]
    #[diagnostic(
        code(scout::config::invalid),
        help("Fix the value in the config file or remove it to use the default.")
    )]
    Invalid { field: String, reason: String },

    #[error("telegram {field} is not configured")]
    #[diagnostic(
        code(scout::config::missing_telegram),
        help("Set it in the [telegram] section or export DECK_SCOUT_TOKEN / DECK_SCOUT_CHAT_ID.")
    )]
    MissingTelegram { field: &'static str },

    #[error("environment variable {var} has an invalid value: \"{value}\"")]
    #[diagnostic(code(scout::config::env), help("DECK_SCOUT_CHAT_ID must be an integer chat id."))]
    InvalidEnv { var: &'static str, value: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ── Sections ─────────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
    pub poll_timeout_secs: u64,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            token: None,
            chat_id: None,
            poll_timeout_secs: 60,
        }
    }
}

impl std::fmt::Debug for TelegramSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSection")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    pub main_url: String,
    pub pbe_url: String,
    pub reference_base: String,
    pub block_marker: String,
}

impl Default for SourceSection {
    fn default() -> Self {
        let urls = SourceUrls::default();
        Self {
            main_url: urls.main,
            pbe_url: urls.pbe,
            reference_base: urls.reference_base,
            block_marker: DEFAULT_BLOCK_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    /// Leading character that marks a priority deck.
    pub priority_marker: String,
    pub cache_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            priority_marker: DEFAULT_PRIORITY_MARKER.to_string(),
            cache_ttl_secs: 300,
            sweep_interval_secs: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub timeout_secs: u64,
    /// Extra attempts after a failed fetch.
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub user_agent: String,
}

impl Default for FetchSection {
    fn default() -> Self {
        let options = HttpFetcherOptions::default();
        Self {
            timeout_secs: options.timeout.as_secs(),
            retries: options.retries,
            retry_delay_ms: options.retry_delay.as_millis() as u64,
            user_agent: options.user_agent,
        }
    }
}

// ── ScoutConfig ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub telegram: TelegramSection,
    pub source: SourceSection,
    pub catalog: CatalogSection,
    pub fetch: FetchSection,
}

impl ScoutConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load the file if it exists, otherwise start from defaults. Applies
    /// environment overrides and validates the result.
    pub fn resolve(path: &Path) -> ConfigResult<Self> {
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Apply `DECK_SCOUT_TOKEN` / `DECK_SCOUT_CHAT_ID` from `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<()> {
        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.is_empty()) {
            self.telegram.token = Some(token);
        }
        if let Some(raw) = lookup(CHAT_ID_ENV).filter(|c| !c.is_empty()) {
            let chat_id = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: CHAT_ID_ENV,
                value: raw.clone(),
            })?;
            self.telegram.chat_id = Some(chat_id);
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |field: &str, reason: &str| ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.catalog.priority_marker.chars().count() != 1 {
            return Err(invalid(
                "catalog.priority_marker",
                "must be exactly one character",
            ));
        }
        if self.source.block_marker.is_empty() {
            return Err(invalid("source.block_marker", "must not be empty"));
        }
        if self.catalog.cache_ttl_secs == 0 {
            return Err(invalid("catalog.cache_ttl_secs", "must be greater than zero"));
        }
        if self.catalog.sweep_interval_secs == 0 {
            return Err(invalid(
                "catalog.sweep_interval_secs",
                "must be greater than zero",
            ));
        }
        if self.fetch.retries > MAX_RETRIES {
            return Err(invalid(
                "fetch.retries",
                &format!("must be at most {MAX_RETRIES}"),
            ));
        }
        Ok(())
    }

    /// Telegram settings, once both token and chat id are known.
    pub fn telegram(&self) -> ConfigResult<TelegramSettings> {
        let token = self
            .telegram
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingTelegram { field: "token" })?;
        let chat_id = self
            .telegram
            .chat_id
            .ok_or(ConfigError::MissingTelegram { field: "chat_id" })?;
        let mut settings = TelegramSettings::new(token, chat_id);
        settings.poll_timeout = Duration::from_secs(self.telegram.poll_timeout_secs);
        Ok(settings)
    }

    pub fn source_urls(&self) -> SourceUrls {
        SourceUrls {
            main: self.source.main_url.clone(),
            pbe: self.source.pbe_url.clone(),
            reference_base: self.source.reference_base.clone(),
        }
    }

    pub fn extractor(&self) -> CatalogExtractor {
        CatalogExtractor::new(self.source.block_marker.clone())
    }

    pub fn fetch_options(&self) -> HttpFetcherOptions {
        HttpFetcherOptions {
            timeout: Duration::from_secs(self.fetch.timeout_secs),
            retries: self.fetch.retries,
            retry_delay: Duration::from_millis(self.fetch.retry_delay_ms),
            user_agent: self.fetch.user_agent.clone(),
        }
    }

    pub fn selector(&self) -> RecommendationSelector {
        let marker = self
            .catalog
            .priority_marker
            .chars()
            .next()
            .unwrap_or(DEFAULT_PRIORITY_MARKER);
        RecommendationSelector::new(marker)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog.cache_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.catalog.sweep_interval_secs)
    }
}
