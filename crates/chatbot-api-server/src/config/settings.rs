use anyhow::{Context, Result};
use config::{Config, Environment, File};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub ai: AiConfig,
    pub retrieval: RetrievalConfig,
    pub session: SessionConfig,
    pub faq: FaqConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Which completion backend a setting refers to.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }

    /// The provider used when this one fails and fallback is enabled.
    pub fn other(&self) -> Self {
        match self {
            Self::OpenAi => Self::Gemini,
            Self::Gemini => Self::OpenAi,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AiConfig {
    pub primary_provider: ProviderKind,
    pub fallback_enabled: bool,
    pub embedding_provider: ProviderKind,
    pub openai: ProviderConfig,
    pub gemini: ProviderConfig,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            primary_provider: ProviderKind::OpenAi,
            fallback_enabled: true,
            embedding_provider: ProviderKind::OpenAi,
            openai: ProviderConfig::default(),
            gemini: ProviderConfig::default(),
        }
    }
}

impl AiConfig {
    pub fn provider(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Gemini => &self.gemini,
        }
    }
}

/// Per-backend settings. Unset optional fields resolve to backend defaults.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: Option<String>,
    pub embedding_model: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: String::new(),
            model: None,
            embedding_model: None,
            system_prompt: None,
            temperature: 0.7,
            max_tokens: 1000,
            timeout_seconds: 60,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub website_base_url: String,
    pub refresh_interval_hours: u64,
    pub refresh_check_minutes: u64,
    pub similarity_threshold: f32,
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            website_base_url: String::new(),
            refresh_interval_hours: 24,
            refresh_check_minutes: 60,
            similarity_threshold: 0.7,
            top_k: 3,
        }
    }
}

impl RetrievalConfig {
    pub fn refresh_interval(&self) -> chrono::Duration {
        chrono::Duration::hours(self.refresh_interval_hours as i64)
    }

    pub fn refresh_check_period(&self) -> Duration {
        Duration::from_secs(self.refresh_check_minutes.max(1) * 60)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub max_session_age_minutes: u64,
    pub max_messages_per_session: usize,
    pub sweep_interval_minutes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_session_age_minutes: 30,
            max_messages_per_session: 20,
            sweep_interval_minutes: 15,
        }
    }
}

impl SessionConfig {
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.max_session_age_minutes as i64)
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_minutes.max(1) * 60)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct FaqConfig {
    /// External FAQ corpus (JSON). The bundled corpus is used when unset.
    pub corpus_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Read once at startup; changes need a restart.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives. `RUST_LOG` wins when set.
    pub level: String,
    pub format: LogFormat,
    pub dir: PathBuf,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,chatbot_api_server=debug".to_string(),
            format: LogFormat::Pretty,
            dir: PathBuf::from("logs"),
            file_prefix: "chatbot".to_string(),
        }
    }
}

impl Settings {
    /// Load from `config/settings.toml` (optional) plus `APP__*` environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_SETTINGS_PATH))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let mut settings: Settings = config
            .try_deserialize()
            .context("Failed to deserialize settings")?;

        settings.apply_key_fallbacks();
        settings.validate()?;
        Ok(settings)
    }

    /// Accept the conventional vendor variables when no `APP__AI__*__API_KEY` is set.
    fn apply_key_fallbacks(&mut self) {
        if !self.ai.openai.has_api_key() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.ai.openai.api_key = key;
            }
        }
        if !self.ai.gemini.has_api_key() {
            if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                self.ai.gemini.api_key = key;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.retrieval.similarity_threshold;
        if !(-1.0..=1.0).contains(&threshold) {
            anyhow::bail!("retrieval.similarity_threshold must be within [-1, 1], got {}", threshold);
        }
        if self.retrieval.top_k == 0 {
            anyhow::bail!("retrieval.top_k must be at least 1");
        }
        if self.session.max_messages_per_session < 2 {
            anyhow::bail!(
                "session.max_messages_per_session must be at least 2, got {}",
                self.session.max_messages_per_session
            );
        }
        if self.logging.file_prefix.trim().is_empty() {
            anyhow::bail!("logging.file_prefix must not be empty");
        }
        if self.session.max_session_age_minutes == 0 {
            anyhow::bail!("session.max_session_age_minutes must be positive");
        }
        Ok(())
    }

    pub fn warn_missing_keys(&self) {
        for kind in [ProviderKind::OpenAi, ProviderKind::Gemini] {
            if !self.ai.provider(kind).has_api_key() {
                warn!("{} API key not found in configuration or environment!", kind);
            }
        }
    }
}

/// Live view of the settings. Cheap to clone; readers always see the latest
/// successfully loaded version.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    current: Arc<RwLock<Arc<Settings>>>,
    path: PathBuf,
}

impl SettingsHandle {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = Settings::load_from(&path)?;
        Ok(Self::with_path(settings, path))
    }

    pub fn with_path(settings: Settings, path: impl Into<PathBuf>) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(settings))),
            path: path.into(),
        }
    }

    /// Handle that is never reloaded from disk.
    pub fn fixed(settings: Settings) -> Self {
        Self::with_path(settings, DEFAULT_SETTINGS_PATH)
    }

    pub fn current(&self) -> Arc<Settings> {
        self.current.read().clone()
    }

    pub fn replace(&self, settings: Settings) {
        *self.current.write() = Arc::new(settings);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the settings file. The previous settings stay active on failure.
    pub fn reload(&self) -> Result<()> {
        let settings = Settings::load_from(&self.path)?;
        info!(
            primary = %settings.ai.primary_provider,
            fallback = settings.ai.fallback_enabled,
            "Settings reloaded from {}",
            self.path.display()
        );
        self.replace(settings);
        Ok(())
    }
}
