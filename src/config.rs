//! Layered settings: `.env` → `bookflow.toml` → `BOOKFLOW__*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use url::Url;

const CONFIG_FILE_ENV: &str = "BOOKFLOW_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "bookflow.toml";
const ENV_PREFIX: &str = "BOOKFLOW";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub session: SessionSettings,
}

impl Settings {
    /// 設定を読み込む。`session_path` はCLI引数による上書き。
    pub fn load(session_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // `.env` は無くてもよい
        let _ = dotenvy::dotenv();

        let file = std::env::var(CONFIG_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let builder = config::Config::builder()
            .add_source(config::File::from(file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut settings = Self::build(builder)?;
        if let Some(path) = session_path {
            settings.session.path = path;
        }
        Ok(settings)
    }

    fn build(builder: config::ConfigBuilder<config::builder::DefaultState>) -> anyhow::Result<Self> {
        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;
        let settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;
        settings.api.base_url()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "ApiSettings::default_base_url")]
    pub base_url: String,
    #[serde(default = "ApiSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ApiSettings {
    fn default_base_url() -> String {
        "https://bookflow-apis.onrender.com/api".to_string()
    }

    fn default_timeout_ms() -> u64 {
        15000
    }

    /// 末尾スラッシュを除いた検証済みURL
    pub fn base_url(&self) -> anyhow::Result<Url> {
        let trimmed = self.base_url.trim_end_matches('/');
        let url = Url::parse(trimmed)
            .with_context(|| format!("invalid api.base_url '{}'", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("api.base_url must be http(s), got '{}'", url.scheme());
        }
        Ok(url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "SessionSettings::default_path")]
    pub path: PathBuf,
}

impl SessionSettings {
    fn default_path() -> PathBuf {
        PathBuf::from("bookflow-session.json")
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}
