use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts after the first one.
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds; doubles on each retry.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Global configuration loaded from `~/.config/cortex-tx/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxConfig {
    /// Base URL of the transactions API.
    pub api_base_url: String,
    /// Route requests to `mock_api_base_url` instead.
    #[serde(default)]
    pub use_mock: bool,
    /// Mock server base URL; falls back to `http://localhost:8080`.
    #[serde(default)]
    pub mock_api_base_url: Option<String>,
    /// Per-attempt timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// TCP/TLS connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Where the user is sent when the API answers 401.
    #[serde(default)]
    pub auth_redirect: Option<String>,
    /// Account used when a command does not name one.
    #[serde(default)]
    pub account_id: Option<String>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_AUTH_REDIRECT: &str = "/auth";

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            use_mock: false,
            mock_api_base_url: None,
            request_timeout_ms: 30_000,
            connect_timeout_ms: default_connect_timeout_ms(),
            auth_redirect: None,
            account_id: None,
            retry: None,
        }
    }
}

impl TxConfig {
    /// Base URL requests are sent to, honoring the mock switch.
    pub fn effective_base_url(&self) -> &str {
        if self.use_mock {
            self.mock_api_base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
        } else {
            &self.api_base_url
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn auth_redirect(&self) -> &str {
        self.auth_redirect.as_deref().unwrap_or(DEFAULT_AUTH_REDIRECT)
    }

    pub fn retry_or_default(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    /// Apply `API_BASE_URL`, `USE_MOCK` and `MOCK_API_BASE_URL` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Like [`apply_env`](Self::apply_env) with an injectable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("API_BASE_URL").filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
        // Any non-empty value turns the mock on, "false" included.
        if let Some(flag) = lookup("USE_MOCK") {
            self.use_mock = !flag.is_empty();
        }
        if let Some(url) = lookup("MOCK_API_BASE_URL").filter(|v| !v.is_empty()) {
            self.mock_api_base_url = Some(url);
        }
    }

    /// Check that the effective base URL is an absolute http(s) URL and timeouts are positive.
    pub fn validate(&self) -> Result<()> {
        let base = self.effective_base_url();
        let parsed = url::Url::parse(base).with_context(|| format!("invalid base URL {base:?}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("base URL {base:?} must use http or https");
        }
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be positive");
        }
        if let Some(retry) = &self.retry {
            if retry.base_delay_ms == 0 {
                bail!("retry.base_delay_ms must be positive");
            }
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("cortex-tx")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<TxConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = TxConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: TxConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
