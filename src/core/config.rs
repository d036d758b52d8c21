use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::{fmt, fs};
use tracing::debug;

/// An upstream API credential. Never printed by `Debug`.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        ApiKey(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<unset>")
        } else {
            f.write_str("***")
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Directory holding the browser client; `index.html` is its entry document.
    pub public_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "0.0.0.0".to_string(),
            port: 3000,
            public_dir: PathBuf::from("public"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FixerProviderConfig {
    pub base_url: String,
    pub api_key: ApiKey,
    /// Currencies requested for latest and historical rates.
    pub symbols: Vec<String>,
    pub base: String,
}

impl Default for FixerProviderConfig {
    fn default() -> Self {
        FixerProviderConfig {
            base_url: "http://data.fixer.io/api".to_string(),
            api_key: ApiKey::default(),
            symbols: vec!["EUR".to_string(), "USD".to_string(), "GBP".to_string()],
            base: "EUR".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FreeCurrencyProviderConfig {
    pub base_url: String,
    pub api_key: ApiKey,
}

impl Default for FreeCurrencyProviderConfig {
    fn default() -> Self {
        FreeCurrencyProviderConfig {
            base_url: "https://free.currconv.com/api/v7".to_string(),
            api_key: ApiKey::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ProvidersConfig {
    pub fixer: FixerProviderConfig,
    pub free_currency: FreeCurrencyProviderConfig,
}

/// Process-wide settings, read once at startup and passed to whoever needs them.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
}

pub const DEFAULT_CONFIG_YAML: &str = r#"---
# fxproxy configuration. Environment variables (PORT, API_KEY, FCC_API_KEY,
# SYMBOLS, ...) take precedence over the values below.
server:
  bind: "0.0.0.0"
  port: 3000
  public_dir: "public"

providers:
  fixer:
    base_url: "http://data.fixer.io/api"
    api_key: ""
    symbols: ["EUR", "USD", "GBP"]
    base: "EUR"
  free_currency:
    base_url: "https://free.currconv.com/api/v7"
    api_key: ""
"#;

impl AppConfig {
    /// Builds the configuration from an optional YAML file and the process
    /// environment. Without an explicit path the platform config file is used
    /// when it exists.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::load_from_path(path)?,
            None => match Self::default_config_path() {
                Ok(path) if path.exists() => Self::load_from_path(&path)?,
                _ => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "fxproxy", "fxproxy")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Overrides settings from environment variables. Unset or blank variables
    /// leave the current value alone.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        if let Some(port) = var("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid PORT value: {port}"))?;
        }
        if let Some(bind) = var("BIND_ADDR") {
            self.server.bind = bind;
        }
        if let Some(dir) = var("PUBLIC_DIR") {
            self.server.public_dir = PathBuf::from(dir);
        }

        let fixer = &mut self.providers.fixer;
        if let Some(key) = var("API_KEY") {
            fixer.api_key = ApiKey::new(key);
        }
        if let Some(url) = var("FIXER_BASE_URL") {
            fixer.base_url = url;
        }
        if let Some(symbols) = var("SYMBOLS") {
            fixer.symbols = symbols
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(base) = var("BASE_CURRENCY") {
            fixer.base = base;
        }

        let free_currency = &mut self.providers.free_currency;
        if let Some(key) = var("FCC_API_KEY") {
            free_currency.api_key = ApiKey::new(key);
        }
        if let Some(url) = var("FCC_BASE_URL") {
            free_currency.base_url = url;
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.bind, self.server.port);
        addr.parse()
            .with_context(|| format!("Invalid listen address: {addr}"))
    }
}
