use clap::ValueEnum;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::derived::{Formatter, Grouping};

const APP_DIR: &str = "bursar";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for the header (defaults to the API host)
  pub title: Option<String>,
  #[serde(default)]
  pub default_screen: Screen,
  #[serde(default)]
  pub currency: CurrencyConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

/// Top-level screens reachable from the command palette.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
  Incomes,
  #[default]
  Expenses,
  Budgets,
  Salaries,
  Departments,
  Reports,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the finance API, e.g. `http://localhost:8000/api/`
  pub url: String,
  #[serde(default = "default_timeout")]
  pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
  30
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  /// Host part of the URL, for the header.
  pub fn host(&self) -> String {
    url::Url::parse(&self.url)
      .ok()
      .and_then(|u| u.host_str().map(String::from))
      .unwrap_or_else(|| self.url.clone())
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyConfig {
  #[serde(default = "default_symbol")]
  pub symbol: String,
  #[serde(default)]
  pub grouping: Grouping,
}

fn default_symbol() -> String {
  "₹".to_string()
}

impl Default for CurrencyConfig {
  fn default() -> Self {
    Self {
      symbol: default_symbol(),
      grouping: Grouping::default(),
    }
  }
}

impl CurrencyConfig {
  pub fn formatter(&self) -> Formatter {
    Formatter::new(self.symbol.clone(), self.grouping)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds fetched data is served before a background refetch
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
}

fn default_stale_secs() -> u64 {
  60
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: default_stale_secs(),
    }
  }
}

impl CacheConfig {
  pub fn stale_time(&self) -> Duration {
    Duration::from_secs(self.stale_secs)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./bursar.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/bursar/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/bursar/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("bursar.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join(APP_DIR).join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub(crate) fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    url::Url::parse(&config.api.url).map_err(|e| eyre!("api.url is not a valid URL: {}", e))?;
    Ok(config)
  }

  /// Bearer token override from `BURSAR_TOKEN`. Bypasses the stored session.
  pub fn get_token() -> Option<String> {
    std::env::var("BURSAR_TOKEN").ok().filter(|t| !t.is_empty())
  }

  /// Password for `bursar login`, from `BURSAR_PASSWORD`.
  pub fn get_password() -> Result<String> {
    std::env::var("BURSAR_PASSWORD")
      .map_err(|_| eyre!("Password not found. Set the BURSAR_PASSWORD environment variable."))
  }
}

/// Per-user data directory (`$XDG_DATA_HOME/bursar`), created on demand.
pub fn data_dir() -> Result<PathBuf> {
  let base = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
    .ok_or_else(|| eyre!("Could not determine a data directory"))?;
  let dir = base.join(APP_DIR);
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create data directory {}: {}", dir.display(), e))?;
  Ok(dir)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_defaults() {
    let config = Config::parse("api:\n  url: http://localhost:8000/api/\n").unwrap();
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.default_screen, Screen::Expenses);
    assert_eq!(config.currency.symbol, "₹");
    assert_eq!(config.currency.grouping, Grouping::Indian);
    assert_eq!(config.cache.stale_time(), Duration::from_secs(60));
    assert_eq!(config.api.host(), "localhost");
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
api:
  url: https://finance.school.test/api/
  timeout_secs: 10
title: Springfield High
default_screen: budgets
currency:
  symbol: "$"
  grouping: western
cache:
  stale_secs: 15
"#;
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.title.as_deref(), Some("Springfield High"));
    assert_eq!(config.default_screen, Screen::Budgets);
    assert_eq!(
      config.currency.formatter().currency(Some(rust_decimal::Decimal::from(1234567))),
      "$1,234,567.00"
    );
    assert_eq!(config.api.timeout(), Duration::from_secs(10));
  }

  #[test]
  fn test_invalid_url_rejected() {
    assert!(Config::parse("api:\n  url: not a url\n").is_err());
  }

  #[test]
  fn test_missing_explicit_path() {
    let err = Config::load(Some(Path::new("/nonexistent/bursar.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
