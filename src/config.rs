use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub upload: UploadConfig,
  #[serde(default)]
  pub listing: ListingConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the policy service, e.g. "http://localhost:5000/"
  pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
  /// imgbb-compatible upload endpoint
  #[serde(default = "default_upload_url")]
  pub url: String,
}

impl Default for UploadConfig {
  fn default() -> Self {
    Self {
      url: default_upload_url(),
    }
  }
}

fn default_upload_url() -> String {
  "https://api.imgbb.com/1/upload".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
  pub items_per_page: u32,
  pub search_debounce_ms: u64,
  /// Minutes before a cached read is refetched
  pub stale_minutes: i64,
}

impl Default for ListingConfig {
  fn default() -> Self {
    Self {
      items_per_page: 9,
      search_debounce_ms: 500,
      stale_minutes: 5,
    }
  }
}

impl ListingConfig {
  pub fn debounce(&self) -> Duration {
    Duration::from_millis(self.search_debounce_ms)
  }

  pub fn stale_time(&self) -> chrono::Duration {
    chrono::Duration::minutes(self.stale_minutes.max(0))
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./takaful.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/takaful/config.yaml
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
        "No configuration file found. Create one at ~/.config/takaful/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  /// Like [`Config::load`], with `api_url` overriding `api.url`. When an
  /// API URL is given the config file becomes optional.
  pub fn load_with_api_url(explicit_path: Option<&Path>, api_url: Option<String>) -> Result<Self> {
    let mut config = match (&api_url, explicit_path, Self::find_config_file()) {
      (Some(url), None, None) => Self::for_api(url.clone()),
      _ => Self::load(explicit_path)?,
    };
    if let Some(url) = api_url {
      config.api.url = url;
    }
    Ok(config)
  }

  /// Defaults for everything but the service URL
  pub fn for_api(url: String) -> Self {
    Self {
      api: ApiConfig { url },
      upload: UploadConfig::default(),
      listing: ListingConfig::default(),
      title: None,
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("takaful.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("takaful").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Header title: the configured one, or the API host
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    url::Url::parse(&self.api.url)
      .ok()
      .and_then(|u| u.host_str().map(str::to_string))
      .unwrap_or_else(|| "takaful".to_string())
  }

  /// Bearer token for the policy service, from TAKAFUL_API_TOKEN.
  pub fn get_api_token() -> Option<String> {
    non_empty_env("TAKAFUL_API_TOKEN")
  }

  /// Image host API key, from TAKAFUL_UPLOAD_KEY.
  pub fn get_upload_key() -> Option<String> {
    non_empty_env("TAKAFUL_UPLOAD_KEY")
  }
}

fn non_empty_env(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
