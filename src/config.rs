use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::cache::LookupScope;

/// Cache namespace of the version this build ships.
pub const DEFAULT_VERSION: &str = "stpl-cms-v1";

/// Pages and assets warmed into the cache on install.
pub const DEFAULT_STATIC_ASSETS: &[&str] = &[
  "/",
  "/index.html",
  "/login.html",
  "/dashboard.html",
  "/Administration.html",
  "/signup-approvals.html",
  "/hostel.html",
  "/inventory.html",
  "/new-complaint.html",
  "/Submitted-complaints.html",
  "/hostel_export.html",
  "/inventory_export.html",
  "/hse.html",
  "/manifest.json",
  "/logo.png",
];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Origin the static asset paths are resolved against
  #[serde(default = "default_origin")]
  pub origin: String,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Name of the current cache namespace; bump to invalidate everything
  #[serde(default = "default_version")]
  pub version: String,
  #[serde(default = "default_static_assets")]
  pub static_assets: Vec<String>,
  #[serde(default)]
  pub lookup_scope: LookupScope,
  /// SQLite file (defaults to $XDG_DATA_HOME/offcache/cache.db)
  pub database: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      version: default_version(),
      static_assets: default_static_assets(),
      lookup_scope: LookupScope::default(),
      database: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
  #[serde(default = "default_icon")]
  pub icon: String,
  #[serde(default = "default_badge")]
  pub badge: String,
  #[serde(default = "default_vibrate")]
  pub vibrate: Vec<u32>,
  /// Page opened when a notification is clicked
  #[serde(default = "default_click_url")]
  pub click_url: String,
}

impl Default for NotificationConfig {
  fn default() -> Self {
    Self {
      icon: default_icon(),
      badge: default_badge(),
      vibrate: default_vibrate(),
      click_url: default_click_url(),
    }
  }
}

fn default_origin() -> String {
  "http://localhost:8000/".to_string()
}

fn default_version() -> String {
  DEFAULT_VERSION.to_string()
}

fn default_static_assets() -> Vec<String> {
  DEFAULT_STATIC_ASSETS.iter().map(|s| s.to_string()).collect()
}

fn default_icon() -> String {
  "/icons/icon-192x192.png".to_string()
}

fn default_badge() -> String {
  "/icons/icon-72x72.png".to_string()
}

fn default_vibrate() -> Vec<u32> {
  vec![100, 50, 100]
}

fn default_click_url() -> String {
  "/dashboard.html".to_string()
}

impl Default for Config {
  fn default() -> Self {
    Self {
      origin: default_origin(),
      cache: CacheConfig::default(),
      notifications: NotificationConfig::default(),
    }
  }
}

/// Settings given on the command line; these win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
  pub origin: Option<String>,
  pub version: Option<String>,
  pub database: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./offcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/offcache/config.yaml
  ///
  /// Falls back to built-in defaults when no file exists. Environment and
  /// command line overrides are applied on top either way.
  pub fn load(explicit_path: Option<&Path>, overrides: Overrides) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    Ok(config.with_overrides(|name| std::env::var(name).ok(), overrides))
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("offcache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("offcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    config.origin_url()?;
    Ok(config)
  }

  /// Apply OFFCACHE_ORIGIN and OFFCACHE_VERSION from `env`, then the command line.
  fn with_overrides<E>(mut self, env: E, overrides: Overrides) -> Self
  where
    E: Fn(&str) -> Option<String>,
  {
    if let Some(origin) = env("OFFCACHE_ORIGIN") {
      self.origin = origin;
    }
    if let Some(version) = env("OFFCACHE_VERSION") {
      self.cache.version = version;
    }

    if let Some(origin) = overrides.origin {
      self.origin = origin;
    }
    if let Some(version) = overrides.version {
      self.cache.version = version;
    }
    if let Some(database) = overrides.database {
      self.cache.database = Some(database);
    }
    self
  }

  /// The origin as a URL.
  pub fn origin_url(&self) -> Result<Url> {
    Url::parse(&self.origin).map_err(|e| eyre!("Invalid origin '{}': {}", self.origin, e))
  }

  /// Resolve a path (or absolute URL) against the origin.
  pub fn resolve(&self, path: &str) -> Result<Url> {
    self
      .origin_url()?
      .join(path)
      .map_err(|e| eyre!("Invalid URL '{}': {}", path, e))
  }

  /// Static assets resolved to absolute URLs, in declaration order.
  pub fn static_asset_urls(&self) -> Result<Vec<Url>> {
    self
      .cache
      .static_assets
      .iter()
      .map(|path| self.resolve(path))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.cache.version, "stpl-cms-v1");
    assert_eq!(config.cache.static_assets.len(), DEFAULT_STATIC_ASSETS.len());
    assert_eq!(config.cache.lookup_scope, LookupScope::Current);
    assert_eq!(config.notifications.vibrate, vec![100, 50, 100]);
    assert_eq!(config.notifications.click_url, "/dashboard.html");
  }

  #[test]
  fn test_parse_partial_file_keeps_defaults() {
    let config = Config::parse(
      r#"
origin: "https://cms.example.com/"
cache:
  version: stpl-cms-v2
  lookup_scope: all
"#,
    )
    .unwrap();

    assert_eq!(config.origin, "https://cms.example.com/");
    assert_eq!(config.cache.version, "stpl-cms-v2");
    assert_eq!(config.cache.lookup_scope, LookupScope::All);
    assert_eq!(config.cache.static_assets[1], "/index.html");
    assert_eq!(config.notifications.icon, "/icons/icon-192x192.png");
  }

  #[test]
  fn test_parse_rejects_bad_origin() {
    assert!(Config::parse("origin: \"not a url\"").is_err());
  }

  #[test]
  fn test_load_missing_explicit_path() {
    let err = Config::load(
      Some(Path::new("/definitely/not/here.yaml")),
      Overrides::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("offcache.yaml");
    std::fs::write(&path, "cache:\n  static_assets: [\"/a.html\", \"/b.html\"]\n").unwrap();

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.cache.static_assets, vec!["/a.html", "/b.html"]);
  }

  fn env_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: Vec<(String, String)> = vars
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    move |name| {
      vars
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
    }
  }

  fn file_config() -> Config {
    Config::parse(
      r#"
origin: "https://file.example.com/"
cache:
  version: from-file
"#,
    )
    .unwrap()
  }

  #[test]
  fn test_env_overrides_file() {
    let config = file_config().with_overrides(
      env_from(&[
        ("OFFCACHE_ORIGIN", "https://env.example.com/"),
        ("OFFCACHE_VERSION", "from-env"),
      ]),
      Overrides::default(),
    );

    assert_eq!(config.origin, "https://env.example.com/");
    assert_eq!(config.cache.version, "from-env");
  }

  #[test]
  fn test_command_line_overrides_env() {
    let config = file_config().with_overrides(
      env_from(&[
        ("OFFCACHE_ORIGIN", "https://env.example.com/"),
        ("OFFCACHE_VERSION", "from-env"),
      ]),
      Overrides {
        origin: None,
        version: Some("from-cli".to_string()),
        database: Some(PathBuf::from("/tmp/offcache.db")),
      },
    );

    // Origin only set in env, version set on both
    assert_eq!(config.origin, "https://env.example.com/");
    assert_eq!(config.cache.version, "from-cli");
    assert_eq!(config.cache.database, Some(PathBuf::from("/tmp/offcache.db")));
  }

  #[test]
  fn test_no_overrides_keeps_file_values() {
    let config = file_config().with_overrides(env_from(&[]), Overrides::default());

    assert_eq!(config.origin, "https://file.example.com/");
    assert_eq!(config.cache.version, "from-file");
    assert_eq!(config.cache.database, None);
  }

  #[test]
  fn test_static_asset_urls_resolve_against_origin() {
    let config = Config {
      origin: "https://cms.example.com/app/".to_string(),
      ..Config::default()
    };

    let urls = config.static_asset_urls().unwrap();
    assert_eq!(urls[0].as_str(), "https://cms.example.com/");
    assert_eq!(urls[1].as_str(), "https://cms.example.com/index.html");
    assert_eq!(
      config.resolve("page.html").unwrap().as_str(),
      "https://cms.example.com/app/page.html"
    );
  }
}
