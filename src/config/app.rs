// src/config/app.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::aggregates::QueryCapability;

pub const ENV_CONFIG_PATH: &str = "APP_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";
pub const ENV_BACKEND_URL: &str = "QUERY_BACKEND_URL";
pub const ENV_BACKEND_KEY: &str = "QUERY_BACKEND_ANON_KEY";

fn default_timeout_ms() -> u64 {
    3_000
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the query service, e.g. `https://xyz.example.co`.
    #[serde(default)]
    pub url: String,
    /// "ENV" means: read from QUERY_BACKEND_ANON_KEY
    #[serde(default)]
    pub anon_key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Both URL and key present → aggregates can be queried.
    pub fn capability(&self) -> QueryCapability {
        if self.url.trim().is_empty() || self.anon_key.trim().is_empty() {
            QueryCapability::Disabled
        } else {
            QueryCapability::Enabled
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    /// JSON array of submissions served from memory when no backend is set.
    #[serde(default)]
    pub fixtures_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AppConfig =
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        cfg.resolve()
    }

    /// Config lookup:
    /// 1) $APP_CONFIG_PATH
    /// 2) config/app.toml
    /// 3) defaults (env overrides still apply)
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from_file(&default);
        }
        AppConfig::default().resolve()
    }

    fn resolve(mut self) -> Result<Self> {
        if let Ok(url) = env::var(ENV_BACKEND_URL) {
            if !url.trim().is_empty() {
                self.backend.url = url;
            }
        }
        self.backend.url = self.backend.url.trim().trim_end_matches('/').to_string();

        // Resolve key if "ENV" (required only once a URL is set);
        // an empty key also falls back to the env var
        let key = self.backend.anon_key.trim();
        if key.eq_ignore_ascii_case("env") {
            self.backend.anon_key = match env::var(ENV_BACKEND_KEY) {
                Ok(k) => k,
                Err(_) if self.backend.url.is_empty() => String::new(),
                Err(_) => return Err(anyhow!("Missing {ENV_BACKEND_KEY} env var")),
            };
        } else if key.is_empty() {
            self.backend.anon_key = env::var(ENV_BACKEND_KEY).unwrap_or_default();
        }

        if self.backend.timeout_ms == 0 {
            self.backend.timeout_ms = default_timeout_ms();
        }
        Ok(self)
    }

    pub fn capability(&self) -> QueryCapability {
        self.backend.capability()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_BACKEND_URL);
        env::remove_var(ENV_BACKEND_KEY);
    }

    #[test]
    #[serial]
    fn parses_toml_and_resolves_env_key() {
        clear_env();
        env::set_var(ENV_BACKEND_KEY, "anon-123");
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("app.toml");
        fs::write(
            &p,
            r#"
fixtures_path = "config/benchmarks.json"

[backend]
url = "https://db.example.test/"
anon_key = "ENV"
timeout_ms = 1500
"#,
        )
        .unwrap();

        let cfg = AppConfig::load_from_file(&p).unwrap();
        assert_eq!(cfg.backend.url, "https://db.example.test");
        assert_eq!(cfg.backend.anon_key, "anon-123");
        assert_eq!(cfg.backend.timeout(), Duration::from_millis(1500));
        assert_eq!(cfg.capability(), QueryCapability::Enabled);
        assert_eq!(
            cfg.fixtures_path.as_deref(),
            Some(Path::new("config/benchmarks.json"))
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn env_marker_without_var_is_an_error() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("app.toml");
        fs::write(&p, "[backend]\nurl = \"https://x\"\nanon_key = \"env\"\n").unwrap();
        assert!(AppConfig::load_from_file(&p).is_err());
    }

    #[test]
    #[serial]
    fn env_marker_without_url_stays_disabled() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("app.toml");
        fs::write(&p, "[backend]\nurl = \"\"\nanon_key = \"ENV\"\n").unwrap();
        let cfg = AppConfig::load_from_file(&p).unwrap();
        assert_eq!(cfg.capability(), QueryCapability::Disabled);
    }

    #[test]
    #[serial]
    fn defaults_disable_queries() {
        clear_env();
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        let cfg = AppConfig::load_default().unwrap();
        assert_eq!(cfg.capability(), QueryCapability::Disabled);
        assert_eq!(cfg.backend.timeout_ms, 3_000);

        env::set_current_dir(old).unwrap();
    }

    #[test]
    #[serial]
    fn env_url_override_enables_backend() {
        clear_env();
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::set_var(ENV_BACKEND_URL, "https://db.example.test");
        env::set_var(ENV_BACKEND_KEY, "k");

        let cfg = AppConfig::load_default().unwrap();
        assert_eq!(cfg.capability(), QueryCapability::Enabled);

        clear_env();
        env::set_current_dir(old).unwrap();
    }

    #[test]
    #[serial]
    fn missing_explicit_path_is_an_error() {
        clear_env();
        env::set_var(ENV_CONFIG_PATH, "/definitely/not/here.toml");
        assert!(AppConfig::load_default().is_err());
        clear_env();
    }
}
