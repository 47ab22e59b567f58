//! # ab-configs
//!
//! Layered settings for the abroad client. Sources, lowest priority first:
//! built-in defaults, an optional `abroad.toml` in the working directory,
//! then `ABROAD__SECTION__KEY` environment variables. A `.env` file, when
//! present, is loaded into the environment beforehand.

use std::path::PathBuf;

use config::{Config, Environment, File, FileFormat, Map};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const ENV_PREFIX: &str = "ABROAD";
const FILE_STEM: &str = "abroad";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to assemble configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub url: Url,
    /// Public (anon) API key sent with every request
    pub anon_key: SecretString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunitySettings {
    pub story_ttl_hours: i64,
    pub duplicate_guard: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSettings {
    /// JSON document replacing the bundled catalog
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: BackendSettings,
    pub community: CommunitySettings,
    pub catalog: CatalogSettings,
    pub log: LogSettings,
}

// Shape of the merged sources before required values are checked.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    backend: RawBackend,
    community: RawCommunity,
    catalog: RawCatalog,
    log: RawLog,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBackend {
    url: Option<String>,
    anon_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawCommunity {
    story_ttl_hours: i64,
    duplicate_guard: bool,
}

impl Default for RawCommunity {
    fn default() -> Self {
        Self {
            story_ttl_hours: 24,
            duplicate_guard: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCatalog {
    path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawLog {
    format: LogFormat,
    filter: String,
}

impl Default for RawLog {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Loads `.env`, `abroad.toml` (if present) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), ".env loaded");
        }
        let builder = Config::builder()
            .add_source(File::with_name(FILE_STEM).required(false))
            .add_source(env_source(None));
        Self::from_config(builder.build()?)
    }

    /// Builds settings from an inline TOML document and an explicit variable
    /// map instead of the filesystem and process environment.
    pub fn from_sources(toml: Option<&str>, env: Map<String, String>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(doc) = toml {
            builder = builder.add_source(File::from_str(doc, FileFormat::Toml));
        }
        let builder = builder.add_source(env_source(Some(env)));
        Self::from_config(builder.build()?)
    }

    fn from_config(cfg: Config) -> Result<Self, ConfigError> {
        let raw: RawSettings = cfg.try_deserialize()?;
        raw.validate()
    }
}

fn env_source(vars: Option<Map<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .source(vars)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl RawSettings {
    fn validate(self) -> Result<Settings, ConfigError> {
        let url = non_blank(self.backend.url).ok_or(ConfigError::Missing("backend.url"))?;
        let url = Url::parse(&url).map_err(|e| ConfigError::Invalid {
            key: "backend.url",
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key: "backend.url",
                reason: format!("unsupported scheme `{}`", url.scheme()),
            });
        }
        let anon_key =
            non_blank(self.backend.anon_key).ok_or(ConfigError::Missing("backend.anon_key"))?;

        if self.community.story_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "community.story_ttl_hours",
                reason: "must be positive".to_string(),
            });
        }

        Ok(Settings {
            backend: BackendSettings {
                url,
                anon_key: SecretString::from(anon_key),
            },
            community: CommunitySettings {
                story_ttl_hours: self.community.story_ttl_hours,
                duplicate_guard: self.community.duplicate_guard,
            },
            catalog: CatalogSettings {
                path: self.catalog.path,
            },
            log: LogSettings {
                format: self.log.format,
                filter: self.log.filter,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn env(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn minimal() -> Map<String, String> {
        env(&[
            ("ABROAD__BACKEND__URL", "https://demo.backend.test"),
            ("ABROAD__BACKEND__ANON_KEY", "anon-123"),
        ])
    }

    #[test]
    fn defaults_apply_when_only_backend_is_set() {
        let s = Settings::from_sources(None, minimal()).unwrap();
        assert_eq!(s.backend.url.as_str(), "https://demo.backend.test/");
        assert_eq!(s.backend.anon_key.expose_secret(), "anon-123");
        assert_eq!(s.community.story_ttl_hours, 24);
        assert!(s.community.duplicate_guard);
        assert_eq!(s.log.format, LogFormat::Pretty);
        assert_eq!(s.log.filter, "info");
        assert!(s.catalog.path.is_none());
    }

    #[test]
    fn environment_overrides_file() {
        let toml = r#"
            [backend]
            url = "http://file.test"
            anon_key = "from-file"

            [community]
            duplicate_guard = false

            [log]
            format = "json"
        "#;
        let vars = env(&[("ABROAD__BACKEND__URL", "https://env.test")]);
        let s = Settings::from_sources(Some(toml), vars).unwrap();
        assert_eq!(s.backend.url.host_str(), Some("env.test"));
        assert_eq!(s.backend.anon_key.expose_secret(), "from-file");
        assert!(!s.community.duplicate_guard);
        assert_eq!(s.log.format, LogFormat::Json);
    }

    #[test]
    fn missing_url_or_key_is_fatal() {
        let err = Settings::from_sources(None, Map::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("backend.url")));

        let only_url = env(&[("ABROAD__BACKEND__URL", "https://demo.backend.test")]);
        let err = Settings::from_sources(None, only_url).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("backend.anon_key")));
    }

    #[test]
    fn non_http_url_is_rejected() {
        let mut vars = minimal();
        vars.insert("ABROAD__BACKEND__URL".into(), "ftp://demo.backend.test".into());
        let err = Settings::from_sources(None, vars).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "backend.url", .. }));
    }

    #[test]
    fn debug_output_redacts_the_key() {
        let s = Settings::from_sources(None, minimal()).unwrap();
        assert!(!format!("{s:?}").contains("anon-123"));
    }
}
