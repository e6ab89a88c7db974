//! Loader for the service configuration: YAML file + environment overlays.
//!
//! Precedence, lowest first: built-in defaults, YAML sources (in the order they
//! were added), then `FACTCHECK__`-prefixed environment variables using `__` as
//! the nesting separator (`FACTCHECK__SERVER__BIND=0.0.0.0:8080`). String values
//! may reference other variables as `${VAR}`; the API key defaults to
//! `${GEMINI_API_KEY}` and loading fails when it does not resolve.
use config::{Config, Environment, File};
use factcheck_common::observability::{LogConfig, LogFormat};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "FACTCHECK_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "factcheck.yaml";

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_CANDIDATE_MODELS: &[&str] = &[
    "gemini-1.5-flash",
    "gemini-1.5-pro",
    "gemini-pro",
    "models/gemini-1.0-pro",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),

    #[error("GEMINI_API_KEY not found in environment variables")]
    MissingApiKey,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct FactcheckConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub gemini: GeminiSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    /// HTML page served on `GET /`; the built-in page is used when unset.
    pub index_path: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            index_path: None,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct GeminiSettings {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Candidate model identifiers, probed in this order at start-up.
    #[serde(default = "default_models")]
    pub models: Vec<String>,
}

impl fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

fn default_models() -> Vec<String> {
    DEFAULT_CANDIDATE_MODELS
        .iter()
        .map(|m| (*m).to_string())
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormat,
    pub emit_stderr: bool,
    /// Used when `RUST_LOG` is unset.
    pub filter: String,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            emit_stderr: true,
            filter: "info".to_string(),
            dir: None,
        }
    }
}

impl LoggingSettings {
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            log_dir: self.dir.clone(),
            emit_stderr: self.emit_stderr,
            format: self.format,
            default_filter: self.filter.clone(),
            ..LogConfig::default()
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

fn validate(cfg: &FactcheckConfig) -> Result<(), ConfigError> {
    let key = cfg.gemini.api_key.trim();
    if key.is_empty() || key.contains("${") {
        return Err(ConfigError::MissingApiKey);
    }
    if cfg.gemini.models.iter().all(|m| m.trim().is_empty()) {
        return Err(ConfigError::Invalid(
            "gemini.models must list at least one candidate".into(),
        ));
    }
    Ok(())
}

/// Builder hiding the `config` crate wiring.
pub struct FactcheckConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for FactcheckConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl FactcheckConfigLoader {
    /// Start with no file sources; environment overrides are applied in [`load`](Self::load).
    ///
    /// ```
    /// use factcheck_config::FactcheckConfigLoader;
    ///
    /// let config = FactcheckConfigLoader::new()
    ///     .with_yaml_str("gemini:\n  api_key: inline-key")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.gemini.models[0], "gemini-1.5-flash");
    /// assert_eq!(config.server.bind, "127.0.0.1:5000");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Add the file named by `$FACTCHECK_CONFIG`, which must exist, or else
    /// `./factcheck.yaml` when present.
    pub fn with_default_file(self) -> Self {
        match std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            Some(path) => self.with_file(PathBuf::from(path)),
            None => self.with_optional_file(DEFAULT_CONFIG_FILE),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet (tests and doc examples).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders and validate.
    ///
    /// ```
    /// use factcheck_config::{ConfigError, FactcheckConfigLoader};
    ///
    /// let err = FactcheckConfigLoader::new()
    ///     .with_yaml_str("gemini:\n  api_key: '${FACTCHECK_DOCTEST_UNSET_KEY}'")
    ///     .load()
    ///     .unwrap_err();
    /// assert!(matches!(err, ConfigError::MissingApiKey));
    /// ```
    pub fn load(self) -> Result<FactcheckConfig, ConfigError> {
        let cfg = self
            .builder
            .set_default("gemini.api_key", "${GEMINI_API_KEY}")?
            .add_source(
                Environment::with_prefix("FACTCHECK")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("gemini.models"),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: FactcheckConfig = serde_json::from_value(v)
            .map_err(|e| ConfigError::Source(config::ConfigError::Message(e.to_string())))?;
        validate(&typed)?;
        Ok(typed)
    }
}
