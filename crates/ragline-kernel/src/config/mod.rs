//! Configuration loading
//!
//! Loads configuration files in any of the formats supported by the `config`
//! crate (YAML, TOML, JSON, INI, RON, JSON5), with `${VAR}` / `$VAR`
//! environment substitution and optional prefixed environment overrides.

mod settings;

pub use settings::{
    BackfillSettings, ChunkingSettings, EmbeddingSettings, OllamaSettings, RaglineConfig,
    RerankerPolicy, RerankerSettings, RetrievalSettings, ServerSettings, StorageSettings,
};

use config::{Config as Cfg, Environment, File, FileFormat};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::LazyLock;

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for crate::error::RagError {
    fn from(err: ConfigError) -> Self {
        crate::error::RagError::Configuration(err.to_string())
    }
}

static BRACED_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));
static BARE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").expect("valid regex"));

/// Detect configuration format from file extension
pub fn detect_format(path: &str) -> ConfigResult<FileFormat> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        "ini" => Ok(FileFormat::Ini),
        "ron" => Ok(FileFormat::Ron),
        "json5" => Ok(FileFormat::Json5),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Substitute environment variables in a string
///
/// `${VAR_NAME}` is replaced first, then bare `$VAR_NAME`. Unset variables
/// are left untouched.
pub fn substitute_env_vars(content: &str) -> String {
    let braced = BRACED_VAR.replace_all(content, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });

    BARE_VAR
        .replace_all(&braced, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

fn build<T>(builder: config::ConfigBuilder<config::builder::DefaultState>) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    builder
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

/// Load configuration from a file, detecting its format from the extension.
pub fn load_config<T>(path: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    from_str(&content, format)
}

/// Load configuration from a string with explicit format
pub fn from_str<T>(content: &str, format: FileFormat) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let substituted = substitute_env_vars(content);
    build(Cfg::builder().add_source(File::from_str(&substituted, format)))
}

/// Load configuration with environment variable overrides
///
/// Environment variables are prefixed with `env_prefix` and use double
/// underscores for nesting, e.g. `RAGLINE_SERVER__PORT`. When `path` is
/// `None` only the environment (and serde defaults) contribute.
pub fn load_with_env<T>(path: Option<&str>, env_prefix: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let mut builder = Cfg::builder();

    if let Some(path) = path {
        let format = detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        let substituted = substitute_env_vars(&content);
        builder = builder.add_source(File::from_str(&substituted, format));
    }

    build(
        builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        ),
    )
}
