// Application configuration (radar.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub data: DataPaths,
    pub db_path: PathBuf,
    pub llm: LlmConfig,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// radar.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct RadarFile {
    data: DataPaths,
    #[serde(default)]
    database: DatabaseSection,
    llm: LlmConfig,
}

/// Locations of the Players and Config delimited-text sources.
#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub players: String,
    pub leagues: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    #[serde(default = "default_web_search_max_uses")]
    pub web_search_max_uses: u32,
}

fn default_web_search_max_uses() -> u32 {
    3
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub anthropic_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

const DEFAULT_DB_FILE: &str = "radar.db";
const RADAR_FILE: &str = "radar.toml";

/// Load and validate `config/radar.toml` and (optionally)
/// `config/credentials.toml` relative to `base_dir`. Does not copy defaults;
/// prefer `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- radar.toml (required) ---
    let radar_path = config_dir.join(RADAR_FILE);
    let radar_text = read_file(&radar_path)?;
    let radar: RadarFile = toml::from_str(&radar_text).map_err(|e| ConfigError::ParseError {
        path: radar_path.clone(),
        source: e,
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let db_path = match radar.database.path {
        Some(path) => PathBuf::from(path),
        None => default_db_path(),
    };

    let config = Config {
        data: radar.data,
        db_path,
        llm: radar.llm,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// `radar.db` in the platform data directory, or the working directory when
/// no home directory can be determined.
pub fn default_db_path() -> PathBuf {
    match directories::ProjectDirs::from("", "", "prospect-radar") {
        Some(dirs) => dirs.data_dir().join(DEFAULT_DB_FILE),
        None => {
            warn!("no platform data directory; using ./{}", DEFAULT_DB_FILE);
            PathBuf::from(DEFAULT_DB_FILE)
        }
    }
}

/// Seed `config/radar.toml` from `defaults/radar.toml` on first run.
///
/// Returns the new path when a copy was made. An existing `radar.toml` is
/// never touched. Credentials are not seeded: `credentials.toml` holds a
/// personal API key and stays absent until the user writes it.
pub fn seed_radar_toml(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(RADAR_FILE);
    if target.is_file() {
        return Ok(None);
    }

    let seed = base_dir.join("defaults").join(RADAR_FILE);
    if !seed.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "{} does not exist and there is no {} to seed it from; \
                 run prospect-radar from the project root",
                target.display(),
                seed.display()
            ),
        });
    }

    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", dir.display()),
        })?;
    }
    std::fs::copy(&seed, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", seed.display(), target.display()),
    })?;

    info!("seeded {} from {}", target.display(), seed.display());
    Ok(Some(target))
}

/// Load config relative to the working directory, seeding `radar.toml` first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    seed_radar_toml(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let path_fields: &[(&str, &str)] = &[
        ("data.players", &config.data.players),
        ("data.leagues", &config.data.leagues),
    ];
    for (name, val) in path_fields {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    if config.llm.model.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "llm.model".into(),
            message: "must not be empty".into(),
        });
    }

    if config.llm.max_tokens == 0 {
        return Err(ConfigError::ValidationError {
            field: "llm.max_tokens".into(),
            message: "must be greater than 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
