//! # Config Loader
//!
//! Builds a validated [`PricingConfig`] from defaults, a TOML file and the
//! environment.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MARGO_TAX_RATE_BPS=700                                             │
//! │     MARGO_FX_BUFFER_BPS=500                                            │
//! │     MARGO_CHANNEL_MARGIN_BPS=1800                                      │
//! │     MARGO_PREFER_EVEN_BUNDLES=false                                    │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     explicit path, else $MARGO_CONFIG, else                            │
//! │     ~/.config/margo/pricing.toml (Linux)                               │
//! │     ~/Library/Application Support/com.margo.margo/pricing.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     PricingConfig::default()                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An explicit or `MARGO_CONFIG` path must exist. The platform default is
//! optional and silently skipped when absent.

use std::path::{Path, PathBuf};

use margo_core::config::PricingConfig;
use margo_core::Rate;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "MARGO_CONFIG";

pub const TAX_RATE_ENV: &str = "MARGO_TAX_RATE_BPS";
pub const FX_BUFFER_ENV: &str = "MARGO_FX_BUFFER_BPS";
pub const CHANNEL_MARGIN_ENV: &str = "MARGO_CHANNEL_MARGIN_BPS";
pub const PREFER_EVEN_ENV: &str = "MARGO_PREFER_EVEN_BUNDLES";

// =============================================================================
// Paths
// =============================================================================

/// Platform config path, e.g. `~/.config/margo/pricing.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "margo", "margo")
        .map(|dirs| dirs.config_dir().join("pricing.toml"))
}

/// Where the config comes from, and whether it has to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfigSource {
    Required(PathBuf),
    Optional(PathBuf),
    None,
}

fn resolve_source(
    explicit: Option<PathBuf>,
    lookup: &impl Fn(&str) -> Option<String>,
) -> ConfigSource {
    if let Some(path) = explicit {
        return ConfigSource::Required(path);
    }
    if let Some(path) = lookup(CONFIG_PATH_ENV).filter(|p| !p.trim().is_empty()) {
        return ConfigSource::Required(PathBuf::from(path));
    }
    default_config_path().map_or(ConfigSource::None, ConfigSource::Optional)
}

// =============================================================================
// Loading
// =============================================================================

/// Parses a TOML document. Missing sections take their defaults.
/// The result is not validated.
pub fn from_toml_str(contents: &str) -> ConfigResult<PricingConfig> {
    Ok(toml::from_str(contents)?)
}

/// Reads and parses a TOML file without validating it.
pub fn read_file(path: &Path) -> ConfigResult<PricingConfig> {
    let contents = std::fs::read_to_string(path)?;
    from_toml_str(&contents)
}

/// Loads the pricing config from the process environment.
///
/// ## Errors
/// I/O and parse failures, and any validation failure of the final document.
pub fn load(config_path: Option<PathBuf>) -> ConfigResult<PricingConfig> {
    load_with(config_path, |key| std::env::var(key).ok())
}

/// Loads the pricing config with an explicit environment lookup.
pub fn load_with(
    config_path: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<String>,
) -> ConfigResult<PricingConfig> {
    let mut config = match resolve_source(config_path, &lookup) {
        ConfigSource::Required(path) => {
            info!(?path, "Loading pricing config from file");
            read_file(&path)?
        }
        ConfigSource::Optional(path) if path.exists() => {
            info!(?path, "Loading pricing config from file");
            read_file(&path)?
        }
        ConfigSource::Optional(path) => {
            debug!(?path, "Config file not found, using defaults");
            PricingConfig::default()
        }
        ConfigSource::None => {
            debug!("No config directory available, using defaults");
            PricingConfig::default()
        }
    };

    apply_env_overrides(&mut config, &lookup);
    config.validate()?;

    Ok(config)
}

/// Loads the config or falls back to defaults with a warning.
pub fn load_or_default(config_path: Option<PathBuf>) -> PricingConfig {
    load(config_path).unwrap_or_else(|e| {
        warn!("Failed to load pricing config: {}. Using defaults.", e);
        PricingConfig::default()
    })
}

/// Writes the config as pretty TOML, creating parent directories.
pub fn save(config: &PricingConfig, config_path: Option<PathBuf>) -> ConfigResult<PathBuf> {
    let path = config_path
        .or_else(default_config_path)
        .ok_or(ConfigError::NoConfigPath)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;

    info!(?path, "Pricing config saved");
    Ok(path)
}

// =============================================================================
// Environment Overrides
// =============================================================================

fn parse_env<T: std::str::FromStr>(
    key: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}

/// Applies the `MARGO_*` overrides found through `lookup`.
pub fn apply_env_overrides(config: &mut PricingConfig, lookup: &impl Fn(&str) -> Option<String>) {
    if let Some(bps) = parse_env::<u32>(TAX_RATE_ENV, lookup) {
        debug!(bps, "Overriding tax rate from environment");
        config.tax_rate_bps = Rate::from_bps(bps);
    }

    if let Some(bps) = parse_env::<u32>(FX_BUFFER_ENV, lookup) {
        debug!(bps, "Overriding FX buffer from environment");
        config.costs.fx_buffer_bps = Rate::from_bps(bps);
    }

    if let Some(bps) = parse_env::<u32>(CHANNEL_MARGIN_ENV, lookup) {
        debug!(bps, "Overriding channel margin from environment");
        config.costs.channel_margin_bps = Rate::from_bps(bps);
    }

    if let Some(prefer_even) = parse_env::<bool>(PREFER_EVEN_ENV, lookup) {
        config.bundling.prefer_even = prefer_even;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
