//! # Process-wide Config
//!
//! The calculators take `&PricingConfig` explicitly. Binaries that want a
//! single shared config install it once here; every later caller gets the
//! same `&'static` reference.
//!
//! ```text
//! thread A ──┐
//! thread B ──┼──► install(config) ──► OnceLock::get_or_init ──► &'static PricingConfig
//! thread C ──┘                         (first writer wins)
//! ```

use std::path::PathBuf;
use std::sync::OnceLock;

use margo_core::config::PricingConfig;
use tracing::{debug, info};

use crate::error::ConfigResult;
use crate::loader;

static CONFIG: OnceLock<PricingConfig> = OnceLock::new();

/// Validates and installs `config` unless one is already installed.
///
/// Returns the installed config, which is the earlier one when this call
/// lost the race.
pub fn install(config: PricingConfig) -> ConfigResult<&'static PricingConfig> {
    config.validate()?;

    let mut installed_here = false;
    let current = CONFIG.get_or_init(|| {
        installed_here = true;
        config
    });

    if installed_here {
        info!(
            lines = current.lines.len(),
            channels = current.channels.len(),
            "Pricing config installed"
        );
    } else {
        debug!("Pricing config already installed, keeping existing");
    }
    Ok(current)
}

/// The installed config, if any.
pub fn installed() -> Option<&'static PricingConfig> {
    CONFIG.get()
}

/// Returns the installed config, loading and installing it on first use.
pub fn load_global(config_path: Option<PathBuf>) -> ConfigResult<&'static PricingConfig> {
    if let Some(config) = installed() {
        return Ok(config);
    }
    install(loader::load(config_path)?)
}
