//! # margo-config: Pricing Config Loading for Margo
//!
//! Turns TOML files and environment variables into a validated
//! [`PricingConfig`], and optionally holds one for the whole process.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         margo-config                                    │
//! │                                                                         │
//! │  loader   load / load_with / load_or_default / save                    │
//! │           defaults → TOML file → MARGO_* env → validate                │
//! │                                                                         │
//! │  global   install / installed / load_global                            │
//! │           OnceLock<PricingConfig>, first install wins                  │
//! │                                                                         │
//! │  bin/margo-price                                                       │
//! │           catalog JSON in → results, findings, coverage JSON out       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `margo-core` never reads files or the environment. Everything here is
//! the outer shell around it.

pub mod error;
pub mod global;
pub mod loader;

pub use error::{ConfigError, ConfigResult};
pub use loader::{default_config_path, load, load_or_default, save};
pub use margo_core::config::PricingConfig;
