//! # margo-core: Pure Pricing Logic for Margo
//!
//! This crate is the **heart** of the Margo merchandising back office. It
//! derives consumer prices, channel guardrails and bundle recommendations as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Margo Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │        Catalog / Admin / Reporting collaborators                │   │
//! │  │    supply ProductDescriptions, consume results                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          margo-config (TOML + env loader, singleton, CLI)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ &PricingConfig                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ margo-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   cost ──► uvp ──► guardrail ──► autotune ──► bundle            │   │
//! │  │                                                 │               │   │
//! │  │   engine (orchestration)   report   compliance  quote           │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CLOCKS • NO SHARED STATE • INTEGER MONEY          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - The immutable pricing configuration
//! - [`cost`] - Landed cost, floor, gift and box allocations
//! - [`uvp`] - Consumer price (UVP) with `.99` rounding
//! - [`guardrail`] - Minimum viable price per channel, tiered-fee fixed point
//! - [`autotune`] - OK / RAISE_UVP / BUNDLE_RECOMMENDED advisor
//! - [`bundle`] - Multi-unit bundle search
//! - [`quote`] - Partner quotes with the discount stack
//! - [`engine`] - End-to-end orchestration and catalog batches
//! - [`report`] - Coverage statistics across a catalog
//! - [`compliance`] - Advertised-price and floor checks
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same product + same config = same result
//! 2. **No I/O**: loading config from disk lives in `margo-config`
//! 3. **Integer Money**: cents (i64) and basis points (u32), never floats
//! 4. **Tagged Outcomes**: infeasible guardrails are a variant, not a magic price
//!
//! ## Example Usage
//!
//! ```rust
//! use margo_core::config::PricingConfig;
//! use margo_core::engine::PricingEngine;
//! use margo_core::money::Money;
//! use margo_core::types::ProductDescription;
//!
//! let config = PricingConfig::default();
//! let engine = PricingEngine::new(&config);
//!
//! let product = ProductDescription::new("LIP-01", "Basic", Money::from_cents(80));
//! let result = engine.price(&product).unwrap();
//!
//! // Consumer prices always end in .99
//! assert_eq!(result.uvp.rounded.cents() % 100, 99);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod autotune;
pub mod bundle;
pub mod compliance;
pub mod config;
pub mod cost;
pub mod engine;
pub mod error;
pub mod guardrail;
pub mod money;
pub mod quote;
pub mod report;
pub mod types;
pub mod uvp;
pub mod validation;

#[cfg(test)]
mod proptest_tests;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::PricingConfig;
pub use engine::{PricingEngine, PricingResult};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single quote line.
///
/// Guards against typos like 10000 instead of 100 on partner orders.
pub const MAX_LINE_QUANTITY: u32 = 99_999;

/// Iteration budget of the tiered referral fee fixed point.
pub const MAX_TIER_ITERATIONS: u32 = 5;

/// Largest accepted per-unit cost component or manual price (€10,000,000).
///
/// Leaves room for bundle scaling, gross-up over a 0.01% headroom and
/// tax without leaving the i64 cent range.
pub const MAX_COST_CENTS: i64 = 1_000_000_000;

/// Largest configurable bundle size.
pub const MAX_BUNDLE_UNITS: u32 = 100;
