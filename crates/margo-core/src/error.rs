//! # Error Types
//!
//! Domain-specific error types for margo-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  margo-core errors (this file)                                         │
//! │  ├── CoreError        - Config/data mismatches (never retryable)       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  margo-config errors (separate crate)                                  │
//! │  └── ConfigError      - File, parse and environment failures           │
//! │                                                                         │
//! │  NOT errors: infeasible guardrails and tiered-fee non-convergence      │
//! │  are tagged values in the results plus a tracing warning.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core pricing errors.
///
/// Every variant indicates a mismatch between the product data and the
/// configuration. They fail fast and are always surfaced to the caller.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product line does not resolve to a configured line.
    ///
    /// ## When This Occurs
    /// - Catalog row carries a line that was renamed in config
    /// - Typo in the catalog ("Premuim")
    #[error("Unknown product line: {0}")]
    UnknownProductLine(String),

    /// Partner role is not configured.
    #[error("Unknown partner role: {0}")]
    UnknownRole(String),

    /// Sales channel is not configured.
    #[error("Unknown sales channel: {0}")]
    UnknownChannel(String),

    /// Box size has no entry in the box cost table.
    #[error("Unknown box size: {0}")]
    UnknownBoxSize(String),

    /// Marketplace size tier has no entry in the fee table.
    #[error("Unknown marketplace size tier: {0}")]
    UnknownSizeTier(String),

    /// The configuration document is inconsistent.
    #[error("Invalid pricing configuration: {0}")]
    InvalidConfig(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any calculation runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Cost components cannot be negative.
    #[error("{field} must not be negative (got {value} cents)")]
    MustBeNonNegative { field: String, value: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Duplicate value (e.g., two config keys that normalize the same).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
