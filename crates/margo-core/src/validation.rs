//! # Validation Module
//!
//! Input validation for product descriptions, order lines and config keys.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Catalog collaborator                                         │
//! │  ├── Strips currency symbols, parses numbers                           │
//! │  └── Resolves carton / unit relationships                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Non-negative cost components                                      │
//! │  └── SKU format, quantities                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Config lookups (CoreError::Unknown*)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{ProductDescription, Rate, BPS_SCALE};
use crate::{MAX_COST_CENTS, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Key Normalization
// =============================================================================

/// Normalizes a config lookup key: trimmed, inner whitespace collapsed, lowercase.
///
/// ## Example
/// ```rust
/// use margo_core::validation::normalize_key;
///
/// assert_eq!(normalize_key("  Gift   Set "), "gift set");
/// assert_eq!(normalize_key("BASIC"), "basic");
/// ```
pub fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - Letters, digits, hyphens, underscores and dots only
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 64,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, underscores and dots"
                .to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates that a cost component is not negative.
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
            value: amount.cents(),
        });
    }
    Ok(())
}

/// Validates a product amount: not negative and at most [`MAX_COST_CENTS`].
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    validate_non_negative(field, amount)?;
    if amount.cents() > MAX_COST_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_COST_CENTS,
        });
    }
    Ok(())
}

/// Validates a rate that may not exceed 100%.
pub fn validate_rate(field: &str, rate: Rate) -> ValidationResult<()> {
    if rate.bps() as i64 > BPS_SCALE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: BPS_SCALE,
        });
    }
    Ok(())
}

/// Validates an order line quantity.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: u32) -> ValidationResult<()> {
    if qty == 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates a product description before pricing.
///
/// ## Rules
/// - SKU passes [`validate_sku`]
/// - Product line is not blank (resolution happens against config)
/// - Every cost component, the manual UVP and the gift figures pass [`validate_amount`]
/// - Gift rates stay within 0-100%
pub fn validate_product(product: &ProductDescription) -> ValidationResult<()> {
    validate_sku(&product.sku)?;

    if product.product_line.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "product_line".to_string(),
        });
    }

    for (field, amount) in product.cost_components() {
        if let Some(amount) = amount {
            validate_amount(field, amount)?;
        }
    }

    if let Some(uvp) = product.manual_uvp_cents {
        validate_amount("manual_uvp_cents", uvp)?;
    }

    if let Some(gift) = &product.gift {
        validate_amount("gift.sku_cost_cents", gift.sku_cost_cents)?;
        validate_amount("gift.shipping_increment_cents", gift.shipping_increment_cents)?;
        validate_rate("gift.funding_share_bps", gift.funding_share_bps)?;
        validate_rate("gift.attach_rate_bps", gift.attach_rate_bps)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
