//! # UVP Calculator
//!
//! Derives the recommended consumer price (UVP).
//!
//! ```text
//! manual override (gross) ──► ÷ (1 + tax) ──► net
//!                     or
//! full cost ──► ÷ (1 − target margin) ──► net ──► × (1 + tax) ──► gross
//!
//! gross ──► floor to whole euro + .99 ──► rounded
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::PricingConfig;
use crate::cost::CostBreakdown;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::ProductDescription;

/// Whether the unrounded net UVP clears the floor price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PriceVsFloor {
    Ok,
    RaiseNeeded,
}

/// Consumer price of one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UvpResult {
    /// Tax-exclusive price before rounding.
    pub net: Money,

    /// Tax-inclusive price before rounding.
    pub gross: Money,

    /// Tax-inclusive price after the consumer rounding rule.
    pub rounded: Money,

    /// Derived from a manual override rather than the target margin.
    pub manual: bool,

    pub price_vs_floor: PriceVsFloor,
}

/// Computes the UVP for a product whose costs are already known.
///
/// ## Errors
/// `UnknownProductLine` when the line does not resolve.
pub fn calculate_uvp(
    product: &ProductDescription,
    costs: &CostBreakdown,
    config: &PricingConfig,
) -> CoreResult<UvpResult> {
    let line = config.line(&product.product_line)?;
    let tax = config.tax_rate_bps;

    let (net, gross, manual) = match product.manual_uvp_cents {
        Some(manual) => (manual.without_tax(tax), manual, true),
        None => {
            let net = costs
                .full_cost
                .gross_up(line.target_margin_bps.complement_bps())
                .ok_or_else(|| {
                    CoreError::InvalidConfig(format!(
                        "target margin of line '{}' leaves no headroom",
                        product.product_line
                    ))
                })?;
            (net, net.with_tax(tax), false)
        }
    };

    let price_vs_floor = if net >= costs.floor {
        PriceVsFloor::Ok
    } else {
        PriceVsFloor::RaiseNeeded
    };

    Ok(UvpResult {
        net,
        gross,
        rounded: config.rounding.apply(gross),
        manual,
        price_vs_floor,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
