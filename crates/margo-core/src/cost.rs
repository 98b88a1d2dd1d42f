//! # Cost Calculator
//!
//! Derives landed unit cost, the floor price and the per-unit gift and box
//! allocations from a [`ProductDescription`].
//!
//! ## Cost Build-up
//! ```text
//! factory cost (manual, else carton ÷ units per carton)
//!        │
//!        ▼  × (1 + fx buffer)
//! inflated factory cost
//!        │
//!        ▼  + inbound shipping + compliance + packaging + qc + ops + marketing
//! full cost ──────────► floor = full cost × line floor multiplier
//!
//! gift cost = (gift sku × (1 − funding share) + shipping increment) × attach rate
//! box cost  = box table[size] ÷ average units per order
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::PricingConfig;
use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{GiftAttach, ProductDescription, BPS_SCALE};

/// Box sizes the classification thresholds produce.
pub const BOX_SIZES: [&str; 3] = ["S", "M", "L"];

/// Marketplace size tiers the classification thresholds produce.
pub const SIZE_TIERS: [&str; 3] = ["small_standard", "standard", "large_standard"];

/// Box size for a pack of `units`.
pub fn box_size_for_units(units: u32) -> &'static str {
    match units {
        0..=1 => BOX_SIZES[0],
        2..=3 => BOX_SIZES[1],
        _ => BOX_SIZES[2],
    }
}

/// Marketplace size tier for a pack of `units`.
pub fn size_tier_for_units(units: u32) -> &'static str {
    match units {
        0..=1 => SIZE_TIERS[0],
        2..=3 => SIZE_TIERS[1],
        _ => SIZE_TIERS[2],
    }
}

// =============================================================================
// Cost Breakdown
// =============================================================================

/// Per-unit costs of one sellable unit (a single product or a whole bundle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CostBreakdown {
    /// Factory cost before the FX buffer.
    pub factory_cost: Money,

    /// Factory cost after the FX buffer.
    pub inflated_factory_cost: Money,

    pub additive_costs: Money,

    /// Inflated factory cost plus every additive component.
    pub full_cost: Money,

    /// Full cost × line floor multiplier.
    pub floor: Money,

    /// Expected gift cost per unit sold.
    pub gift_cost: Money,

    /// Box cost spread over the average units per order.
    pub box_cost: Money,

    pub box_size: String,

    pub size_tier: String,
}

/// Unit factory cost: the manual figure wins, else carton total ÷ units per carton.
///
/// A carton without a unit count yields zero rather than an error; the catalog
/// collaborator owns that relationship.
pub fn unit_factory_cost(product: &ProductDescription) -> Money {
    if let Some(manual) = product.factory_cost_cents {
        return manual;
    }
    match (product.carton_cost_cents, product.units_per_carton) {
        (Some(carton), Some(units)) => carton.split(units),
        _ => Money::zero(),
    }
}

/// Expected gift cost per unit sold. Zero without a gift.
///
/// ## Example
/// ```rust
/// use margo_core::cost::expected_gift_cost;
/// use margo_core::money::Money;
/// use margo_core::types::{GiftAttach, Rate};
///
/// let gift = GiftAttach {
///     sku_cost_cents: Money::from_cents(200),
///     funding_share_bps: Rate::from_bps(5000),
///     shipping_increment_cents: Money::from_cents(20),
///     attach_rate_bps: Rate::from_bps(2500),
/// };
/// // (2.00 × 50% + 0.20) × 25% = 0.30
/// assert_eq!(expected_gift_cost(Some(&gift)).cents(), 30);
/// ```
pub fn expected_gift_cost(gift: Option<&GiftAttach>) -> Money {
    gift.map_or(Money::zero(), |gift| {
        (gift.sku_cost_cents.discounted(gift.funding_share_bps) + gift.shipping_increment_cents)
            .apply_rate(gift.attach_rate_bps)
    })
}

/// Computes the cost breakdown of a product.
///
/// ## Errors
/// Only configuration lookups fail: an unknown product line or box size.
/// Missing cost inputs count as zero.
pub fn calculate_costs(
    product: &ProductDescription,
    config: &PricingConfig,
) -> CoreResult<CostBreakdown> {
    let line = config.line(&product.product_line)?;

    let factory_cost = unit_factory_cost(product);
    let inflated_factory_cost =
        factory_cost.scale_bps(BPS_SCALE + config.costs.fx_buffer_bps.bps() as i64);
    let additive_costs = product.additive_costs();
    let full_cost = inflated_factory_cost + additive_costs;
    let floor = full_cost.scale_bps(line.floor_multiplier_bps as i64);

    let box_size = product
        .box_size
        .clone()
        .unwrap_or_else(|| box_size_for_units(1).to_string());
    let size_tier = product
        .size_tier
        .clone()
        .unwrap_or_else(|| size_tier_for_units(1).to_string());

    let average_units = config.average_units.for_order_type(product.order_type);
    let box_cost = config.box_cost(&box_size)?.split_hundredths(average_units);

    Ok(CostBreakdown {
        factory_cost,
        inflated_factory_cost,
        additive_costs,
        full_cost,
        floor,
        gift_cost: expected_gift_cost(product.gift.as_ref()),
        box_cost,
        box_size,
        size_tier,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
