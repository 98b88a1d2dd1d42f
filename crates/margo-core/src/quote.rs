//! # Quote Builder
//!
//! Prices multi-line partner orders.
//!
//! ## Discount Stack
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  per line:                                                              │
//! │    discounted = UVP net × (1 − role discount) × (1 − quantity discount)│
//! │    cap        = UVP net × (1 − role max discount)                      │
//! │    floor      = line floor price                                       │
//! │    minimum    = full cost + role minimum margin                        │
//! │                                                                         │
//! │    unit net   = max(discounted, cap, floor, minimum)                   │
//! │                                                                         │
//! │  per order:                                                             │
//! │    subtotal ──► − order bracket discount ──► + tax ──► + shipping      │
//! │    loyalty points, role commission                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No combination of stacked discounts can price a line below cost or below
//! the policy floors.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::PricingConfig;
use crate::error::CoreResult;
use crate::money::Money;
use crate::types::Rate;
use crate::validation::validate_quantity;

// =============================================================================
// Request
// =============================================================================

/// One order line with the pricing figures it is quoted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuoteItem {
    pub sku: String,
    pub quantity: u32,

    /// Tax-exclusive consumer price.
    pub uvp_net: Money,

    /// Floor price per unit.
    pub floor: Money,

    pub full_cost: Money,
}

/// A partner order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuoteRequest {
    /// Partner role key ("Stand", "Dealer", ...).
    pub role: String,
    pub items: Vec<QuoteItem>,
}

// =============================================================================
// Result
// =============================================================================

/// Which bound set a line's unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PriceBasis {
    Discounted,
    DiscountCap,
    Floor,
    MinimumMargin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuoteLine {
    pub sku: String,
    pub quantity: u32,
    pub role_discount_bps: Rate,
    pub quantity_discount_bps: Rate,
    pub unit_net: Money,
    pub basis: PriceBasis,
    pub line_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuoteResult {
    pub role: String,
    pub lines: Vec<QuoteLine>,
    pub subtotal: Money,
    pub order_discount_bps: Rate,
    pub order_discount: Money,

    /// Subtotal after the order discount, tax-exclusive.
    pub net_total: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    pub loyalty_points: u64,
    pub commission: Option<Money>,
}

// =============================================================================
// Builder
// =============================================================================

/// Prices a partner order.
///
/// ## Errors
/// `UnknownRole`, or a validation error for a zero or oversized quantity.
pub fn build_quote(request: &QuoteRequest, config: &PricingConfig) -> CoreResult<QuoteResult> {
    let role = config.role(&request.role)?;

    let mut lines = Vec::with_capacity(request.items.len());
    for item in &request.items {
        validate_quantity(item.quantity)?;

        let quantity_discount = if role.quantity_discount_exempt {
            Rate::zero()
        } else {
            config.quantity_discount(item.quantity)
        };

        let candidates = [
            (
                PriceBasis::Discounted,
                item.uvp_net
                    .discounted(role.base_discount_bps)
                    .discounted(quantity_discount),
            ),
            (
                PriceBasis::DiscountCap,
                item.uvp_net.discounted(role.max_discount_bps),
            ),
            (PriceBasis::Floor, item.floor),
            (
                PriceBasis::MinimumMargin,
                item.full_cost + role.min_margin_cents,
            ),
        ];
        // First candidate wins ties so an unclamped discount reads as Discounted
        let (basis, unit_net) = candidates
            .into_iter()
            .fold(candidates[0], |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            });

        lines.push(QuoteLine {
            sku: item.sku.clone(),
            quantity: item.quantity,
            role_discount_bps: role.base_discount_bps,
            quantity_discount_bps: quantity_discount,
            unit_net,
            basis,
            line_total: unit_net * item.quantity,
        });
    }

    let subtotal: Money = lines.iter().map(|line| line.line_total).sum();
    let order_discount_bps = config.order_discount(subtotal);
    let order_discount = subtotal.apply_rate(order_discount_bps);
    let net_total = subtotal - order_discount;
    let tax = net_total.apply_rate(config.tax_rate_bps);
    let goods_total = net_total + tax;

    let shipping = match config.shipping.free_from_cents {
        _ if lines.is_empty() => Money::zero(),
        Some(threshold) if goods_total >= threshold => Money::zero(),
        _ => config.shipping.flat_fee_cents,
    };

    let loyalty_points = if role.loyalty_eligible {
        goods_total.euros().max(0) as u64 * config.loyalty.points_per_eur as u64
    } else {
        0
    };

    Ok(QuoteResult {
        role: request.role.clone(),
        lines,
        subtotal,
        order_discount_bps,
        order_discount,
        net_total,
        tax,
        shipping,
        total: goods_total + shipping,
        loyalty_points,
        commission: role.commission_bps.map(|rate| net_total.apply_rate(rate)),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn item(quantity: u32) -> QuoteItem {
        QuoteItem {
            sku: "LIP-01".to_string(),
            quantity,
            uvp_net: Money::from_cents(1000),
            floor: Money::from_cents(300),
            full_cost: Money::from_cents(200),
        }
    }

    fn request(role: &str, items: Vec<QuoteItem>) -> QuoteRequest {
        QuoteRequest {
            role: role.to_string(),
            items,
        }
    }

    #[test]
    fn test_stand_quantity_discount_stacks() {
        let config = PricingConfig::default();
        let quote = build_quote(&request("Stand", vec![item(12)]), &config).unwrap();

        // 10.00 × 0.80 × 0.95
        let line = &quote.lines[0];
        assert_eq!(line.quantity_discount_bps.bps(), 500);
        assert_eq!(line.unit_net.cents(), 760);
        assert_eq!(line.basis, PriceBasis::Discounted);
        assert_eq!(quote.subtotal.cents(), 9120);
        assert_eq!(quote.order_discount, Money::zero());
        assert_eq!(quote.tax.cents(), 1733);
        assert_eq!(quote.shipping, Money::zero());
        assert_eq!(quote.total.cents(), 10_853);
        assert_eq!(quote.loyalty_points, 0);
        assert_eq!(quote.commission, None);
    }

    #[test]
    fn test_dealer_clamped_by_floor() {
        let mut config = PricingConfig::default();
        let mut line_item = item(50);
        line_item.floor = Money::from_cents(650);
        config.order_discounts.clear();

        let quote = build_quote(&request("dealer", vec![line_item]), &config).unwrap();
        // 10.00 × 0.70 × 0.88 = 6.16, cap 6.00, floor 6.50 wins
        assert_eq!(quote.lines[0].unit_net.cents(), 650);
        assert_eq!(quote.lines[0].basis, PriceBasis::Floor);
    }

    #[test]
    fn test_minimum_margin_clamp() {
        let config = PricingConfig::default();
        let mut line_item = item(1);
        line_item.full_cost = Money::from_cents(900);
        let quote = build_quote(&request("Wholesale", vec![line_item]), &config).unwrap();
        // 9.00 + 0.80 minimum margin
        assert_eq!(quote.lines[0].unit_net.cents(), 980);
        assert_eq!(quote.lines[0].basis, PriceBasis::MinimumMargin);
    }

    #[test]
    fn test_exempt_role_ignores_quantity_brackets() {
        let config = PricingConfig::default();
        let quote = build_quote(&request("Wholesale", vec![item(60)]), &config).unwrap();
        assert_eq!(quote.lines[0].quantity_discount_bps, Rate::zero());
        // 40% off; the 50% cap at 5.00 does not bind
        assert_eq!(quote.lines[0].unit_net.cents(), 600);
    }

    #[test]
    fn test_order_discount_and_commission() {
        let config = PricingConfig::default();
        let mut line_item = item(30);
        line_item.uvp_net = Money::from_cents(1000);
        let quote = build_quote(&request("Ambassador", vec![line_item]), &config).unwrap();

        // 10.00 × 0.90 = 9.00 (exempt from quantity), cap 8.50
        assert_eq!(quote.lines[0].unit_net.cents(), 900);
        assert_eq!(quote.subtotal.cents(), 27_000);
        // €250 bracket: 2%
        assert_eq!(quote.order_discount_bps.bps(), 200);
        assert_eq!(quote.order_discount.cents(), 540);
        assert_eq!(quote.net_total.cents(), 26_460);
        assert_eq!(quote.commission, Some(Money::from_cents(2646)));
        // 264.60 + 19% = 314.87 → 314 points
        assert_eq!(quote.tax.cents(), 5027);
        assert_eq!(quote.loyalty_points, 314);
    }

    #[test]
    fn test_shipping_charged_below_threshold() {
        let config = PricingConfig::default();
        let quote = build_quote(&request("Consumer", vec![item(1)]), &config).unwrap();
        // 10.00 + 1.90 tax < 50.00
        assert_eq!(quote.shipping.cents(), 490);
        assert_eq!(quote.total.cents(), 1190 + 490);
        assert_eq!(quote.loyalty_points, 11);
    }

    #[test]
    fn test_empty_order() {
        let config = PricingConfig::default();
        let quote = build_quote(&request("Consumer", Vec::new()), &config).unwrap();
        assert_eq!(quote.total, Money::zero());
        assert_eq!(quote.shipping, Money::zero());
    }

    #[test]
    fn test_unknown_role_and_bad_quantity() {
        let config = PricingConfig::default();
        assert!(matches!(
            build_quote(&request("Reseller", vec![item(1)]), &config),
            Err(CoreError::UnknownRole(_))
        ));
        assert!(matches!(
            build_quote(&request("Stand", vec![item(0)]), &config),
            Err(CoreError::Validation(_))
        ));
    }
}
