//! # Bundle Optimizer
//!
//! Searches multi-unit packs when a single unit cannot clear every channel
//! guardrail within the autotune tolerance.
//!
//! ## Search
//! ```text
//! for N in min_units..=max_units            (odd N skipped when prefer_even,
//!     │                                      except N == max_units)
//!     ├── scale per-unit costs × N, drop gift and manual price
//!     ├── classify box size / size tier from N
//!     ├── solve guardrails, seeded with single UVP × N
//!     ├── price = first ladder step ≥ max feasible guardrail
//!     │          (ladder exhausted → ceiling to whole euro)
//!     ├── coverage per channel: price ≥ guardrail
//!     └── all channels covered ──► stop
//!
//! sort: full coverage ▸ channels covered ↓ ▸ price ↑ ▸ units ↑
//! ```

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::autotune::max_feasible_guardrail;
use crate::config::{BundlingSettings, PricingConfig};
use crate::cost::{
    box_size_for_units, calculate_costs, size_tier_for_units, unit_factory_cost, CostBreakdown,
};
use crate::error::CoreResult;
use crate::guardrail::{
    ChannelGuardrail, ChannelMargin, FeeResolution, Guardrail, GuardrailSolver,
};
use crate::money::Money;
use crate::types::{Grundpreis, ProductDescription};

/// Coverage of one channel by a bundle price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChannelCoverage {
    pub channel: String,
    pub guardrail: Guardrail,
    pub resolution: FeeResolution,
    pub covered: bool,
}

/// One evaluated bundle size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BundleProposal {
    pub units: u32,

    /// Tax-inclusive bundle price.
    pub price: Money,

    /// Price was taken from the ladder rather than the ceiling fallback.
    pub on_ladder: bool,

    pub coverage: Vec<ChannelCoverage>,
    pub covered_count: u32,
    pub all_covered: bool,

    /// Costs of the whole bundle.
    pub costs: CostBreakdown,

    /// Per-channel contribution at `price`.
    pub margins: Vec<ChannelMargin>,

    /// Single-unit guardrails the bundle is compared against.
    pub single_unit_guardrails: Vec<ChannelGuardrail>,

    pub grundpreis: Option<Grundpreis>,
}

// =============================================================================
// Search Helpers
// =============================================================================

/// Bundle sizes the search evaluates, in order.
pub fn candidate_sizes(settings: &BundlingSettings) -> Vec<u32> {
    (settings.min_units..=settings.max_units)
        .filter(|n| !settings.prefer_even || n % 2 == 0 || *n == settings.max_units)
        .collect()
}

/// First ladder price at or above `target`; past the top of the ladder,
/// `target` rounded up to a whole `unit_cents`.
///
/// Returns the price and whether it came from the ladder.
pub fn ladder_price(target: Money, ladder: &[Money], unit_cents: i64) -> (Money, bool) {
    match ladder.iter().find(|step| **step >= target) {
        Some(step) => (*step, true),
        None => (target.ceil_to(unit_cents), false),
    }
}

/// The product scaled to a pack of `units`.
///
/// Every per-unit cost is multiplied; the pack carries no gift and no manual
/// price, and its box size and size tier follow from the unit count.
pub fn bundle_product(product: &ProductDescription, units: u32) -> ProductDescription {
    ProductDescription {
        sku: format!("{}-x{}", product.sku, units),
        product_line: product.product_line.clone(),
        factory_cost_cents: Some(unit_factory_cost(product) * units),
        carton_cost_cents: None,
        units_per_carton: None,
        inbound_shipping_cents: product.inbound_shipping_cents * units,
        compliance_cents: product.compliance_cents * units,
        packaging_cents: product.packaging_cents * units,
        qc_cents: product.qc_cents * units,
        operations_cents: product.operations_cents * units,
        marketing_cents: product.marketing_cents * units,
        net_content: product.net_content.map(|content| content.times(units)),
        gift: None,
        box_size: Some(box_size_for_units(units).to_string()),
        size_tier: Some(size_tier_for_units(units).to_string()),
        manual_uvp_cents: None,
        order_type: product.order_type,
    }
}

/// Sorts proposals: full coverage first, then more channels covered, then
/// lower price, then fewer units.
pub fn sort_proposals(proposals: &mut [BundleProposal]) {
    proposals.sort_by_key(|p| (!p.all_covered, Reverse(p.covered_count), p.price, p.units));
}

// =============================================================================
// Optimizer
// =============================================================================

/// Evaluates a single bundle size.
pub fn evaluate_bundle(
    product: &ProductDescription,
    units: u32,
    single_price: Money,
    single_guardrails: &[ChannelGuardrail],
    config: &PricingConfig,
) -> CoreResult<BundleProposal> {
    let bundle = bundle_product(product, units);
    let costs = calculate_costs(&bundle, config)?;
    let solver = GuardrailSolver::new(config, &bundle.product_line, &costs)?;
    let guardrails = solver.solve_all(single_price * units)?;

    let (price, on_ladder) = match max_feasible_guardrail(&guardrails) {
        Some(max) => ladder_price(
            max,
            &config.bundling.price_ladder_cents,
            config.rounding.unit_cents,
        ),
        None => match config.bundling.price_ladder_cents.first() {
            Some(first) => (*first, true),
            None => (Money::zero(), false),
        },
    };

    let coverage: Vec<ChannelCoverage> = guardrails
        .into_iter()
        .map(|g| ChannelCoverage {
            covered: g.guardrail.is_covered_by(price),
            channel: g.channel,
            guardrail: g.guardrail,
            resolution: g.resolution,
        })
        .collect();
    let covered_count = coverage.iter().filter(|c| c.covered).count() as u32;
    let all_covered = covered_count as usize == coverage.len();

    debug!(
        sku = %product.sku,
        units,
        price = price.cents(),
        covered_count,
        all_covered,
        "bundle size evaluated"
    );

    Ok(BundleProposal {
        units,
        price,
        on_ladder,
        covered_count,
        all_covered,
        margins: solver.margins_at(price)?,
        grundpreis: bundle
            .net_content
            .and_then(|content| Grundpreis::compute(price, &content)),
        coverage,
        costs,
        single_unit_guardrails: single_guardrails.to_vec(),
    })
}

/// Searches bundle sizes and returns every evaluated proposal, best first.
///
/// The search stops at the first size that covers every channel.
pub fn optimize_bundles(
    product: &ProductDescription,
    single_price: Money,
    single_guardrails: &[ChannelGuardrail],
    config: &PricingConfig,
) -> CoreResult<Vec<BundleProposal>> {
    let mut proposals = Vec::new();
    for units in candidate_sizes(&config.bundling) {
        let proposal = evaluate_bundle(product, units, single_price, single_guardrails, config)?;
        let done = proposal.all_covered;
        proposals.push(proposal);
        if done {
            break;
        }
    }
    sort_proposals(&mut proposals);
    Ok(proposals)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelConfig, ChannelKind, ReferralTier};
    use crate::types::{ContentUnit, NetContent, Rate};
    use std::collections::BTreeMap;

    /// One marketplace with a €4.00 label fee, free boxes, 20% margin.
    fn label_heavy_config(referral_tiers: Vec<ReferralTier>) -> PricingConfig {
        let mut config = PricingConfig::default();
        config.costs.fx_buffer_bps = Rate::zero();
        config.costs.channel_margin_bps = Rate::from_bps(2000);
        for line in config.lines.values_mut() {
            line.advertising_bps = Rate::zero();
        }
        for cost in config.boxes.values_mut() {
            *cost = Money::zero();
        }
        config.channels = BTreeMap::from([(
            "Market".to_string(),
            ChannelConfig {
                kind: ChannelKind::Marketplace,
                referral_bps: Rate::from_bps(1500),
                label_fee_cents: Money::from_cents(400),
                referral_tiers,
                ..Default::default()
            },
        )]);
        config
    }

    fn single_guardrails(
        product: &ProductDescription,
        seed: Money,
        config: &PricingConfig,
    ) -> Vec<ChannelGuardrail> {
        let costs = calculate_costs(product, config).unwrap();
        GuardrailSolver::new(config, &product.product_line, &costs)
            .unwrap()
            .solve_all(seed)
            .unwrap()
    }

    #[test]
    fn test_candidate_sizes() {
        let mut settings = BundlingSettings::default();
        assert_eq!(candidate_sizes(&settings), vec![2, 4, 6]);

        settings.max_units = 5;
        assert_eq!(candidate_sizes(&settings), vec![2, 4, 5]);

        settings.prefer_even = false;
        assert_eq!(candidate_sizes(&settings), vec![2, 3, 4, 5]);

        // An odd max is always a candidate
        settings.prefer_even = true;
        settings.min_units = 3;
        settings.max_units = 3;
        assert_eq!(candidate_sizes(&settings), vec![3]);
    }

    #[test]
    fn test_ladder_price() {
        let ladder = BundlingSettings::default().price_ladder_cents;
        let price = |cents| ladder_price(Money::from_cents(cents), &ladder, 100);

        assert_eq!(price(1199), (Money::from_cents(1499), true));
        assert_eq!(price(1499), (Money::from_cents(1499), true));
        // Past the top rung: ceiling to the next whole euro
        assert_eq!(price(15_050), (Money::from_cents(15_100), false));
    }

    #[test]
    fn test_bundle_product_scaling() {
        let product = ProductDescription {
            packaging_cents: Money::from_cents(12),
            net_content: Some(NetContent { amount: 50, unit: ContentUnit::Ml }),
            gift: Some(Default::default()),
            manual_uvp_cents: Some(Money::from_cents(999)),
            ..ProductDescription::new("OIL-01", "Basic", Money::from_cents(100))
        };
        let bundle = bundle_product(&product, 4);

        assert_eq!(bundle.factory_cost_cents, Some(Money::from_cents(400)));
        assert_eq!(bundle.packaging_cents.cents(), 48);
        assert_eq!(bundle.net_content, Some(NetContent { amount: 200, unit: ContentUnit::Ml }));
        assert!(bundle.gift.is_none());
        assert!(bundle.manual_uvp_cents.is_none());
        assert_eq!(bundle.box_size.as_deref(), Some("L"));
        assert_eq!(bundle.size_tier.as_deref(), Some("large_standard"));
    }

    #[test]
    fn test_first_covering_size_wins_and_stops() {
        let config = label_heavy_config(Vec::new());
        let product = ProductDescription::new("LIP-01", "Basic", Money::from_cents(100));
        let single_price = Money::from_cents(299);
        let singles = single_guardrails(&product, single_price, &config);

        let proposals = optimize_bundles(&product, single_price, &singles, &config).unwrap();

        // 2 units: (2.00 + 4.00) / 0.65 = 9.23 net, 10.98 gross → 11.99 → ladder 14.99
        assert_eq!(proposals.len(), 1);
        let best = &proposals[0];
        assert_eq!(best.units, 2);
        assert_eq!(best.price.cents(), 1499);
        assert!(best.all_covered);
        assert_eq!(best.single_unit_guardrails, singles);
        assert_eq!(best.margins.len(), 1);
        assert!(best.margins[0].meets_target);
    }

    #[test]
    fn test_infeasible_low_tier_pushes_search_to_larger_sizes() {
        // 90% referral below €10 is infeasible; the seed crosses €10 at 4 units
        let config = label_heavy_config(vec![
            ReferralTier {
                up_to_cents: Some(Money::from_cents(1000)),
                referral_bps: Rate::from_bps(9000),
            },
            ReferralTier {
                up_to_cents: None,
                referral_bps: Rate::from_bps(1500),
            },
        ]);
        let product = ProductDescription::new("LIP-01", "Basic", Money::from_cents(100));
        let single_price = Money::from_cents(299);
        let singles = single_guardrails(&product, single_price, &config);
        assert!(!singles[0].guardrail.is_feasible());

        let proposals = optimize_bundles(&product, single_price, &singles, &config).unwrap();
        let units: Vec<u32> = proposals.iter().map(|p| p.units).collect();

        // 6 is never evaluated
        assert_eq!(units, vec![4, 2]);
        assert!(proposals[0].all_covered);
        assert_eq!(proposals[0].price.cents(), 1499);
        assert_eq!(proposals[1].covered_count, 0);
        assert_eq!(proposals[1].price.cents(), 999);
    }

    #[test]
    fn test_bundle_grundpreis() {
        let config = label_heavy_config(Vec::new());
        let product = ProductDescription {
            net_content: Some(NetContent { amount: 250, unit: ContentUnit::Ml }),
            ..ProductDescription::new("OIL-01", "Basic", Money::from_cents(100))
        };
        let proposal = evaluate_bundle(&product, 2, Money::from_cents(299), &[], &config).unwrap();
        // €14.99 for 500 ml
        let gp = proposal.grundpreis.unwrap();
        assert_eq!(gp.price_per_base.cents(), 2998);
    }

    #[test]
    fn test_sort_order() {
        let config = label_heavy_config(Vec::new());
        let product = ProductDescription::new("LIP-01", "Basic", Money::from_cents(100));
        let template = evaluate_bundle(&product, 2, Money::from_cents(299), &[], &config).unwrap();

        let make = |units: u32, price: i64, covered_count: u32, all_covered: bool| BundleProposal {
            units,
            price: Money::from_cents(price),
            covered_count,
            all_covered,
            ..template.clone()
        };

        let mut proposals = vec![
            make(6, 2999, 2, false),
            make(4, 1999, 3, true),
            make(2, 999, 1, false),
            make(3, 1999, 3, true),
            make(5, 1499, 3, true),
        ];
        sort_proposals(&mut proposals);

        let order: Vec<u32> = proposals.iter().map(|p| p.units).collect();
        assert_eq!(order, vec![5, 3, 4, 6, 2]);
    }
}
