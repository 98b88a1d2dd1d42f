//! Property tests across the calculators.

use std::collections::BTreeMap;

use proptest::prelude::*;

use crate::autotune::{advise, AutotuneAction};
use crate::config::{ChannelConfig, ChannelKind, PricingConfig, ReferralTier};
use crate::cost::calculate_costs;
use crate::guardrail::{ChannelGuardrail, FeeResolution, Guardrail, GuardrailSolver};
use crate::money::Money;
use crate::quote::{build_quote, QuoteItem, QuoteRequest};
use crate::types::{ProductDescription, Rate};
use crate::uvp::calculate_uvp;
use crate::MAX_TIER_ITERATIONS;

fn line_name() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("Basic"), Just("Premium"), Just("Gift Set")]
}

fn role_name() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("Consumer"),
        Just("Stand"),
        Just("Dealer"),
        Just("Wholesale"),
        Just("Ambassador"),
    ]
}

fn flat_guardrail(rounded: i64) -> ChannelGuardrail {
    ChannelGuardrail {
        channel: "Market".to_string(),
        guardrail: Guardrail::Computed {
            net: Money::zero(),
            gross: Money::from_cents(rounded),
            rounded: Money::from_cents(rounded),
        },
        resolution: FeeResolution::Flat,
        referral_bps: Rate::zero(),
        min_referral_fee_applied: false,
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    /// Full cost is non-negative and the floor is full cost × multiplier.
    #[test]
    fn full_cost_and_floor_identity(
        line in line_name(),
        factory in 0i64..100_000,
        packaging in 0i64..5_000,
        marketing in 0i64..5_000,
    ) {
        let config = PricingConfig::default();
        let product = ProductDescription {
            packaging_cents: Money::from_cents(packaging),
            marketing_cents: Money::from_cents(marketing),
            ..ProductDescription::new("SKU-1", line, Money::from_cents(factory))
        };
        let costs = calculate_costs(&product, &config).unwrap();
        let multiplier = config.line(line).unwrap().floor_multiplier_bps as i64;

        prop_assert!(costs.full_cost.cents() >= 0);
        prop_assert_eq!(costs.floor, costs.full_cost.scale_bps(multiplier));
    }

    /// Consumer prices always carry the configured ending.
    #[test]
    fn consumer_price_ends_in_99(
        line in line_name(),
        factory in 0i64..100_000,
        manual in proptest::option::of(1i64..1_000_000),
    ) {
        let config = PricingConfig::default();
        let product = ProductDescription {
            manual_uvp_cents: manual.map(Money::from_cents),
            ..ProductDescription::new("SKU-1", line, Money::from_cents(factory))
        };
        let costs = calculate_costs(&product, &config).unwrap();
        let uvp = calculate_uvp(&product, &costs, &config).unwrap();

        prop_assert_eq!(uvp.rounded.cents() % 100, 99);
        prop_assert!(config.rounding.is_rounded(uvp.rounded));
    }

    /// A quote line never prices below any of its four bounds.
    #[test]
    fn quote_is_maximum_of_floors(
        role in role_name(),
        quantity in 1u32..200,
        uvp_net in 0i64..50_000,
        floor in 0i64..50_000,
        full_cost in 0i64..50_000,
    ) {
        let config = PricingConfig::default();
        let request = QuoteRequest {
            role: role.to_string(),
            items: vec![QuoteItem {
                sku: "SKU-1".to_string(),
                quantity,
                uvp_net: Money::from_cents(uvp_net),
                floor: Money::from_cents(floor),
                full_cost: Money::from_cents(full_cost),
            }],
        };
        let quote = build_quote(&request, &config).unwrap();
        let role_config = config.role(role).unwrap();
        let line = &quote.lines[0];

        let discounted = Money::from_cents(uvp_net)
            .discounted(role_config.base_discount_bps)
            .discounted(line.quantity_discount_bps);
        let cap = Money::from_cents(uvp_net).discounted(role_config.max_discount_bps);
        let minimum = Money::from_cents(full_cost) + role_config.min_margin_cents;

        prop_assert!(line.unit_net >= discounted);
        prop_assert!(line.unit_net >= cap);
        prop_assert!(line.unit_net >= Money::from_cents(floor));
        prop_assert!(line.unit_net >= minimum);
        prop_assert_eq!(line.line_total, line.unit_net * quantity);
    }

    /// Gaps up to the tolerance raise, larger gaps recommend a bundle.
    #[test]
    fn autotune_threshold(price in 100i64..100_000, guardrail in 100i64..200_000) {
        let config = PricingConfig::default();
        let outcome = advise(Money::from_cents(price), &[flat_guardrail(guardrail)], &config);

        if price >= guardrail {
            prop_assert_eq!(outcome.action, AutotuneAction::Ok);
        } else {
            let within = (guardrail - price) as i128 * 10_000 <= 2500 * price as i128;
            if within {
                prop_assert_eq!(outcome.action, AutotuneAction::RaiseUvp);
                prop_assert!(outcome.final_price.cents() >= guardrail);
            } else {
                prop_assert_eq!(outcome.action, AutotuneAction::BundleRecommended);
                prop_assert_eq!(outcome.final_price.cents(), price);
            }
        }
    }

    /// Tiered iteration stays in budget, and a converged guardrail is a fixed point.
    #[test]
    fn tiered_guardrail_terminates(
        full_cost in 0i64..5_000,
        seed in 100i64..20_000,
        low_bps in 0u32..4_000,
        high_bps in 0u32..4_000,
    ) {
        let mut config = PricingConfig::default();
        config.channels = BTreeMap::from([(
            "Market".to_string(),
            ChannelConfig {
                kind: ChannelKind::Marketplace,
                min_referral_fee_cents: Some(Money::from_cents(30)),
                referral_tiers: vec![
                    ReferralTier {
                        up_to_cents: Some(Money::from_cents(1000)),
                        referral_bps: Rate::from_bps(low_bps),
                    },
                    ReferralTier { up_to_cents: None, referral_bps: Rate::from_bps(high_bps) },
                ],
                ..Default::default()
            },
        )]);
        let product = ProductDescription::new("SKU-1", "Basic", Money::from_cents(full_cost));
        let costs = calculate_costs(&product, &config).unwrap();
        let solver = GuardrailSolver::new(&config, "Basic", &costs).unwrap();

        let result = solver.solve_channel("Market", Money::from_cents(seed)).unwrap();
        match result.resolution {
            FeeResolution::Converged { iterations } => {
                prop_assert!(iterations <= MAX_TIER_ITERATIONS);
                if let Guardrail::Computed { gross, .. } = result.guardrail {
                    let again = solver.solve_channel("Market", gross).unwrap();
                    prop_assert_eq!(again.resolution, FeeResolution::Converged { iterations: 1 });
                    prop_assert_eq!(again.guardrail, result.guardrail);
                }
            }
            FeeResolution::Exhausted { iterations, .. } => {
                prop_assert_eq!(iterations, MAX_TIER_ITERATIONS);
            }
            FeeResolution::Flat => prop_assert!(false, "tiered channel solved as flat"),
        }
    }
}
