//! # Autotune Advisor
//!
//! Compares the rounded consumer price against every channel guardrail and
//! decides what to do about the gap.
//!
//! ## State Machine
//! ```text
//!                        ┌──────────────────────┐
//!                        │  price vs max(guard) │
//!                        └──────────┬───────────┘
//!            ┌──────────────────────┼───────────────────────────┐
//!            ▼                      ▼                           ▼
//!     price ≥ all guards    gap ≤ max_raise (25%)     gap > max_raise, or a
//!            │                      │                 channel is infeasible
//!            ▼                      ▼                           ▼
//!          ┌────┐           ┌────────────┐           ┌────────────────────┐
//!          │ OK │           │ RAISE_UVP  │           │ BUNDLE_RECOMMENDED │
//!          └────┘           └────────────┘           └────────────────────┘
//!        unchanged        price = max guard,         price unchanged,
//!                         original recorded          gap recorded
//! ```
//!
//! All three states are terminal.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::PricingConfig;
use crate::guardrail::ChannelGuardrail;
use crate::money::Money;

/// Pricing action taken by the advisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AutotuneAction {
    Ok,
    RaiseUvp,
    BundleRecommended,
}

/// Outcome of the advisor for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AutotuneOutcome {
    pub action: AutotuneAction,

    /// Consumer price after the action.
    pub final_price: Money,

    /// Price before a raise; `None` when unchanged.
    pub original_price: Option<Money>,

    /// Highest feasible guardrail across channels.
    pub max_guardrail: Option<Money>,

    /// Relative increase needed to reach `max_guardrail`.
    /// `None` when no increase is needed or the gap is unbounded.
    pub required_increase_bps: Option<i64>,

    /// At least one channel is infeasible and needs manual pricing.
    pub needs_review: bool,
}

/// Highest rounded guardrail among the feasible channels.
pub fn max_feasible_guardrail(guardrails: &[ChannelGuardrail]) -> Option<Money> {
    guardrails
        .iter()
        .filter_map(|g| g.guardrail.price())
        .max()
}

/// Classifies a rounded consumer price against the channel guardrails.
///
/// ## Example
/// ```rust
/// use margo_core::autotune::{advise, AutotuneAction};
/// use margo_core::config::PricingConfig;
/// use margo_core::money::Money;
///
/// let config = PricingConfig::default();
/// // No channels to clear
/// let outcome = advise(Money::from_cents(1999), &[], &config);
/// assert_eq!(outcome.action, AutotuneAction::Ok);
/// ```
pub fn advise(
    price: Money,
    guardrails: &[ChannelGuardrail],
    config: &PricingConfig,
) -> AutotuneOutcome {
    let max_guardrail = max_feasible_guardrail(guardrails);
    let needs_review = guardrails.iter().any(|g| !g.guardrail.is_feasible());

    let unchanged = |action, required_increase_bps| AutotuneOutcome {
        action,
        final_price: price,
        original_price: None,
        max_guardrail,
        required_increase_bps,
        needs_review,
    };

    if needs_review {
        let gap = max_guardrail
            .filter(|max| *max > price)
            .and_then(|max| price.change_bps_to(max));
        return unchanged(AutotuneAction::BundleRecommended, gap);
    }

    let Some(max) = max_guardrail else {
        return unchanged(AutotuneAction::Ok, None);
    };
    if price >= max {
        return unchanged(AutotuneAction::Ok, None);
    }

    // The rounded bps is only reported; the decision is exact
    let increase = price.change_bps_to(max);
    if !price.increase_within(max, config.autotune.max_raise_bps) {
        return unchanged(AutotuneAction::BundleRecommended, increase);
    }

    AutotuneOutcome {
        action: AutotuneAction::RaiseUvp,
        final_price: config.rounding.apply(max),
        original_price: Some(price),
        max_guardrail,
        required_increase_bps: increase,
        needs_review,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardrail::{FeeResolution, Guardrail};
    use crate::types::Rate;

    fn computed(channel: &str, rounded: i64) -> ChannelGuardrail {
        ChannelGuardrail {
            channel: channel.to_string(),
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

    fn infeasible(channel: &str) -> ChannelGuardrail {
        ChannelGuardrail {
            guardrail: Guardrail::Infeasible { headroom_bps: -100 },
            ..computed(channel, 0)
        }
    }

    #[test]
    fn test_ok_when_price_clears_every_guardrail() {
        let config = PricingConfig::default();
        let guards = [computed("A", 999), computed("B", 1299)];
        let outcome = advise(Money::from_cents(1299), &guards, &config);

        assert_eq!(outcome.action, AutotuneAction::Ok);
        assert_eq!(outcome.final_price.cents(), 1299);
        assert_eq!(outcome.original_price, None);
    }

    #[test]
    fn test_raise_at_exact_boundary() {
        let config = PricingConfig::default();
        let guards = [computed("A", 2500)];
        let outcome = advise(Money::from_cents(2000), &guards, &config);

        // Exactly 25% raises
        assert_eq!(outcome.action, AutotuneAction::RaiseUvp);
        assert_eq!(outcome.required_increase_bps, Some(2500));
        assert_eq!(outcome.original_price, Some(Money::from_cents(2000)));
        assert_eq!(outcome.final_price.cents(), 2599);
    }

    #[test]
    fn test_bundle_just_above_boundary() {
        let config = PricingConfig::default();
        let guards = [computed("A", 2501)];
        let outcome = advise(Money::from_cents(2000), &guards, &config);

        assert_eq!(outcome.action, AutotuneAction::BundleRecommended);
        assert_eq!(outcome.final_price.cents(), 2000);
        assert_eq!(outcome.required_increase_bps, Some(2505));
    }

    #[test]
    fn test_increase_rounding_to_boundary_still_bundles() {
        let config = PricingConfig::default();
        let guards = [computed("A", 6499)];
        let outcome = advise(Money::from_cents(5199), &guards, &config);

        // 13.00 / 51.99 is 25.0048%, reported as 2500 bps
        assert_eq!(outcome.action, AutotuneAction::BundleRecommended);
        assert_eq!(outcome.required_increase_bps, Some(2500));
        assert_eq!(outcome.final_price.cents(), 5199);
        assert_eq!(outcome.original_price, None);
    }

    #[test]
    fn test_raise_uses_highest_guardrail() {
        let config = PricingConfig::default();
        let guards = [computed("A", 1099), computed("B", 1199), computed("C", 899)];
        let outcome = advise(Money::from_cents(999), &guards, &config);

        assert_eq!(outcome.action, AutotuneAction::RaiseUvp);
        assert_eq!(outcome.final_price.cents(), 1199);
        assert_eq!(outcome.max_guardrail, Some(Money::from_cents(1199)));
    }

    #[test]
    fn test_thirty_percent_gap_recommends_bundle() {
        let config = PricingConfig::default();
        let guards = [computed("A", 1300)];
        let outcome = advise(Money::from_cents(1000), &guards, &config);
        assert_eq!(outcome.action, AutotuneAction::BundleRecommended);
        assert_eq!(outcome.required_increase_bps, Some(3000));
    }

    #[test]
    fn test_infeasible_channel_needs_review() {
        let config = PricingConfig::default();
        let guards = [computed("A", 999), infeasible("B")];
        let outcome = advise(Money::from_cents(1999), &guards, &config);

        assert_eq!(outcome.action, AutotuneAction::BundleRecommended);
        assert!(outcome.needs_review);
        assert_eq!(outcome.final_price.cents(), 1999);
        assert_eq!(outcome.max_guardrail, Some(Money::from_cents(999)));
    }

    #[test]
    fn test_custom_tolerance() {
        let mut config = PricingConfig::default();
        config.autotune.max_raise_bps = Rate::from_bps(1000);
        let guards = [computed("A", 1200)];
        let outcome = advise(Money::from_cents(1000), &guards, &config);
        assert_eq!(outcome.action, AutotuneAction::BundleRecommended);
    }
}
