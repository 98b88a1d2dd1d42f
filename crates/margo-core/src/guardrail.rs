//! # Guardrail Solver
//!
//! Computes, per sales channel, the minimum consumer price that still leaves
//! the target post-channel margin.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  fixed     = full cost + box + gift + label fee (+ size-tier fee)       │
//! │  variable  = ads + referral + platform (+ payment) (+ returns, loyalty) │
//! │  headroom  = 1 − variable − target margin                              │
//! │                                                                         │
//! │  guardrail net = fixed ÷ headroom        (headroom ≤ 0 → Infeasible)   │
//! │  guardrail     = round(net × (1 + tax))                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tiered Referral Fees
//! When the referral rate depends on the price, the guardrail depends on
//! itself. The solver iterates from the current UVP:
//!
//! ```text
//! candidate = UVP
//! repeat up to MAX_TIER_ITERATIONS:
//!     rate      = tier(candidate)
//!     guardrail = solve(rate)
//!     guardrail == candidate (to the cent) ──► Converged
//!     candidate = guardrail
//! budget spent ──► Exhausted { diverging } + warning, last iterate returned
//! ```
//!
//! `diverging` is set when a step failed to move closer than the previous one.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;

use crate::config::{ChannelConfig, LineConfig, PricingConfig};
use crate::cost::CostBreakdown;
use crate::error::CoreResult;
use crate::money::{div_round, Money};
use crate::types::{Rate, BPS_SCALE};
use crate::MAX_TIER_ITERATIONS;

// =============================================================================
// Result Types
// =============================================================================

/// Minimum viable price on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Guardrail {
    /// A real price.
    Computed {
        net: Money,
        gross: Money,
        rounded: Money,
    },
    /// Variable fees plus target margin consume the whole price.
    /// Needs manual pricing review.
    Infeasible { headroom_bps: i64 },
}

impl Guardrail {
    /// Rounded tax-inclusive guardrail, `None` when infeasible.
    pub fn price(&self) -> Option<Money> {
        match self {
            Guardrail::Computed { rounded, .. } => Some(*rounded),
            Guardrail::Infeasible { .. } => None,
        }
    }

    pub fn is_feasible(&self) -> bool {
        matches!(self, Guardrail::Computed { .. })
    }

    /// True when `price` clears this guardrail. Never true when infeasible.
    pub fn is_covered_by(&self, price: Money) -> bool {
        self.price().is_some_and(|guardrail| price >= guardrail)
    }
}

/// How the referral rate of the final guardrail was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeeResolution {
    /// Flat referral rate; a single solve.
    Flat,
    /// Successive iterates agreed to the cent, or the tier reached was infeasible.
    Converged { iterations: u32 },
    /// Budget spent without agreement; the last iterate was returned.
    Exhausted { iterations: u32, diverging: bool },
}

impl FeeResolution {
    pub fn is_settled(&self) -> bool {
        !matches!(self, FeeResolution::Exhausted { .. })
    }
}

/// Guardrail of one channel with its audit details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChannelGuardrail {
    pub channel: String,
    pub guardrail: Guardrail,
    pub resolution: FeeResolution,

    /// Referral rate of the returned iterate.
    pub referral_bps: Rate,

    /// The minimum referral fee replaced the percentage fee.
    pub min_referral_fee_applied: bool,
}

/// Contribution of one channel at a given consumer price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChannelMargin {
    pub channel: String,

    /// Tax-inclusive consumer price the breakdown is taken at.
    pub price: Money,
    pub net: Money,
    pub referral_fee: Money,

    /// Advertising, platform, payment, return and loyalty costs.
    pub variable_fees: Money,
    pub fixed_costs: Money,
    pub contribution: Money,
    pub margin_bps: i64,
    pub meets_target: bool,
}

// =============================================================================
// Channel Fees
// =============================================================================

/// Fee structure of one channel for one product line.
struct ChannelFees<'c> {
    channel: &'c ChannelConfig,
    fixed_costs: Money,
    /// Every variable rate except the referral fee.
    base_variable_bps: i64,
    margin_bps: i64,
    referral_override: Option<Rate>,
}

impl ChannelFees<'_> {
    fn referral_for(&self, price: Money) -> Rate {
        self.referral_override.unwrap_or_else(|| self.channel.referral_for(price))
    }

    fn is_tiered(&self) -> bool {
        self.referral_override.is_none() && self.channel.is_tiered()
    }

    /// Percentage referral fee, raised to the channel minimum.
    fn referral_fee(&self, net: Money, referral: Rate) -> Money {
        let fee = net.apply_rate(referral);
        match self.channel.min_referral_fee_cents {
            Some(min_fee) if !referral.is_zero() && fee < min_fee => min_fee,
            _ => fee,
        }
    }
}

struct Solved {
    guardrail: Guardrail,
    min_fee_applied: bool,
}

// =============================================================================
// Solver
// =============================================================================

/// Solves guardrails for one sellable unit (a product or a bundle).
pub struct GuardrailSolver<'a> {
    config: &'a PricingConfig,
    line_name: &'a str,
    line: &'a LineConfig,
    costs: &'a CostBreakdown,
}

impl<'a> GuardrailSolver<'a> {
    /// Creates a solver for a unit of `line_name` with the given costs.
    pub fn new(
        config: &'a PricingConfig,
        line_name: &'a str,
        costs: &'a CostBreakdown,
    ) -> CoreResult<Self> {
        let line = config.line(line_name)?;
        Ok(GuardrailSolver {
            config,
            line_name,
            line,
            costs,
        })
    }

    fn fees(&self, channel: &'a ChannelConfig) -> CoreResult<ChannelFees<'a>> {
        let costs = self.costs;
        let mut fixed_costs =
            costs.full_cost + costs.box_cost + costs.gift_cost + channel.label_fee_cents;
        if channel.marketplace_fulfillment {
            fixed_costs += self.config.size_tier_fee(&costs.size_tier)?;
        }

        let line_override = channel.line_override(self.line_name);
        let advertising = line_override
            .and_then(|o| o.advertising_bps)
            .or(channel.advertising_bps)
            .unwrap_or(self.line.advertising_bps);

        let mut base_variable_bps = advertising.bps() as i64 + channel.platform_bps.bps() as i64;
        if channel.applies_payment_fee {
            base_variable_bps += self.config.costs.payment_fee_bps.bps() as i64;
        }
        if channel.carries_returns() {
            base_variable_bps += self.config.costs.return_rate_bps.bps() as i64;
        }
        if channel.carries_loyalty() {
            base_variable_bps += self.config.loyalty.cost_rate().bps() as i64;
        }

        let margin = channel
            .margin_bps
            .unwrap_or(self.config.costs.channel_margin_bps);

        Ok(ChannelFees {
            channel,
            fixed_costs,
            base_variable_bps,
            margin_bps: margin.bps() as i64,
            referral_override: line_override.and_then(|o| o.referral_bps),
        })
    }

    /// One closed-form solve at a fixed referral rate.
    fn solve_at(&self, fees: &ChannelFees<'_>, referral: Rate) -> Solved {
        let headroom = BPS_SCALE - fees.base_variable_bps - referral.bps() as i64 - fees.margin_bps;
        let Some(mut net) = fees.fixed_costs.gross_up(headroom) else {
            return Solved {
                guardrail: Guardrail::Infeasible {
                    headroom_bps: headroom,
                },
                min_fee_applied: false,
            };
        };

        // Below the minimum fee the referral behaves like a fixed cost
        let mut min_fee_applied = false;
        if let Some(min_fee) = fees.channel.min_referral_fee_cents {
            if !referral.is_zero() && net.apply_rate(referral) < min_fee {
                let without_referral = headroom + referral.bps() as i64;
                if let Some(adjusted) = (fees.fixed_costs + min_fee).gross_up(without_referral) {
                    net = adjusted;
                    min_fee_applied = true;
                }
            }
        }

        let gross = net.with_tax(self.config.tax_rate_bps);
        Solved {
            guardrail: Guardrail::Computed {
                net,
                gross,
                rounded: self.config.rounding.apply(gross),
            },
            min_fee_applied,
        }
    }

    /// Guardrail of a single channel. `seed` is the current tax-inclusive price
    /// and starts the tiered-fee iteration.
    ///
    /// ## Errors
    /// `UnknownChannel`, or `UnknownSizeTier` for marketplace fulfillment.
    pub fn solve_channel(&self, name: &str, seed: Money) -> CoreResult<ChannelGuardrail> {
        let (key, channel) = self.config.channel(name)?;
        let fees = self.fees(channel)?;

        if !fees.is_tiered() {
            let referral = fees.referral_for(seed);
            let solved = self.solve_at(&fees, referral);
            return Ok(finish(key, solved, FeeResolution::Flat, referral));
        }

        let mut candidate = seed;
        let mut referral = fees.referral_for(candidate);
        let mut solved = self.solve_at(&fees, referral);
        let mut iteration = 1;
        let mut last_delta: Option<i64> = None;
        let mut diverging = false;

        loop {
            let Guardrail::Computed { gross, .. } = solved.guardrail else {
                return Ok(finish(
                    key,
                    solved,
                    FeeResolution::Converged {
                        iterations: iteration,
                    },
                    referral,
                ));
            };

            let delta = (gross - candidate).cents().abs();
            debug!(
                channel = key,
                iteration,
                candidate = candidate.cents(),
                referral_bps = referral.bps(),
                guardrail = gross.cents(),
                "tiered referral iteration"
            );

            if delta == 0 {
                return Ok(finish(
                    key,
                    solved,
                    FeeResolution::Converged {
                        iterations: iteration,
                    },
                    referral,
                ));
            }
            if last_delta.is_some_and(|previous| delta >= previous) {
                diverging = true;
            }
            last_delta = Some(delta);

            if iteration >= MAX_TIER_ITERATIONS {
                break;
            }
            candidate = gross;
            referral = fees.referral_for(candidate);
            solved = self.solve_at(&fees, referral);
            iteration += 1;
        }

        warn!(
            channel = key,
            iterations = iteration,
            diverging,
            last_delta_cents = last_delta.unwrap_or_default(),
            "tiered referral fee did not converge, using last iterate"
        );
        Ok(finish(
            key,
            solved,
            FeeResolution::Exhausted {
                iterations: iteration,
                diverging,
            },
            referral,
        ))
    }

    /// Guardrails of every configured channel, in channel-key order.
    pub fn solve_all(&self, seed: Money) -> CoreResult<Vec<ChannelGuardrail>> {
        self.config
            .channels
            .keys()
            .map(|name| self.solve_channel(name, seed))
            .collect()
    }

    /// Contribution breakdown of one channel at a tax-inclusive price.
    pub fn margin_at(&self, name: &str, price: Money) -> CoreResult<ChannelMargin> {
        let (key, channel) = self.config.channel(name)?;
        let fees = self.fees(channel)?;

        let net = price.without_tax(self.config.tax_rate_bps);
        let referral_fee = fees.referral_fee(net, fees.referral_for(price));
        let variable_fees = net.scale_bps(fees.base_variable_bps);
        let contribution = net - referral_fee - variable_fees - fees.fixed_costs;
        let margin_bps = if net.is_positive() {
            div_round(
                contribution.cents() as i128 * BPS_SCALE as i128,
                net.cents() as i128,
            )
        } else {
            0
        };

        Ok(ChannelMargin {
            channel: key.to_string(),
            price,
            net,
            referral_fee,
            variable_fees,
            fixed_costs: fees.fixed_costs,
            contribution,
            margin_bps,
            meets_target: margin_bps >= fees.margin_bps,
        })
    }

    /// Breakdowns for every configured channel.
    pub fn margins_at(&self, price: Money) -> CoreResult<Vec<ChannelMargin>> {
        self.config
            .channels
            .keys()
            .map(|name| self.margin_at(name, price))
            .collect()
    }
}

fn finish(
    key: &str,
    solved: Solved,
    resolution: FeeResolution,
    referral: Rate,
) -> ChannelGuardrail {
    if let Guardrail::Infeasible { headroom_bps } = solved.guardrail {
        warn!(
            channel = key,
            headroom = headroom_bps,
            "guardrail infeasible, manual pricing review needed"
        );
    }
    ChannelGuardrail {
        channel: key.to_string(),
        guardrail: solved.guardrail,
        resolution,
        referral_bps: referral,
        min_referral_fee_applied: solved.min_fee_applied,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
