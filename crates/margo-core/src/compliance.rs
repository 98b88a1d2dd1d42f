//! # Compliance Checks
//!
//! Post-pricing checks consumed by the admin surfaces: minimum advertised
//! price, margin floor, and guardrails that need a human.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::PricingConfig;
use crate::engine::PricingResult;
use crate::error::CoreResult;
use crate::guardrail::{FeeResolution, Guardrail};
use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Violation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingKind {
    /// Final price undercuts the line's minimum advertised price.
    BelowMinimumAdvertisedPrice { minimum: Money, price: Money },
    /// Tax-exclusive final price is below the floor.
    BelowFloor { net: Money, floor: Money },
    /// No guardrail could be computed for the channel.
    GuardrailInfeasible { channel: String, headroom_bps: i64 },
    /// The tiered referral fee was still moving when the budget ran out.
    FeeNotConverged { channel: String, diverging: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ComplianceFinding {
    pub sku: String,
    pub severity: Severity,
    pub finding: FindingKind,
}

/// Checks a priced product. Findings are ordered violations first.
///
/// ## Errors
/// `UnknownProductLine` when the result's line is not configured.
pub fn check_compliance(
    result: &PricingResult,
    config: &PricingConfig,
) -> CoreResult<Vec<ComplianceFinding>> {
    let line = config.line(&result.product_line)?;
    let mut findings = Vec::new();
    let mut push = |severity, finding| {
        findings.push(ComplianceFinding {
            sku: result.sku.clone(),
            severity,
            finding,
        })
    };

    if let Some(minimum) = line.min_advertised_price_cents {
        if result.final_price < minimum {
            push(
                Severity::Violation,
                FindingKind::BelowMinimumAdvertisedPrice {
                    minimum,
                    price: result.final_price,
                },
            );
        }
    }

    let net: Money = result.final_price.without_tax(config.tax_rate_bps);
    if net < result.costs.floor {
        push(
            Severity::Violation,
            FindingKind::BelowFloor {
                net,
                floor: result.costs.floor,
            },
        );
    }

    for channel in &result.guardrails {
        if let Guardrail::Infeasible { headroom_bps } = channel.guardrail {
            push(
                Severity::Warning,
                FindingKind::GuardrailInfeasible {
                    channel: channel.channel.clone(),
                    headroom_bps,
                },
            );
        }
        if let FeeResolution::Exhausted { diverging, .. } = channel.resolution {
            push(
                Severity::Warning,
                FindingKind::FeeNotConverged {
                    channel: channel.channel.clone(),
                    diverging,
                },
            );
        }
    }

    findings.sort_by_key(|f| std::cmp::Reverse(f.severity));
    Ok(findings)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PricingEngine;
    use crate::types::{ProductDescription, Rate};

    #[test]
    fn test_clean_product_has_no_findings() {
        let config = PricingConfig::default();
        let engine = PricingEngine::new(&config);
        let product = ProductDescription {
            manual_uvp_cents: Some(Money::from_cents(11_999)),
            ..ProductDescription::new("OIL-01", "Premium", Money::from_cents(3000))
        };
        let result = engine.price(&product).unwrap();
        assert!(check_compliance(&result, &config).unwrap().is_empty());
    }

    #[test]
    fn test_below_floor_and_minimum_advertised_price() {
        let mut config = PricingConfig::default();
        config.lines.get_mut("Premium").unwrap().min_advertised_price_cents =
            Some(Money::from_cents(9999));
        let engine = PricingEngine::new(&config);
        // UVP €81.99 is €68.90 net, under the €77.25 floor
        let product = ProductDescription::new("OIL-01", "Premium", Money::from_cents(3000));
        let result = engine.price(&product).unwrap();

        let findings = check_compliance(&result, &config).unwrap();
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.severity == Severity::Violation));
        assert!(findings
            .iter()
            .any(|f| matches!(f.finding, FindingKind::BelowFloor { .. })));
        assert!(findings.iter().any(|f| matches!(
            f.finding,
            FindingKind::BelowMinimumAdvertisedPrice { minimum, .. } if minimum.cents() == 9999
        )));
    }

    #[test]
    fn test_infeasible_channel_is_a_warning() {
        let mut config = PricingConfig::default();
        config.channels.get_mut("Amazon_FBM").unwrap().platform_bps = Rate::from_bps(6000);
        let engine = PricingEngine::new(&config);
        let product = ProductDescription {
            manual_uvp_cents: Some(Money::from_cents(11_999)),
            ..ProductDescription::new("OIL-01", "Premium", Money::from_cents(3000))
        };
        let result = engine.price(&product).unwrap();

        let findings = check_compliance(&result, &config).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert!(matches!(
            &findings[0].finding,
            FindingKind::GuardrailInfeasible { channel, .. } if channel == "Amazon_FBM"
        ));
    }
}
