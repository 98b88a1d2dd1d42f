//! # Pricing Engine
//!
//! Runs the full pricing flow for one product, a catalog, or a quote.
//!
//! ## Data Flow
//! ```text
//! ProductDescription
//!        │ validate
//!        ▼
//!   CostCalculator ──► UVPCalculator ──► GuardrailSolver (seed = UVP)
//!                                               │
//!                                               ▼
//!                                        AutotuneAdvisor
//!                                               │ BUNDLE_RECOMMENDED
//!                                               ▼
//!                                        BundleOptimizer
//!                                               │
//!                                               ▼
//!                                        PricingResult
//! ```
//!
//! The engine borrows the configuration and holds nothing else, so one engine
//! can be shared across threads.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;

use crate::autotune::{advise, AutotuneAction, AutotuneOutcome};
use crate::bundle::{optimize_bundles, BundleProposal};
use crate::config::PricingConfig;
use crate::cost::{calculate_costs, CostBreakdown};
use crate::error::CoreResult;
use crate::guardrail::{ChannelGuardrail, ChannelMargin, GuardrailSolver};
use crate::money::Money;
use crate::quote::{build_quote, QuoteItem, QuoteRequest, QuoteResult};
use crate::types::{Grundpreis, ProductDescription};
use crate::uvp::{calculate_uvp, PriceVsFloor, UvpResult};
use crate::validation::validate_product;

// =============================================================================
// Results
// =============================================================================

/// Everything computed for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingResult {
    pub sku: String,
    pub product_line: String,
    pub costs: CostBreakdown,
    pub uvp: UvpResult,
    pub guardrails: Vec<ChannelGuardrail>,
    pub autotune: AutotuneOutcome,

    /// Consumer price after autotune.
    pub final_price: Money,

    /// Grundpreis of `final_price`, when net content is known.
    pub grundpreis: Option<Grundpreis>,

    /// Evaluated bundles, best first. Empty unless bundling was recommended.
    pub bundles: Vec<BundleProposal>,
}

impl PricingResult {
    pub fn price_vs_floor(&self) -> PriceVsFloor {
        self.uvp.price_vs_floor
    }

    /// The best bundle, if it covers every channel.
    pub fn recommended_bundle(&self) -> Option<&BundleProposal> {
        self.bundles.first().filter(|bundle| bundle.all_covered)
    }

    /// Channels whose guardrail could not be computed.
    pub fn infeasible_channels(&self) -> impl Iterator<Item = &str> {
        self.guardrails
            .iter()
            .filter(|g| !g.guardrail.is_feasible())
            .map(|g| g.channel.as_str())
    }
}

/// Outcome of one product in a catalog batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CatalogOutcome {
    Priced { result: Box<PricingResult> },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogEntry {
    pub sku: String,
    pub outcome: CatalogOutcome,
}

impl CatalogEntry {
    pub fn result(&self) -> Option<&PricingResult> {
        match &self.outcome {
            CatalogOutcome::Priced { result } => Some(result),
            CatalogOutcome::Failed { .. } => None,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Entry point for every pricing computation.
///
/// ## Example
/// ```rust
/// use margo_core::config::PricingConfig;
/// use margo_core::engine::PricingEngine;
/// use margo_core::money::Money;
/// use margo_core::types::ProductDescription;
///
/// let config = PricingConfig::default();
/// let engine = PricingEngine::new(&config);
///
/// let product = ProductDescription::new("OIL-01", "Premium", Money::from_cents(3000));
/// let guardrail = engine.guardrail_for(&product, "Shopify").unwrap();
/// assert!(guardrail.guardrail.is_feasible());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PricingEngine<'a> {
    config: &'a PricingConfig,
}

impl<'a> PricingEngine<'a> {
    pub fn new(config: &'a PricingConfig) -> Self {
        PricingEngine { config }
    }

    pub fn config(&self) -> &'a PricingConfig {
        self.config
    }

    /// Prices one product end to end.
    ///
    /// ## Errors
    /// Validation errors and configuration mismatches (unknown line, box size
    /// or size tier). Infeasible channels and unsettled tiered fees are part
    /// of the result instead.
    pub fn price(&self, product: &ProductDescription) -> CoreResult<PricingResult> {
        let config = self.config;
        validate_product(product)?;

        let costs = calculate_costs(product, config)?;
        let uvp = calculate_uvp(product, &costs, config)?;
        let guardrails =
            GuardrailSolver::new(config, &product.product_line, &costs)?.solve_all(uvp.rounded)?;

        let autotune = advise(uvp.rounded, &guardrails, config);
        let bundles = if autotune.action == AutotuneAction::BundleRecommended {
            optimize_bundles(product, uvp.rounded, &guardrails, config)?
        } else {
            Vec::new()
        };

        debug!(
            sku = %product.sku,
            uvp = uvp.rounded.cents(),
            final_price = autotune.final_price.cents(),
            action = ?autotune.action,
            bundles = bundles.len(),
            "product priced"
        );

        Ok(PricingResult {
            sku: product.sku.clone(),
            product_line: product.product_line.clone(),
            grundpreis: product
                .net_content
                .and_then(|content| Grundpreis::compute(autotune.final_price, &content)),
            final_price: autotune.final_price,
            costs,
            uvp,
            guardrails,
            autotune,
            bundles,
        })
    }

    /// Guardrail of one channel, seeded with the product's UVP.
    pub fn guardrail_for(
        &self,
        product: &ProductDescription,
        channel: &str,
    ) -> CoreResult<ChannelGuardrail> {
        validate_product(product)?;
        let costs = calculate_costs(product, self.config)?;
        let uvp = calculate_uvp(product, &costs, self.config)?;
        GuardrailSolver::new(self.config, &product.product_line, &costs)?
            .solve_channel(channel, uvp.rounded)
    }

    /// Per-channel contribution of a product at a given tax-inclusive price.
    pub fn margins_at(
        &self,
        product: &ProductDescription,
        price: Money,
    ) -> CoreResult<Vec<ChannelMargin>> {
        validate_product(product)?;
        let costs = calculate_costs(product, self.config)?;
        GuardrailSolver::new(self.config, &product.product_line, &costs)?.margins_at(price)
    }

    /// Quote line for a priced product, quoted from its final price.
    pub fn quote_item(&self, result: &PricingResult, quantity: u32) -> QuoteItem {
        QuoteItem {
            sku: result.sku.clone(),
            quantity,
            uvp_net: result.final_price.without_tax(self.config.tax_rate_bps),
            floor: result.costs.floor,
            full_cost: result.costs.full_cost,
        }
    }

    pub fn quote(&self, request: &QuoteRequest) -> CoreResult<QuoteResult> {
        build_quote(request, self.config)
    }

    /// Prices a batch. A failing product is recorded and never stops the batch.
    pub fn price_catalog(&self, products: &[ProductDescription]) -> Vec<CatalogEntry> {
        products
            .iter()
            .map(|product| {
                let outcome = match self.price(product) {
                    Ok(result) => CatalogOutcome::Priced {
                        result: Box::new(result),
                    },
                    Err(err) => {
                        warn!(sku = %product.sku, error = %err, "product pricing failed");
                        CatalogOutcome::Failed {
                            error: err.to_string(),
                        }
                    }
                };
                CatalogEntry {
                    sku: product.sku.clone(),
                    outcome,
                }
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ValidationError};
    use crate::types::{ContentUnit, NetContent};
    use crate::MAX_COST_CENTS;

    #[test]
    fn test_cheap_product_recommends_bundle() {
        let config = PricingConfig::default();
        let engine = PricingEngine::new(&config);
        let product = ProductDescription::new("LIP-01", "Basic", Money::from_cents(80));

        let result = engine.price(&product).unwrap();
        assert_eq!(result.uvp.rounded.cents(), 199);
        assert_eq!(result.autotune.action, AutotuneAction::BundleRecommended);
        assert_eq!(result.final_price.cents(), 199);

        let bundle = result.recommended_bundle().unwrap();
        assert_eq!(bundle.units, 2);
        assert_eq!(result.bundles.len(), 1);
    }

    #[test]
    fn test_premium_product_is_ok() {
        let config = PricingConfig::default();
        let engine = PricingEngine::new(&config);
        let product = ProductDescription::new("OIL-01", "Premium", Money::from_cents(3000));

        let result = engine.price(&product).unwrap();
        assert_eq!(result.uvp.rounded.cents(), 8199);
        assert_eq!(result.autotune.action, AutotuneAction::Ok);
        assert_eq!(result.final_price.cents(), 8199);
        assert!(result.bundles.is_empty());
        assert_eq!(result.guardrails.len(), 3);
        assert_eq!(result.infeasible_channels().count(), 0);
    }

    #[test]
    fn test_manual_price_close_to_guardrail_is_raised() {
        let config = PricingConfig::default();
        let engine = PricingEngine::new(&config);
        let product = ProductDescription {
            manual_uvp_cents: Some(Money::from_cents(6999)),
            net_content: Some(NetContent {
                amount: 100,
                unit: ContentUnit::Ml,
            }),
            ..ProductDescription::new("OIL-01", "Premium", Money::from_cents(3000))
        };

        let result = engine.price(&product).unwrap();
        // Amazon_FBM guardrail is the highest at €77.99
        assert_eq!(result.autotune.action, AutotuneAction::RaiseUvp);
        assert_eq!(result.autotune.original_price, Some(Money::from_cents(6999)));
        assert_eq!(result.final_price.cents(), 7799);
        assert_eq!(result.grundpreis.unwrap().price_per_base.cents(), 77_990);
    }

    #[test]
    fn test_guardrail_for_single_channel() {
        let config = PricingConfig::default();
        let engine = PricingEngine::new(&config);
        let product = ProductDescription::new("OIL-01", "Premium", Money::from_cents(3000));

        let fbm = engine.guardrail_for(&product, "amazon_fbm").unwrap();
        assert_eq!(fbm.channel, "Amazon_FBM");
        assert_eq!(fbm.guardrail.price(), Some(Money::from_cents(7799)));

        assert!(matches!(
            engine.guardrail_for(&product, "Etsy"),
            Err(CoreError::UnknownChannel(_))
        ));
    }

    #[test]
    fn test_negative_cost_is_rejected() {
        let config = PricingConfig::default();
        let engine = PricingEngine::new(&config);
        let product = ProductDescription::new("LIP-01", "Basic", Money::from_cents(-80));
        assert!(matches!(engine.price(&product), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_catalog_isolates_failures() {
        let config = PricingConfig::default();
        let engine = PricingEngine::new(&config);
        let products = vec![
            ProductDescription::new("LIP-01", "Basic", Money::from_cents(80)),
            ProductDescription::new("BAD-01", "Deluxe", Money::from_cents(80)),
            ProductDescription::new("OIL-01", "Premium", Money::from_cents(3000)),
        ];

        let entries = engine.price_catalog(&products);
        assert_eq!(entries.len(), 3);
        assert!(entries[0].result().is_some());
        assert!(matches!(
            &entries[1].outcome,
            CatalogOutcome::Failed { error } if error.contains("Unknown product line")
        ));
        assert!(entries[2].result().is_some());
    }

    #[test]
    fn test_extreme_costs_fail_without_aborting_catalog() {
        let config = PricingConfig::default();
        let engine = PricingEngine::new(&config);
        let huge = ProductDescription {
            packaging_cents: Money::from_cents(i64::MAX / 2),
            ..ProductDescription::new("BIG-01", "Basic", Money::from_cents(i64::MAX / 2))
        };

        assert!(matches!(
            engine.price(&huge),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let products = vec![
            huge,
            ProductDescription::new("LIP-01", "Basic", Money::from_cents(80)),
        ];
        let entries = engine.price_catalog(&products);
        assert!(matches!(entries[0].outcome, CatalogOutcome::Failed { .. }));
        assert!(entries[1].result().is_some());
    }

    #[test]
    fn test_largest_valid_costs_price_without_overflow() {
        let config = PricingConfig::default();
        let engine = PricingEngine::new(&config);
        let product = ProductDescription {
            packaging_cents: Money::from_cents(MAX_COST_CENTS),
            marketing_cents: Money::from_cents(MAX_COST_CENTS),
            ..ProductDescription::new("BIG-02", "Premium", Money::from_cents(MAX_COST_CENTS))
        };

        let result = engine.price(&product).unwrap();
        assert!(result.uvp.rounded > result.costs.full_cost);
        assert!(config.rounding.is_rounded(result.uvp.rounded));
    }

    #[test]
    fn test_quote_from_priced_product() {
        let config = PricingConfig::default();
        let engine = PricingEngine::new(&config);
        let product = ProductDescription::new("OIL-01", "Premium", Money::from_cents(3000));
        let result = engine.price(&product).unwrap();

        let item = engine.quote_item(&result, 12);
        // 81.99 / 1.19
        assert_eq!(item.uvp_net.cents(), 6890);
        let quote = engine
            .quote(&QuoteRequest {
                role: "Stand".to_string(),
                items: vec![item],
            })
            .unwrap();
        // The floor (2.5 × 30.90) binds over the 24% stacked discount
        assert_eq!(quote.lines[0].unit_net, result.costs.floor);
    }
}
