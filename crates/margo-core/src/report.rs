//! # Coverage Report
//!
//! Tallies pricing outcomes across a catalog for the reporting surfaces.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::autotune::AutotuneAction;
use crate::engine::{CatalogEntry, PricingResult};

/// Catalog-wide pricing statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CoverageReport {
    pub products: u32,
    pub failed: u32,

    pub ok: u32,
    pub raised: u32,
    pub bundle_recommended: u32,

    /// Products with at least one infeasible channel.
    pub needs_review: u32,

    /// Infeasible guardrails per channel.
    pub infeasible_channels: BTreeMap<String, u32>,

    /// Guardrails whose tiered fee never settled.
    pub unsettled_fees: u32,

    /// Products whose best bundle covers every channel.
    pub fully_covered_bundles: u32,

    /// Winning bundle size → product count.
    pub bundle_sizes: BTreeMap<u32, u32>,

    /// Channel → products whose best bundle covers it.
    pub channel_coverage: BTreeMap<String, u32>,
}

impl CoverageReport {
    /// Builds a report from successfully priced products.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a PricingResult>) -> Self {
        let mut report = CoverageReport::default();
        for result in results {
            report.add(result);
        }
        report
    }

    /// Builds a report from a catalog batch, counting failures.
    pub fn from_catalog(entries: &[CatalogEntry]) -> Self {
        let mut report = CoverageReport::from_results(entries.iter().filter_map(|e| e.result()));
        let failed = entries.iter().filter(|e| e.result().is_none()).count() as u32;
        report.failed = failed;
        report.products += failed;
        report
    }

    fn add(&mut self, result: &PricingResult) {
        self.products += 1;
        match result.autotune.action {
            AutotuneAction::Ok => self.ok += 1,
            AutotuneAction::RaiseUvp => self.raised += 1,
            AutotuneAction::BundleRecommended => self.bundle_recommended += 1,
        }
        if result.autotune.needs_review {
            self.needs_review += 1;
        }

        for channel in result.infeasible_channels() {
            *self
                .infeasible_channels
                .entry(channel.to_string())
                .or_default() += 1;
        }
        self.unsettled_fees += result
            .guardrails
            .iter()
            .filter(|g| !g.resolution.is_settled())
            .count() as u32;

        let Some(best) = result.bundles.first() else {
            return;
        };
        if best.all_covered {
            self.fully_covered_bundles += 1;
            *self.bundle_sizes.entry(best.units).or_default() += 1;
        }
        for coverage in best.coverage.iter().filter(|c| c.covered) {
            *self
                .channel_coverage
                .entry(coverage.channel.clone())
                .or_default() += 1;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PricingConfig;
    use crate::engine::PricingEngine;
    use crate::money::Money;
    use crate::types::ProductDescription;

    #[test]
    fn test_report_tallies_catalog() {
        let config = PricingConfig::default();
        let engine = PricingEngine::new(&config);
        let entries = engine.price_catalog(&[
            ProductDescription::new("LIP-01", "Basic", Money::from_cents(80)),
            ProductDescription::new("LIP-02", "Basic", Money::from_cents(90)),
            ProductDescription::new("OIL-01", "Premium", Money::from_cents(3000)),
            ProductDescription::new("BAD-01", "Deluxe", Money::from_cents(80)),
        ]);

        let report = CoverageReport::from_catalog(&entries);
        assert_eq!(report.products, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(report.ok, 1);
        assert_eq!(report.bundle_recommended, 2);
        assert_eq!(report.fully_covered_bundles, 2);
        assert_eq!(report.bundle_sizes.get(&2), Some(&2));
        assert_eq!(report.channel_coverage.get("Shopify"), Some(&2));
        assert_eq!(report.needs_review, 0);
        assert!(report.infeasible_channels.is_empty());
    }

    #[test]
    fn test_empty_report() {
        let report = CoverageReport::from_results(std::iter::empty());
        assert_eq!(report, CoverageReport::default());
    }
}
