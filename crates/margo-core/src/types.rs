//! # Domain Types
//!
//! Input-side domain types shared by every calculator.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────┐   ┌─────────────────┐   ┌─────────────────┐  │
//! │  │ ProductDescription   │   │      Rate       │   │   NetContent    │  │
//! │  │  ──────────────────  │   │  ─────────────  │   │  ─────────────  │  │
//! │  │  sku, product_line   │   │  bps (u32)      │   │  amount         │  │
//! │  │  cost components     │   │  1900 = 19%     │   │  ml / l / g / kg│  │
//! │  │  gift, box, tier     │   └─────────────────┘   └─────────────────┘  │
//! │  │  manual UVP          │                                               │
//! │  └──────────────────────┘   ┌─────────────────┐   ┌─────────────────┐  │
//! │                             │   GiftAttach    │   │   OrderType     │  │
//! │                             │  cost, funding  │   │  Consumer       │  │
//! │                             │  attach rate    │   │  Business       │  │
//! │                             └─────────────────┘   └─────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Result records live next to the calculator that produces them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{div_round, Money};

/// Basis points in one whole (100%).
pub const BPS_SCALE: i64 = 10_000;

// =============================================================================
// Rate
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1900 bps = 19% (German VAT), 1500 bps = 15% marketplace referral fee.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        Rate((pct * 100.0).round().max(0.0) as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// `10000 − bps`, the share left after this rate is taken.
    #[inline]
    pub const fn complement_bps(&self) -> i64 {
        BPS_SCALE - self.0 as i64
    }

    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Net Content / Grundpreis
// =============================================================================

/// Unit a net content is declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ContentUnit {
    Ml,
    L,
    G,
    Kg,
}

/// Reference unit for a Grundpreis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BaseUnit {
    Liter,
    Kilogram,
}

/// Declared net content of one sellable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NetContent {
    pub amount: u32,
    pub unit: ContentUnit,
}

impl NetContent {
    /// Content in milliliters or grams.
    pub fn milli(&self) -> u64 {
        match self.unit {
            ContentUnit::Ml | ContentUnit::G => self.amount as u64,
            ContentUnit::L | ContentUnit::Kg => self.amount as u64 * 1000,
        }
    }

    pub fn base_unit(&self) -> BaseUnit {
        match self.unit {
            ContentUnit::Ml | ContentUnit::L => BaseUnit::Liter,
            ContentUnit::G | ContentUnit::Kg => BaseUnit::Kilogram,
        }
    }

    /// Content of `units` packed together, kept in the small unit.
    pub fn times(&self, units: u32) -> NetContent {
        let milli = self.milli() * units as u64;
        let unit = match self.base_unit() {
            BaseUnit::Liter => ContentUnit::Ml,
            BaseUnit::Kilogram => ContentUnit::G,
        };
        NetContent {
            amount: milli.min(u32::MAX as u64) as u32,
            unit,
        }
    }
}

/// Price normalized to one liter or kilogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Grundpreis {
    pub price_per_base: Money,
    pub base: BaseUnit,
}

impl Grundpreis {
    /// Computes the Grundpreis of a tax-inclusive price.
    ///
    /// Returns `None` for zero content.
    ///
    /// ## Example
    /// ```rust
    /// use margo_core::money::Money;
    /// use margo_core::types::{ContentUnit, Grundpreis, NetContent};
    ///
    /// let content = NetContent { amount: 250, unit: ContentUnit::Ml };
    /// let gp = Grundpreis::compute(Money::from_cents(1299), &content).unwrap();
    /// assert_eq!(gp.price_per_base.cents(), 5196); // €51.96 / l
    /// ```
    pub fn compute(price: Money, content: &NetContent) -> Option<Grundpreis> {
        let milli = content.milli();
        if milli == 0 {
            return None;
        }
        Some(Grundpreis {
            price_per_base: Money::from_cents(div_round(
                price.cents() as i128 * 1000,
                milli as i128,
            )),
            base: content.base_unit(),
        })
    }
}

// =============================================================================
// Product Description
// =============================================================================

/// Which kind of order the per-order box cost is spread over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    Consumer,
    Business,
}

/// Optional gift attached to orders of this product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GiftAttach {
    /// Cost of the gift SKU.
    #[serde(default)]
    pub sku_cost_cents: Money,

    /// Share of the gift cost funded by the supplier.
    #[serde(default)]
    pub funding_share_bps: Rate,

    /// Extra shipping caused by the gift.
    #[serde(default)]
    pub shipping_increment_cents: Money,

    /// Share of orders that carry the gift.
    #[serde(default)]
    pub attach_rate_bps: Rate,
}

/// A product as supplied by the catalog collaborator.
///
/// All cost components are per unit and default to zero when absent.
/// The upstream catalog has already stripped currency symbols and
/// resolved carton/unit relationships into plain numbers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductDescription {
    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Product line; resolved against config case/whitespace-insensitively.
    pub product_line: String,

    /// Manual factory cost per unit. Wins over the carton figures.
    #[serde(default)]
    pub factory_cost_cents: Option<Money>,

    /// Factory price of a whole carton.
    #[serde(default)]
    pub carton_cost_cents: Option<Money>,

    #[serde(default)]
    pub units_per_carton: Option<u32>,

    #[serde(default)]
    pub inbound_shipping_cents: Money,

    /// Regulatory and compliance fees.
    #[serde(default)]
    pub compliance_cents: Money,

    #[serde(default)]
    pub packaging_cents: Money,

    #[serde(default)]
    pub qc_cents: Money,

    #[serde(default)]
    pub operations_cents: Money,

    #[serde(default)]
    pub marketing_cents: Money,

    #[serde(default)]
    pub net_content: Option<NetContent>,

    #[serde(default)]
    pub gift: Option<GiftAttach>,

    /// Box-size key into the box cost table ("S", "M", "L").
    #[serde(default)]
    pub box_size: Option<String>,

    /// Marketplace size-tier key into the fulfillment fee table.
    #[serde(default)]
    pub size_tier: Option<String>,

    /// Tax-inclusive price set by hand; replaces the margin-based UVP.
    #[serde(default)]
    pub manual_uvp_cents: Option<Money>,

    #[serde(default)]
    pub order_type: OrderType,
}

impl ProductDescription {
    /// Creates a description with a manual factory cost and nothing else.
    pub fn new(
        sku: impl Into<String>,
        product_line: impl Into<String>,
        factory_cost: Money,
    ) -> Self {
        ProductDescription {
            sku: sku.into(),
            product_line: product_line.into(),
            factory_cost_cents: Some(factory_cost),
            ..Default::default()
        }
    }

    /// Per-unit costs added on top of the inflated factory cost.
    pub fn additive_costs(&self) -> Money {
        self.inbound_shipping_cents
            + self.compliance_cents
            + self.packaging_cents
            + self.qc_cents
            + self.operations_cents
            + self.marketing_cents
    }

    /// Every cost component with its field name, for validation.
    pub fn cost_components(&self) -> [(&'static str, Option<Money>); 8] {
        [
            ("factory_cost_cents", self.factory_cost_cents),
            ("carton_cost_cents", self.carton_cost_cents),
            ("inbound_shipping_cents", Some(self.inbound_shipping_cents)),
            ("compliance_cents", Some(self.compliance_cents)),
            ("packaging_cents", Some(self.packaging_cents)),
            ("qc_cents", Some(self.qc_cents)),
            ("operations_cents", Some(self.operations_cents)),
            ("marketing_cents", Some(self.marketing_cents)),
        ]
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
