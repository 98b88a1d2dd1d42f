//! # Pricing Configuration
//!
//! The immutable ConfigModel every calculator reads from.
//!
//! ## Configuration Sections
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       PricingConfig                                     │
//! │                                                                         │
//! │  tax_rate_bps          rounding            costs / autotune            │
//! │  lines.<name>          roles.<name>        channels.<name>             │
//! │  quantity_discounts    order_discounts     size_tiers / boxes          │
//! │  average_units         loyalty / shipping  bundling                    │
//! │                                                                         │
//! │  Money fields end in _cents, rate fields in _bps (10000 = 100%).       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Loading from disk and environment lives in `margo-config`; this module only
//! defines the document, its defaults, lookups and validation.
//!
//! ## Example Config File
//! ```toml
//! tax_rate_bps = 1900
//!
//! [rounding]
//! unit_cents = 100
//! ending_cents = 99
//!
//! [lines.Basic]
//! target_margin_bps = 4800
//! advertising_bps = 1000
//! floor_multiplier_bps = 22000
//!
//! [channels.Amazon_FBA]
//! kind = "marketplace"
//! referral_bps = 1500
//! min_referral_fee_cents = 30
//! marketplace_fulfillment = true
//! referral_tiers = [
//!     { up_to_cents = 1000, referral_bps = 800 },
//!     { referral_bps = 1500 },
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::cost::{BOX_SIZES, SIZE_TIERS};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{OrderType, Rate, BPS_SCALE};
use crate::validation::{normalize_key, validate_rate};
use crate::MAX_BUNDLE_UNITS;

// =============================================================================
// Rounding
// =============================================================================

/// Consumer price rounding: floor to a whole unit, then add a fixed ending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundingRule {
    /// Whole currency unit to floor to (100 = €1).
    #[serde(default = "default_unit_cents")]
    pub unit_cents: i64,

    /// Fractional ending added after flooring (99 = ".99").
    #[serde(default = "default_ending_cents")]
    pub ending_cents: i64,
}

fn default_unit_cents() -> i64 {
    100
}

fn default_ending_cents() -> i64 {
    99
}

impl Default for RoundingRule {
    fn default() -> Self {
        RoundingRule {
            unit_cents: default_unit_cents(),
            ending_cents: default_ending_cents(),
        }
    }
}

impl RoundingRule {
    /// Applies the rule.
    ///
    /// ## Example
    /// ```rust
    /// use margo_core::config::RoundingRule;
    /// use margo_core::money::Money;
    ///
    /// let rule = RoundingRule::default();
    /// assert_eq!(rule.apply(Money::from_cents(183)).cents(), 199);
    /// assert_eq!(rule.apply(Money::from_cents(1299)).cents(), 1299);
    /// ```
    pub fn apply(&self, price: Money) -> Money {
        price.floor_to(self.unit_cents) + Money::from_cents(self.ending_cents)
    }

    /// True when the price already carries the configured ending.
    pub fn is_rounded(&self, price: Money) -> bool {
        price.cents().rem_euclid(self.unit_cents) == self.ending_cents
    }
}

// =============================================================================
// Global Cost Settings
// =============================================================================

/// Cost parameters shared by every product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSettings {
    /// Buffer added to factory cost for currency swings.
    #[serde(default = "default_fx_buffer")]
    pub fx_buffer_bps: Rate,

    /// Payment processing fee for channels that carry one.
    #[serde(default = "default_payment_fee")]
    pub payment_fee_bps: Rate,

    /// Expected return rate for channels that carry returns.
    #[serde(default = "default_return_rate")]
    pub return_rate_bps: Rate,

    /// Target margin that must remain after all channel fees.
    #[serde(default = "default_channel_margin")]
    pub channel_margin_bps: Rate,
}

fn default_fx_buffer() -> Rate {
    Rate::from_bps(300)
}

fn default_payment_fee() -> Rate {
    Rate::from_bps(190)
}

fn default_return_rate() -> Rate {
    Rate::from_bps(300)
}

fn default_channel_margin() -> Rate {
    Rate::from_bps(1500)
}

impl Default for CostSettings {
    fn default() -> Self {
        CostSettings {
            fx_buffer_bps: default_fx_buffer(),
            payment_fee_bps: default_payment_fee(),
            return_rate_bps: default_return_rate(),
            channel_margin_bps: default_channel_margin(),
        }
    }
}

/// Autotune tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutotuneSettings {
    /// Largest relative UVP increase applied automatically (inclusive).
    #[serde(default = "default_max_raise")]
    pub max_raise_bps: Rate,
}

fn default_max_raise() -> Rate {
    Rate::from_bps(2500)
}

impl Default for AutotuneSettings {
    fn default() -> Self {
        AutotuneSettings {
            max_raise_bps: default_max_raise(),
        }
    }
}

// =============================================================================
// Product Lines
// =============================================================================

/// Per product line targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineConfig {
    /// Gross margin the UVP is derived from.
    pub target_margin_bps: Rate,

    /// Advertising spend as a share of net price.
    #[serde(default)]
    pub advertising_bps: Rate,

    /// Floor price = full cost × this multiplier (22000 = ×2.2).
    pub floor_multiplier_bps: u32,

    /// Minimum advertised price, checked by compliance.
    #[serde(default)]
    pub min_advertised_price_cents: Option<Money>,
}

// =============================================================================
// Partner Roles
// =============================================================================

/// Discount policy for one partner role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Discount off the UVP net price.
    #[serde(default)]
    pub base_discount_bps: Rate,

    /// Largest total discount off UVP net the role may ever get.
    #[serde(default)]
    pub max_discount_bps: Rate,

    /// Minimum absolute margin over full cost per unit.
    #[serde(default)]
    pub min_margin_cents: Money,

    /// Commission on the discounted subtotal, if the role earns one.
    #[serde(default)]
    pub commission_bps: Option<Rate>,

    /// Quantity brackets do not apply to this role.
    #[serde(default)]
    pub quantity_discount_exempt: bool,

    /// Whether orders accrue loyalty points (false for wholesale/dealer).
    #[serde(default)]
    pub loyalty_eligible: bool,
}

/// Quantity bracket; `max_qty = None` is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityBracket {
    pub min_qty: u32,
    #[serde(default)]
    pub max_qty: Option<u32>,
    pub discount_bps: Rate,
}

impl QuantityBracket {
    pub fn contains(&self, qty: u32) -> bool {
        qty >= self.min_qty && self.max_qty.map_or(true, |max| qty <= max)
    }
}

/// Order-level bracket keyed by minimum subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBracket {
    pub min_subtotal_cents: Money,
    pub discount_bps: Rate,
}

// =============================================================================
// Channels
// =============================================================================

/// What kind of sales channel this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Direct-to-consumer storefront; always carries returns and loyalty cost.
    #[default]
    Storefront,
    /// Third-party marketplace.
    Marketplace,
}

/// One referral tier. The first tier whose `up_to_cents` is at or above the
/// candidate price applies; a tier without a threshold is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralTier {
    #[serde(default)]
    pub up_to_cents: Option<Money>,
    pub referral_bps: Rate,
}

/// Per product line fee overrides inside one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelLineOverride {
    #[serde(default)]
    pub referral_bps: Option<Rate>,
    #[serde(default)]
    pub advertising_bps: Option<Rate>,
}

/// Fee structure of one sales channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub kind: ChannelKind,

    /// Flat referral fee, used when no tiers are defined.
    #[serde(default)]
    pub referral_bps: Rate,

    #[serde(default)]
    pub platform_bps: Rate,

    /// Fixed per-shipment label fee.
    #[serde(default)]
    pub label_fee_cents: Money,

    #[serde(default)]
    pub min_referral_fee_cents: Option<Money>,

    /// Price-dependent referral fees, ascending by threshold.
    #[serde(default)]
    pub referral_tiers: Vec<ReferralTier>,

    /// Fulfilled by the marketplace: the size-tier fee applies.
    #[serde(default)]
    pub marketplace_fulfillment: bool,

    #[serde(default)]
    pub applies_payment_fee: bool,

    /// Marketplace carries return cost (storefronts always do).
    #[serde(default)]
    pub applies_returns: bool,

    /// Marketplace carries loyalty cost (storefronts always do).
    #[serde(default)]
    pub applies_loyalty: bool,

    /// Replaces the line's advertising rate on this channel.
    #[serde(default)]
    pub advertising_bps: Option<Rate>,

    /// Replaces the global channel margin on this channel.
    #[serde(default)]
    pub margin_bps: Option<Rate>,

    #[serde(default)]
    pub line_overrides: BTreeMap<String, ChannelLineOverride>,
}

impl ChannelConfig {
    pub fn is_tiered(&self) -> bool {
        !self.referral_tiers.is_empty()
    }

    /// Referral rate for a candidate tax-inclusive price.
    ///
    /// Without tiers this is the flat rate.
    pub fn referral_for(&self, price: Money) -> Rate {
        self.referral_tiers
            .iter()
            .find(|tier| tier.up_to_cents.map_or(true, |up_to| up_to >= price))
            .or_else(|| self.referral_tiers.last())
            .map_or(self.referral_bps, |tier| tier.referral_bps)
    }

    pub fn carries_returns(&self) -> bool {
        self.kind == ChannelKind::Storefront || self.applies_returns
    }

    pub fn carries_loyalty(&self) -> bool {
        self.kind == ChannelKind::Storefront || self.applies_loyalty
    }

    /// Override for a product line, matched case/whitespace-insensitively.
    pub fn line_override(&self, line: &str) -> Option<&ChannelLineOverride> {
        find_normalized(&self.line_overrides, line).map(|(_, o)| o)
    }
}

// =============================================================================
// Fulfillment, Boxes, Orders
// =============================================================================

/// Marketplace fulfillment fee bundle for one size tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SizeTierFee {
    #[serde(default)]
    pub fulfillment_cents: Money,
    #[serde(default)]
    pub storage_cents: Money,
}

impl SizeTierFee {
    pub fn total(&self) -> Money {
        self.fulfillment_cents + self.storage_cents
    }
}

/// Average units per order, in hundredths (140 = 1.4 units).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AverageUnits {
    #[serde(default = "default_consumer_units")]
    pub consumer_x100: u32,
    #[serde(default = "default_business_units")]
    pub business_x100: u32,
}

fn default_consumer_units() -> u32 {
    140
}

fn default_business_units() -> u32 {
    600
}

impl Default for AverageUnits {
    fn default() -> Self {
        AverageUnits {
            consumer_x100: default_consumer_units(),
            business_x100: default_business_units(),
        }
    }
}

impl AverageUnits {
    pub fn for_order_type(&self, order_type: OrderType) -> u32 {
        match order_type {
            OrderType::Consumer => self.consumer_x100,
            OrderType::Business => self.business_x100,
        }
    }
}

/// Loyalty program parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltySettings {
    #[serde(default = "default_points_per_eur")]
    pub points_per_eur: u32,

    /// Value of one point when redeemed.
    #[serde(default = "default_point_value")]
    pub point_value_cents: u32,

    /// Share of issued points that is eventually redeemed.
    #[serde(default = "default_redemption")]
    pub redemption_bps: Rate,
}

fn default_points_per_eur() -> u32 {
    1
}

fn default_point_value() -> u32 {
    1
}

fn default_redemption() -> Rate {
    Rate::from_bps(7000)
}

impl Default for LoyaltySettings {
    fn default() -> Self {
        LoyaltySettings {
            points_per_eur: default_points_per_eur(),
            point_value_cents: default_point_value(),
            redemption_bps: default_redemption(),
        }
    }
}

impl LoyaltySettings {
    /// Cost of the program as a share of net price.
    ///
    /// One euro earns `points_per_eur` points worth `point_value_cents` each,
    /// of which `redemption_bps` are redeemed.
    pub fn cost_rate(&self) -> Rate {
        let bps = self.points_per_eur as u64
            * self.point_value_cents as u64
            * self.redemption_bps.bps() as u64
            / 100;
        Rate::from_bps(bps.min(u32::MAX as u64) as u32)
    }
}

/// Order shipping charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingSettings {
    #[serde(default = "default_flat_fee")]
    pub flat_fee_cents: Money,

    /// Tax-inclusive goods total at which shipping is waived.
    #[serde(default)]
    pub free_from_cents: Option<Money>,
}

fn default_flat_fee() -> Money {
    Money::from_cents(490)
}

impl Default for ShippingSettings {
    fn default() -> Self {
        ShippingSettings {
            flat_fee_cents: default_flat_fee(),
            free_from_cents: Some(Money::from_cents(5000)),
        }
    }
}

// =============================================================================
// Bundling
// =============================================================================

/// Bundle search bounds and the price ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundlingSettings {
    #[serde(default = "default_min_units")]
    pub min_units: u32,

    #[serde(default = "default_max_units")]
    pub max_units: u32,

    /// Skip odd sizes except `max_units`.
    #[serde(default = "default_prefer_even")]
    pub prefer_even: bool,

    /// Allowed bundle prices, strictly ascending.
    #[serde(default = "default_price_ladder")]
    pub price_ladder_cents: Vec<Money>,
}

fn default_min_units() -> u32 {
    2
}

fn default_max_units() -> u32 {
    6
}

fn default_prefer_even() -> bool {
    true
}

fn default_price_ladder() -> Vec<Money> {
    [
        999, 1499, 1999, 2499, 2999, 3499, 3999, 4499, 4999, 5999, 6999, 7999, 8999, 9999, 11999,
        14999,
    ]
    .into_iter()
    .map(Money::from_cents)
    .collect()
}

impl Default for BundlingSettings {
    fn default() -> Self {
        BundlingSettings {
            min_units: default_min_units(),
            max_units: default_max_units(),
            prefer_even: default_prefer_even(),
            price_ladder_cents: default_price_ladder(),
        }
    }
}

// =============================================================================
// Main Pricing Configuration
// =============================================================================

/// Complete pricing configuration.
///
/// Constructed once, validated, then shared by reference with every
/// calculation. Nothing in the engine mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_tax_rate")]
    pub tax_rate_bps: Rate,

    #[serde(default)]
    pub rounding: RoundingRule,

    #[serde(default)]
    pub costs: CostSettings,

    #[serde(default)]
    pub autotune: AutotuneSettings,

    #[serde(default)]
    pub average_units: AverageUnits,

    #[serde(default)]
    pub loyalty: LoyaltySettings,

    #[serde(default)]
    pub shipping: ShippingSettings,

    #[serde(default)]
    pub bundling: BundlingSettings,

    #[serde(default = "default_lines")]
    pub lines: BTreeMap<String, LineConfig>,

    #[serde(default = "default_roles")]
    pub roles: BTreeMap<String, RoleConfig>,

    #[serde(default = "default_channels")]
    pub channels: BTreeMap<String, ChannelConfig>,

    #[serde(default = "default_size_tiers")]
    pub size_tiers: BTreeMap<String, SizeTierFee>,

    #[serde(default = "default_boxes")]
    pub boxes: BTreeMap<String, Money>,

    #[serde(default = "default_quantity_discounts")]
    pub quantity_discounts: Vec<QuantityBracket>,

    #[serde(default = "default_order_discounts")]
    pub order_discounts: Vec<OrderBracket>,
}

fn default_tax_rate() -> Rate {
    Rate::from_bps(1900)
}

fn default_lines() -> BTreeMap<String, LineConfig> {
    let line = |margin, ads, floor| LineConfig {
        target_margin_bps: Rate::from_bps(margin),
        advertising_bps: Rate::from_bps(ads),
        floor_multiplier_bps: floor,
        min_advertised_price_cents: None,
    };
    BTreeMap::from([
        ("Basic".to_string(), line(4800, 1000, 22000)),
        ("Premium".to_string(), line(5500, 1200, 25000)),
        ("Gift Set".to_string(), line(5000, 800, 23000)),
    ])
}

fn default_roles() -> BTreeMap<String, RoleConfig> {
    let role = |base, cap, min_margin, exempt, loyalty| RoleConfig {
        base_discount_bps: Rate::from_bps(base),
        max_discount_bps: Rate::from_bps(cap),
        min_margin_cents: Money::from_cents(min_margin),
        commission_bps: None,
        quantity_discount_exempt: exempt,
        loyalty_eligible: loyalty,
    };
    BTreeMap::from([
        ("Consumer".to_string(), role(0, 0, 0, true, true)),
        ("Stand".to_string(), role(2000, 3500, 50, false, false)),
        ("Dealer".to_string(), role(3000, 4000, 100, false, false)),
        ("Wholesale".to_string(), role(4000, 5000, 80, true, false)),
        (
            "Ambassador".to_string(),
            RoleConfig {
                commission_bps: Some(Rate::from_bps(1000)),
                ..role(1000, 1500, 0, true, true)
            },
        ),
    ])
}

fn amazon_tiers() -> Vec<ReferralTier> {
    vec![
        ReferralTier {
            up_to_cents: Some(Money::from_cents(1000)),
            referral_bps: Rate::from_bps(800),
        },
        ReferralTier {
            up_to_cents: None,
            referral_bps: Rate::from_bps(1500),
        },
    ]
}

fn default_channels() -> BTreeMap<String, ChannelConfig> {
    BTreeMap::from([
        (
            "Shopify".to_string(),
            ChannelConfig {
                kind: ChannelKind::Storefront,
                platform_bps: Rate::from_bps(200),
                label_fee_cents: Money::from_cents(450),
                applies_payment_fee: true,
                ..Default::default()
            },
        ),
        (
            "Amazon_FBA".to_string(),
            ChannelConfig {
                kind: ChannelKind::Marketplace,
                referral_bps: Rate::from_bps(1500),
                min_referral_fee_cents: Some(Money::from_cents(30)),
                referral_tiers: amazon_tiers(),
                marketplace_fulfillment: true,
                applies_returns: true,
                ..Default::default()
            },
        ),
        (
            "Amazon_FBM".to_string(),
            ChannelConfig {
                kind: ChannelKind::Marketplace,
                referral_bps: Rate::from_bps(1500),
                label_fee_cents: Money::from_cents(450),
                min_referral_fee_cents: Some(Money::from_cents(30)),
                referral_tiers: amazon_tiers(),
                applies_returns: true,
                ..Default::default()
            },
        ),
    ])
}

fn default_size_tiers() -> BTreeMap<String, SizeTierFee> {
    let fee = |fulfillment, storage| SizeTierFee {
        fulfillment_cents: Money::from_cents(fulfillment),
        storage_cents: Money::from_cents(storage),
    };
    BTreeMap::from([
        ("small_standard".to_string(), fee(275, 10)),
        ("standard".to_string(), fee(345, 15)),
        ("large_standard".to_string(), fee(520, 30)),
    ])
}

fn default_boxes() -> BTreeMap<String, Money> {
    BTreeMap::from([
        ("S".to_string(), Money::from_cents(35)),
        ("M".to_string(), Money::from_cents(55)),
        ("L".to_string(), Money::from_cents(85)),
    ])
}

fn default_quantity_discounts() -> Vec<QuantityBracket> {
    vec![
        QuantityBracket {
            min_qty: 10,
            max_qty: Some(24),
            discount_bps: Rate::from_bps(500),
        },
        QuantityBracket {
            min_qty: 25,
            max_qty: Some(49),
            discount_bps: Rate::from_bps(800),
        },
        QuantityBracket {
            min_qty: 50,
            max_qty: None,
            discount_bps: Rate::from_bps(1200),
        },
    ]
}

fn default_order_discounts() -> Vec<OrderBracket> {
    vec![
        OrderBracket {
            min_subtotal_cents: Money::from_cents(25_000),
            discount_bps: Rate::from_bps(200),
        },
        OrderBracket {
            min_subtotal_cents: Money::from_cents(50_000),
            discount_bps: Rate::from_bps(300),
        },
        OrderBracket {
            min_subtotal_cents: Money::from_cents(100_000),
            discount_bps: Rate::from_bps(500),
        },
    ]
}

impl Default for PricingConfig {
    /// German storefront defaults: 19% VAT, ".99" endings, Shopify plus
    /// Amazon FBA/FBM.
    fn default() -> Self {
        PricingConfig {
            tax_rate_bps: default_tax_rate(),
            rounding: RoundingRule::default(),
            costs: CostSettings::default(),
            autotune: AutotuneSettings::default(),
            average_units: AverageUnits::default(),
            loyalty: LoyaltySettings::default(),
            shipping: ShippingSettings::default(),
            bundling: BundlingSettings::default(),
            lines: default_lines(),
            roles: default_roles(),
            channels: default_channels(),
            size_tiers: default_size_tiers(),
            boxes: default_boxes(),
            quantity_discounts: default_quantity_discounts(),
            order_discounts: default_order_discounts(),
        }
    }
}

/// Looks a key up case/whitespace-insensitively, returning the configured key.
fn find_normalized<'a, T>(map: &'a BTreeMap<String, T>, key: &str) -> Option<(&'a str, &'a T)> {
    let wanted = normalize_key(key);
    map.iter()
        .find(|(k, _)| normalize_key(k) == wanted)
        .map(|(k, v)| (k.as_str(), v))
}

impl PricingConfig {
    // =========================================================================
    // Lookups
    // =========================================================================

    /// Resolves a product line.
    pub fn line(&self, name: &str) -> CoreResult<&LineConfig> {
        find_normalized(&self.lines, name)
            .map(|(_, line)| line)
            .ok_or_else(|| CoreError::UnknownProductLine(name.to_string()))
    }

    /// Resolves a partner role.
    pub fn role(&self, name: &str) -> CoreResult<&RoleConfig> {
        find_normalized(&self.roles, name)
            .map(|(_, role)| role)
            .ok_or_else(|| CoreError::UnknownRole(name.to_string()))
    }

    /// Resolves a channel, returning its configured key.
    pub fn channel(&self, name: &str) -> CoreResult<(&str, &ChannelConfig)> {
        find_normalized(&self.channels, name)
            .ok_or_else(|| CoreError::UnknownChannel(name.to_string()))
    }

    pub fn box_cost(&self, size: &str) -> CoreResult<Money> {
        find_normalized(&self.boxes, size)
            .map(|(_, cost)| *cost)
            .ok_or_else(|| CoreError::UnknownBoxSize(size.to_string()))
    }

    pub fn size_tier_fee(&self, tier: &str) -> CoreResult<Money> {
        find_normalized(&self.size_tiers, tier)
            .map(|(_, fee)| fee.total())
            .ok_or_else(|| CoreError::UnknownSizeTier(tier.to_string()))
    }

    /// Quantity discount for a line quantity (first matching bracket).
    pub fn quantity_discount(&self, qty: u32) -> Rate {
        self.quantity_discounts
            .iter()
            .find(|bracket| bracket.contains(qty))
            .map_or(Rate::zero(), |bracket| bracket.discount_bps)
    }

    /// Order discount: the highest threshold at or below the subtotal wins.
    pub fn order_discount(&self, subtotal: Money) -> Rate {
        self.order_discounts
            .iter()
            .filter(|bracket| subtotal >= bracket.min_subtotal_cents)
            .max_by_key(|bracket| bracket.min_subtotal_cents)
            .map_or(Rate::zero(), |bracket| bracket.discount_bps)
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Validates the configuration.
    pub fn validate(&self) -> CoreResult<()> {
        validate_rate("tax_rate_bps", self.tax_rate_bps)?;

        if self.rounding.unit_cents <= 0 {
            return Err(invalid("rounding.unit_cents must be positive"));
        }
        if self.rounding.ending_cents < 0 || self.rounding.ending_cents >= self.rounding.unit_cents
        {
            return Err(invalid(format!(
                "rounding.ending_cents must be in 0..{}",
                self.rounding.unit_cents
            )));
        }

        validate_rate("costs.fx_buffer_bps", self.costs.fx_buffer_bps)?;
        validate_rate("costs.payment_fee_bps", self.costs.payment_fee_bps)?;
        validate_rate("costs.return_rate_bps", self.costs.return_rate_bps)?;
        validate_rate("costs.channel_margin_bps", self.costs.channel_margin_bps)?;
        validate_rate("loyalty.redemption_bps", self.loyalty.redemption_bps)?;

        if self.average_units.consumer_x100 == 0 || self.average_units.business_x100 == 0 {
            return Err(invalid("average_units must be positive"));
        }

        self.validate_lines()?;
        self.validate_roles()?;
        self.validate_brackets()?;
        self.validate_channels()?;
        self.validate_tables()?;
        self.validate_bundling()?;

        Ok(())
    }

    fn validate_lines(&self) -> CoreResult<()> {
        if self.lines.is_empty() {
            return Err(invalid("at least one product line is required"));
        }
        ensure_unique_keys("lines", self.lines.keys())?;
        for (name, line) in &self.lines {
            if line.target_margin_bps.bps() as i64 >= BPS_SCALE {
                return Err(invalid(format!(
                    "lines.{name}.target_margin_bps must be below 10000"
                )));
            }
            validate_rate("advertising_bps", line.advertising_bps)?;
            if line.floor_multiplier_bps == 0 {
                return Err(invalid(format!(
                    "lines.{name}.floor_multiplier_bps must be positive"
                )));
            }
        }
        Ok(())
    }

    fn validate_roles(&self) -> CoreResult<()> {
        ensure_unique_keys("roles", self.roles.keys())?;
        for (name, role) in &self.roles {
            validate_rate("base_discount_bps", role.base_discount_bps)?;
            validate_rate("max_discount_bps", role.max_discount_bps)?;
            if let Some(commission) = role.commission_bps {
                validate_rate("commission_bps", commission)?;
            }
            if role.min_margin_cents.is_negative() {
                return Err(invalid(format!(
                    "roles.{name}.min_margin_cents must not be negative"
                )));
            }
        }
        Ok(())
    }

    fn validate_brackets(&self) -> CoreResult<()> {
        let mut brackets = self.quantity_discounts.clone();
        brackets.sort_by_key(|b| b.min_qty);
        for (i, bracket) in brackets.iter().enumerate() {
            validate_rate("quantity_discounts.discount_bps", bracket.discount_bps)?;
            if bracket.min_qty == 0 {
                return Err(invalid("quantity_discounts.min_qty must be at least 1"));
            }
            if let Some(max) = bracket.max_qty {
                if max < bracket.min_qty {
                    return Err(invalid(format!(
                        "quantity bracket {}..{} is inverted",
                        bracket.min_qty, max
                    )));
                }
            }
            if let Some(next) = brackets.get(i + 1) {
                let overlaps = bracket.max_qty.map_or(true, |max| max >= next.min_qty);
                if overlaps {
                    return Err(invalid(format!(
                        "quantity brackets starting at {} and {} overlap",
                        bracket.min_qty, next.min_qty
                    )));
                }
            }
        }

        for bracket in &self.order_discounts {
            validate_rate("order_discounts.discount_bps", bracket.discount_bps)?;
            if bracket.min_subtotal_cents.is_negative() {
                return Err(invalid("order_discounts.min_subtotal_cents must not be negative"));
            }
        }
        Ok(())
    }

    fn validate_channels(&self) -> CoreResult<()> {
        if self.channels.is_empty() {
            return Err(invalid("at least one channel is required"));
        }
        ensure_unique_keys("channels", self.channels.keys())?;
        for (name, channel) in &self.channels {
            validate_rate("referral_bps", channel.referral_bps)?;
            validate_rate("platform_bps", channel.platform_bps)?;
            if let Some(ads) = channel.advertising_bps {
                validate_rate("advertising_bps", ads)?;
            }
            if let Some(margin) = channel.margin_bps {
                validate_rate("margin_bps", margin)?;
            }

            let tiers = &channel.referral_tiers;
            for (i, tier) in tiers.iter().enumerate() {
                validate_rate("referral_tiers.referral_bps", tier.referral_bps)?;
                let is_last = i + 1 == tiers.len();
                match (tier.up_to_cents, tiers.get(i + 1)) {
                    (None, _) if !is_last => {
                        return Err(invalid(format!(
                            "channels.{name}: only the last referral tier may be open-ended"
                        )));
                    }
                    (Some(up_to), Some(next)) => {
                        if next.up_to_cents.is_some_and(|next_up| next_up <= up_to) {
                            return Err(invalid(format!(
                                "channels.{name}: referral tiers must ascend"
                            )));
                        }
                    }
                    _ => {}
                }
            }

            for line in channel.line_overrides.keys() {
                if self.line(line).is_err() {
                    return Err(invalid(format!(
                        "channels.{name}.line_overrides names unknown line '{line}'"
                    )));
                }
            }
            for line_override in channel.line_overrides.values() {
                if let Some(referral) = line_override.referral_bps {
                    validate_rate("line_overrides.referral_bps", referral)?;
                }
                if let Some(ads) = line_override.advertising_bps {
                    validate_rate("line_overrides.advertising_bps", ads)?;
                }
            }
        }
        Ok(())
    }

    fn validate_tables(&self) -> CoreResult<()> {
        ensure_unique_keys("boxes", self.boxes.keys())?;
        ensure_unique_keys("size_tiers", self.size_tiers.keys())?;

        for size in BOX_SIZES {
            self.box_cost(size)?;
        }
        if self.channels.values().any(|c| c.marketplace_fulfillment) {
            for tier in SIZE_TIERS {
                self.size_tier_fee(tier)?;
            }
        }
        Ok(())
    }

    fn validate_bundling(&self) -> CoreResult<()> {
        let bundling = &self.bundling;
        if bundling.min_units < 2 {
            return Err(invalid("bundling.min_units must be at least 2"));
        }
        if bundling.min_units > bundling.max_units {
            return Err(invalid("bundling.min_units must not exceed max_units"));
        }
        if bundling.max_units > MAX_BUNDLE_UNITS {
            return Err(invalid(format!("bundling.max_units must be at most {MAX_BUNDLE_UNITS}")));
        }
        if bundling.price_ladder_cents.is_empty() {
            return Err(invalid("bundling.price_ladder_cents must not be empty"));
        }
        if !bundling.price_ladder_cents.windows(2).all(|w| w[0] < w[1]) {
            return Err(invalid("bundling.price_ladder_cents must be strictly ascending"));
        }
        if !bundling.price_ladder_cents[0].is_positive() {
            return Err(invalid("bundling.price_ladder_cents must be positive"));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> CoreError {
    CoreError::InvalidConfig(msg.into())
}

fn ensure_unique_keys<'a>(
    section: &str,
    keys: impl Iterator<Item = &'a String>,
) -> CoreResult<()> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(normalize_key(key)) {
            return Err(CoreError::Validation(
                crate::error::ValidationError::Duplicate {
                    field: section.to_string(),
                    value: key.clone(),
                },
            ));
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
