//! # Money Module
//!
//! Provides the `Money` type for every price, cost and fee in the engine.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE DRIFT PROBLEM                                                      │
//! │                                                                         │
//! │  Floating point "round to .99":                                        │
//! │    floor(12.999999999) + 0.99 = 12.99   (meant 13.99)  ❌              │
//! │                                                                         │
//! │  Bundle scaling and guardrail iteration repeat the same division       │
//! │  many times, so float error accumulates across steps.                  │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents + Basis Points                             │
//! │    every rate application rounds exactly once, half away from zero     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use margo_core::money::Money;
//! use margo_core::types::Rate;
//!
//! let net = Money::from_cents(1000);            // €10.00
//! let gross = net.with_tax(Rate::from_bps(1900)); // €11.90
//! assert_eq!(gross.cents(), 1190);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::{Rate, BPS_SCALE};

/// Divides with rounding half away from zero, saturating at the i64 range.
///
/// `den` must be positive.
pub(crate) fn div_round(num: i128, den: i128) -> i64 {
    debug_assert!(den > 0);
    let half = den / 2;
    let q = if num >= 0 {
        num.saturating_add(half) / den
    } else {
        -(num.saturating_neg().saturating_add(half) / den)
    };
    i64::try_from(q).unwrap_or(if q < 0 { i64::MIN } else { i64::MAX })
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (euro cents).
///
/// ## Where Money is Used
/// ```text
/// ProductDescription costs ──► full cost ──► UVP ──► guardrails ──► bundles
///                                              │
///                                              └──► QuoteBuilder line totals
/// ```
///
/// Newtype structs serialize as the bare integer, so config files read
/// `label_fee_cents = 330`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use margo_core::money::Money;
    ///
    /// let price = Money::from_cents(1299); // €12.99
    /// assert_eq!(price.cents(), 1299);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from euros and cents.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -€5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-euro portion.
    #[inline]
    pub const fn euros(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cent portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Applies a rate: `self × rate`.
    ///
    /// ## Example
    /// ```rust
    /// use margo_core::money::Money;
    /// use margo_core::types::Rate;
    ///
    /// let net = Money::from_cents(1000);
    /// // 15% referral fee on €10.00
    /// assert_eq!(net.apply_rate(Rate::from_bps(1500)).cents(), 150);
    /// ```
    pub fn apply_rate(&self, rate: Rate) -> Money {
        self.scale_bps(rate.bps() as i64)
    }

    /// Multiplies by a factor expressed in basis points (10000 = ×1.0).
    ///
    /// Used for multipliers above one, e.g. a floor multiplier of 2.2 is 22000.
    pub fn scale_bps(&self, factor_bps: i64) -> Money {
        Money(div_round(
            self.0 as i128 * factor_bps as i128,
            BPS_SCALE as i128,
        ))
    }

    /// Reduces the amount by a rate: `self × (1 − rate)`.
    ///
    /// ## Example
    /// ```rust
    /// use margo_core::money::Money;
    /// use margo_core::types::Rate;
    ///
    /// let uvp_net = Money::from_cents(1000);
    /// assert_eq!(uvp_net.discounted(Rate::from_bps(2000)).cents(), 800);
    /// ```
    pub fn discounted(&self, rate: Rate) -> Money {
        self.scale_bps(rate.complement_bps())
    }

    /// Adds tax to a tax-exclusive amount.
    pub fn with_tax(&self, tax: Rate) -> Money {
        self.scale_bps(BPS_SCALE + tax.bps() as i64)
    }

    /// Divides tax out of a tax-inclusive amount.
    pub fn without_tax(&self, tax: Rate) -> Money {
        Money(div_round(
            self.0 as i128 * BPS_SCALE as i128,
            (BPS_SCALE + tax.bps() as i64) as i128,
        ))
    }

    /// Grosses an amount up over the remaining headroom: `self ÷ (headroom / 10000)`.
    ///
    /// This is the `cost ÷ (1 − margin)` step of every price derivation.
    /// Returns `None` when the headroom is not positive.
    pub fn gross_up(&self, headroom_bps: i64) -> Option<Money> {
        if headroom_bps <= 0 {
            return None;
        }
        Some(Money(div_round(
            self.0 as i128 * BPS_SCALE as i128,
            headroom_bps as i128,
        )))
    }

    /// Splits the amount into `parts` equal shares, rounded to the nearest cent.
    ///
    /// Returns zero for zero parts; callers treat a missing divisor as "no cost".
    pub fn split(&self, parts: u32) -> Money {
        if parts == 0 {
            return Money::zero();
        }
        Money(div_round(self.0 as i128, parts as i128))
    }

    /// Divides by a quantity given in hundredths (140 = 1.4 units).
    pub fn split_hundredths(&self, parts_x100: u32) -> Money {
        if parts_x100 == 0 {
            return Money::zero();
        }
        Money(div_round(self.0 as i128 * 100, parts_x100 as i128))
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Rounds down to a multiple of `unit_cents`.
    pub fn floor_to(&self, unit_cents: i64) -> Money {
        if unit_cents <= 0 {
            return *self;
        }
        Money(self.0.div_euclid(unit_cents) * unit_cents)
    }

    /// Rounds up to a multiple of `unit_cents`.
    pub fn ceil_to(&self, unit_cents: i64) -> Money {
        if unit_cents <= 0 {
            return *self;
        }
        let floored = self.0.div_euclid(unit_cents) * unit_cents;
        if floored == self.0 {
            *self
        } else {
            Money(floored.saturating_add(unit_cents))
        }
    }

    /// Relative change from `self` to `target` in basis points, rounded.
    ///
    /// Returns `None` when `self` is not positive.
    pub fn change_bps_to(&self, target: Money) -> Option<i64> {
        if self.0 <= 0 {
            return None;
        }
        Some(div_round(
            (target.0 as i128 - self.0 as i128) * BPS_SCALE as i128,
            self.0 as i128,
        ))
    }

    /// Whether moving from `self` to `target` rises by at most `limit`.
    ///
    /// Compared exactly by cross-multiplication, so a change that only
    /// rounds to `limit` does not count. `false` when `self` is not positive.
    pub fn increase_within(&self, target: Money, limit: Rate) -> bool {
        if self.0 <= 0 {
            return false;
        }
        (target.0 as i128 - self.0 as i128) * BPS_SCALE as i128
            <= limit.bps() as i128 * self.0 as i128
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================
//
// Arithmetic saturates at the i64 range. Validated inputs stay far below it;
// the saturation keeps an unvalidated extreme from panicking mid-batch.

/// Debug-friendly rendering. Front-ends localize for display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}€{}.{:02}", sign, self.euros().abs(), self.cents_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: u32) -> Self {
        Money(self.0.saturating_mul(qty as i64))
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
