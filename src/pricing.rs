//! Cart pricing.
//!
//! Totals are derived on demand from live product prices. Nothing here touches
//! storage: callers resolve each line's current price first and pass `None` for
//! lines whose product could not be resolved.
//!
//! Intermediate sums stay exact; rounding to 2 dp (half-up) happens once, at output.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

const MONEY_SCALE: u32 = 2;

/// Largest listing price in minor units (1,00,00,000.00). Together with the cart
/// quantity cap this keeps every cart total far inside `Decimal`'s range.
pub const MAX_PRICE_MINOR: i64 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Fraction of the subtotal, e.g. `0.18` for 18%.
    pub tax_rate: Decimal,
    /// Charged once per non-empty cart.
    pub shipping_fee: Decimal,
    pub currency: String,
    pub currency_symbol: String,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(18, 2),
            shipping_fee: Decimal::new(4900, 2),
            currency: "INR".to_string(),
            currency_symbol: "₹".to_string(),
        }
    }
}

impl PricingPolicy {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tax_rate.is_sign_negative() || self.tax_rate > Decimal::ONE {
            anyhow::bail!("tax rate must be between 0 and 1, got {}", self.tax_rate);
        }
        if self.shipping_fee.is_sign_negative() {
            anyhow::bail!("shipping fee must not be negative, got {}", self.shipping_fee);
        }
        Ok(())
    }
}

/// One cart line as seen by the pricing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: Option<Decimal>,
    pub quantity: i32,
}

impl PricedLine {
    pub fn resolved(unit_price: Decimal, quantity: i32) -> Self {
        Self {
            unit_price: Some(unit_price),
            quantity,
        }
    }

    pub fn unresolved(quantity: i32) -> Self {
        Self {
            unit_price: None,
            quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub currency_symbol: String,
}

pub fn compute_totals(lines: &[PricedLine], policy: &PricingPolicy) -> CartTotals {
    let mut resolved = 0usize;
    let mut subtotal = Decimal::ZERO;
    for line in lines {
        if let Some(price) = line.unit_price {
            subtotal += price * Decimal::from(line.quantity);
            resolved += 1;
        }
    }

    let shipping = if resolved > 0 {
        policy.shipping_fee
    } else {
        Decimal::ZERO
    };
    let tax = subtotal * policy.tax_rate;

    let subtotal = round_money(subtotal);
    let shipping = round_money(shipping);
    let tax = round_money(tax);

    CartTotals {
        subtotal,
        shipping,
        tax,
        total: subtotal + shipping + tax,
        currency: policy.currency.clone(),
        currency_symbol: policy.currency_symbol.clone(),
    }
}

/// Half-up rounding to 2 dp with a fixed scale, so `49` renders as `49.00`.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Prices are stored in minor units (paise).
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, MONEY_SCALE)
}

pub fn to_minor_units(amount: Decimal) -> AppResult<i64> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AppError::invalid_input("price must not be negative"));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(AppError::invalid_input(
            "price must have at most 2 decimal places",
        ));
    }
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| minor.to_i64())
        .filter(|minor| *minor <= MAX_PRICE_MINOR)
        .ok_or_else(|| AppError::invalid_input("price is too large"))
}
