// 4.0: bonding curve. pure functions, no engine state.
// 4.1 derives virtual balances from the physical reserves and the oracle price.
// 4.2 solves the quadratic for collateral in/out. 4.3 is the fee rule.
//
// with virtual balances (own, other) for the traded token and its complement:
//   sell X: c = (s - sqrt(s^2 - 4*X*other)) / 2,   s = X + own + other
//   buy  X: c = (sqrt(s^2 + 4*X*other) + X - own - other) / 2,   s = |own + other - X|

use serde::{Deserialize, Serialize};

/// Cap on the fee as a percentage of the premium-side collateral.
pub const COLLATERAL_FEE_CAP_PERCENT: f64 = 12.5;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveError {
    #[error("Negative discriminant {discriminant} in curve solve")]
    NegativeDiscriminant { discriminant: f64 },

    #[error("Non-finite {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VirtualReserves {
    pub b_token: f64,
    pub w_token: f64,
}

// 4.1: the pool can always mint pairs against collateral, so each side's capacity
// is its physical reserve plus the whole collateral reserve. the cheaper token anchors
// at its capacity and the other is scaled so that w/b == Pb/Pw exactly; if that
// overshoots the other side's capacity, anchor on the other side instead.
pub fn virtual_reserves(
    b_token_reserve: f64,
    w_token_reserve: f64,
    collateral_reserve: f64,
    b_token_price: f64,
) -> Result<VirtualReserves, CurveError> {
    let b_max = b_token_reserve + collateral_reserve;
    let w_max = w_token_reserve + collateral_reserve;

    let b_price = b_token_price;
    let w_price = 1.0 - b_token_price;

    let (b_virtual, w_virtual) = if b_price <= w_price {
        let mut b_virtual = b_max;
        let mut w_virtual = b_virtual * b_price / w_price;
        if w_virtual > w_max {
            w_virtual = w_max;
            b_virtual = w_virtual * w_price / b_price;
        }
        (b_virtual, w_virtual)
    } else {
        let mut w_virtual = w_max;
        let mut b_virtual = w_virtual * w_price / b_price;
        if b_virtual > b_max {
            b_virtual = b_max;
            w_virtual = b_virtual * b_price / w_price;
        }
        (b_virtual, w_virtual)
    };

    ensure_finite("virtual bToken balance", b_virtual)?;
    ensure_finite("virtual wToken balance", w_virtual)?;

    Ok(VirtualReserves {
        b_token: b_virtual,
        w_token: w_virtual,
    })
}

// 4.2: collateral paid out to a trader selling `amount` of the token with virtual balance `own`
pub fn collateral_out(amount: f64, own: f64, other: f64) -> Result<f64, CurveError> {
    let to_square = amount + own + other;
    let discriminant = to_square * to_square - 4.0 * amount * other;
    if discriminant < 0.0 {
        return Err(CurveError::NegativeDiscriminant { discriminant });
    }
    let collateral = (to_square - discriminant.sqrt()) / 2.0;
    ensure_finite("collateral out", collateral)
}

// collateral charged to a trader buying `amount` of the token with virtual balance `own`
pub fn collateral_in(amount: f64, own: f64, other: f64) -> Result<f64, CurveError> {
    let to_square = (own + other - amount).abs();
    let discriminant = to_square * to_square + 4.0 * amount * other;
    if discriminant < 0.0 {
        return Err(CurveError::NegativeDiscriminant { discriminant });
    }
    let collateral = (discriminant.sqrt() + amount - own - other) / 2.0;
    ensure_finite("collateral in", collateral)
}

// 4.3: the lesser of a notional fee and a cap on the premium-side collateral
pub fn calc_fee(notional: f64, premium_collateral: f64, fee_percent: f64, cap_percent: f64) -> f64 {
    let notional_fee = notional * fee_percent / 100.0;
    let collateral_fee = premium_collateral * cap_percent / 100.0;
    notional_fee.min(collateral_fee)
}

fn ensure_finite(what: &'static str, value: f64) -> Result<f64, CurveError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CurveError::NonFinite { what, value })
    }
}
