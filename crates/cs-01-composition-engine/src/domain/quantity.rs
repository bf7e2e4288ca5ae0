//! Quantity value type
//!
//! An amount paired with a unit label. Arithmetic is only defined between
//! quantities that share the same unit; there is no conversion table.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by quantity arithmetic
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuantityError {
    /// Operands carry different unit labels
    #[error("Unit mismatch: {left} != {right}")]
    UnitMismatch { left: String, right: String },

    /// Unit price requested for a zero amount
    #[error("Division by zero: quantity of {unit} is 0")]
    DivisionByZero { unit: String },
}

/// Immutable amount + unit pair.
///
/// Serialized as `{"quantity": <amount>, "unit": <label>}`; `amount` is
/// accepted as an input alias.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    #[serde(rename = "quantity", alias = "amount")]
    pub amount: f64,
    pub unit: String,
}

impl Quantity {
    pub fn new(amount: f64, unit: impl Into<String>) -> Self {
        Self {
            amount,
            unit: unit.into(),
        }
    }

    /// Zero amount of the given unit
    pub fn zero(unit: impl Into<String>) -> Self {
        Self::new(0.0, unit)
    }

    /// Non-empty unit, finite non-negative amount
    pub fn is_valid(&self) -> bool {
        !self.unit.is_empty() && self.amount.is_finite() && self.amount >= 0.0
    }

    /// Two quantities are comparable only when their units are equal
    pub fn compatible(&self, other: &Quantity) -> bool {
        self.unit == other.unit
    }

    pub fn add(&self, other: &Quantity) -> Result<Quantity, QuantityError> {
        self.ensure_compatible(other)?;
        Ok(Quantity::new(self.amount + other.amount, self.unit.clone()))
    }

    pub fn scale(&self, factor: f64) -> Quantity {
        Quantity::new(self.amount * factor, self.unit.clone())
    }

    pub fn ensure_compatible(&self, other: &Quantity) -> Result<(), QuantityError> {
        if self.compatible(other) {
            Ok(())
        } else {
            Err(QuantityError::UnitMismatch {
                left: self.unit.clone(),
                right: other.unit.clone(),
            })
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.unit)
    }
}

/// Cost of one unit of `quantity`, i.e. `cost / quantity.amount`.
pub fn unit_price(cost: f64, quantity: &Quantity) -> Result<f64, QuantityError> {
    if quantity.amount == 0.0 {
        return Err(QuantityError::DivisionByZero {
            unit: quantity.unit.clone(),
        });
    }
    Ok(cost / quantity.amount)
}
