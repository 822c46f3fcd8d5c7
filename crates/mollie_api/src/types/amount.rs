use std::str::FromStr;

use commerce_types::{Currency, MinorUnit};
use error_stack::report;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};

use crate::errors::{ClientError, CustomResult};

/// A provider amount: ISO currency plus a decimal string with
/// currency-correct scale. The value is deliberately a string end to end so
/// no float ever touches the money path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub currency: Currency,
    pub value: String,
}

impl Amount {
    /// Projects integer minor units to the provider's decimal string, e.g.
    /// `(EUR, 1099)` → `"10.99"`, `(BHD, 1099)` → `"1.099"`, `(JPY, 1099)` →
    /// `"1099"`.
    pub fn from_minor(currency: Currency, amount: MinorUnit) -> Self {
        let scale = currency.minor_unit_scale();
        let value = Decimal::new(amount.get(), scale).to_string();
        Self { currency, value }
    }

    /// Inverse of [`Amount::from_minor`]. Fails on malformed decimals or a
    /// value that does not fit the currency scale.
    pub fn to_minor(&self) -> CustomResult<MinorUnit, ClientError> {
        let field_name = "amount.value";
        let decimal = Decimal::from_str(&self.value)
            .map_err(|_| report!(ClientError::InvalidValue { field_name }))?;
        let scale = self.currency.minor_unit_scale();
        let scaled = decimal
            .checked_mul(Decimal::from(10i64.pow(scale)))
            .ok_or_else(|| report!(ClientError::InvalidValue { field_name }))?;
        if scaled.fract() != Decimal::ZERO {
            return Err(report!(ClientError::InvalidValue { field_name }));
        }
        scaled
            .to_i64()
            .map(MinorUnit::new)
            .ok_or_else(|| report!(ClientError::InvalidValue { field_name }))
    }

    /// Numeric comparison against zero without leaving string/decimal land.
    pub fn is_positive(&self) -> bool {
        Decimal::from_str(&self.value)
            .map(|value| value > Decimal::ZERO)
            .unwrap_or(false)
    }
}
