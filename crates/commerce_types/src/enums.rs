use std::fmt;

use serde::{Deserialize, Serialize};

/// An amount expressed in the smallest unit of its currency (cents for EUR,
/// fils for BHD, whole yen for JPY). All money flowing through the gateway is
/// integer minor units; decimal strings only exist at the provider boundary.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MinorUnit(i64);

impl MinorUnit {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for MinorUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 currencies accepted by the provider.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Currency {
    Aed,
    Aud,
    Bgn,
    Bhd,
    Brl,
    Cad,
    Chf,
    Czk,
    Dkk,
    #[default]
    Eur,
    Gbp,
    Hkd,
    Huf,
    Ils,
    Isk,
    Jod,
    Jpy,
    Kwd,
    Nok,
    Nzd,
    Omr,
    Pln,
    Ron,
    Sek,
    Sgd,
    Tnd,
    Usd,
    Zar,
}

impl Currency {
    /// Number of digits after the decimal point in the currency's canonical
    /// decimal representation.
    pub const fn minor_unit_scale(self) -> u32 {
        match self {
            Self::Jpy | Self::Isk => 0,
            Self::Bhd | Self::Jod | Self::Kwd | Self::Omr | Self::Tnd => 3,
            _ => 2,
        }
    }

    /// Uppercase ISO code, e.g. `EUR`.
    pub fn iso_code(self) -> String {
        self.to_string()
    }
}

/// Host-visible lifecycle of a payment attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum HostPaymentStatus {
    #[default]
    Open,
    Success,
    Failure,
    Cancelled,
    Expired,
    Authorized,
}

impl HostPaymentStatus {
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Open)
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Host subscription lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Pending,
    Active,
    OnHold,
    Cancelled,
    Expired,
}

/// Payment methods as the host platform models them. The direct-debit
/// variants are "virtual" methods: the provider only knows `directdebit`,
/// but the host offers one gateway per interactive first-payment rail.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    ApplePay,
    Bancontact,
    BankTransfer,
    Belfius,
    CreditCard,
    DirectDebit,
    DirectDebitBancontact,
    DirectDebitIdeal,
    DirectDebitSofort,
    Eps,
    GiftCard,
    Giropay,
    Ideal,
    Kbc,
    PayPal,
    Przelewy24,
    Sofort,
}

impl PaymentMethodKind {
    /// True for the plain SEPA method and every virtual variant that settles
    /// through a SEPA mandate.
    pub const fn is_direct_debit(self) -> bool {
        matches!(
            self,
            Self::DirectDebit
                | Self::DirectDebitBancontact
                | Self::DirectDebitIdeal
                | Self::DirectDebitSofort
        )
    }

    /// The interactive method a customer uses to complete the bank handshake
    /// of a `first` sequence payment for a virtual direct-debit method.
    pub const fn underlying_first_method(self) -> Option<Self> {
        match self {
            Self::DirectDebitIdeal => Some(Self::Ideal),
            Self::DirectDebitBancontact => Some(Self::Bancontact),
            Self::DirectDebitSofort => Some(Self::Sofort),
            _ => None,
        }
    }
}

/// Kinds of order lines the host platform produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LineItemKind {
    Product,
    Digital,
    Shipping,
    Fee,
    Discount,
    GiftCard,
    Surcharge,
}

/// Whether the merchant account is operating against the provider's test or
/// live environment. Derived from the API key prefix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    #[default]
    Test,
    Live,
}

impl Mode {
    pub const fn is_test(self) -> bool {
        matches!(self, Self::Test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_scale_matches_iso() {
        assert_eq!(Currency::Eur.minor_unit_scale(), 2);
        assert_eq!(Currency::Bhd.minor_unit_scale(), 3);
        assert_eq!(Currency::Jpy.minor_unit_scale(), 0);
    }

    #[test]
    fn virtual_methods_expose_their_first_rail() {
        assert_eq!(
            PaymentMethodKind::DirectDebitIdeal.underlying_first_method(),
            Some(PaymentMethodKind::Ideal)
        );
        assert_eq!(PaymentMethodKind::Ideal.underlying_first_method(), None);
        assert!(PaymentMethodKind::DirectDebitSofort.is_direct_debit());
        assert!(!PaymentMethodKind::BankTransfer.is_direct_debit());
    }
}
