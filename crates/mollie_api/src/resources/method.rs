use serde::{Deserialize, Serialize};

use crate::types::Amount;

/// Payment method identifiers as the provider spells them.
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
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MollieMethod {
    Applepay,
    Bancontact,
    Banktransfer,
    Belfius,
    Creditcard,
    Directdebit,
    Eps,
    Giftcard,
    Giropay,
    Ideal,
    Kbc,
    Paypal,
    Przelewy24,
    Sofort,
    /// A method this crate does not know yet. Never serialized back.
    #[serde(other)]
    #[strum(serialize = "unknown")]
    Unknown,
}

/// One entry of the payment-methods listing, including the amount window the
/// method is available for.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodResource {
    pub id: MollieMethod,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub minimum_amount: Option<Amount>,
    #[serde(default)]
    pub maximum_amount: Option<Amount>,
}

impl MethodResource {
    /// Availability filter by order total, in provider decimal-string space.
    pub fn accepts(&self, amount: &Amount) -> bool {
        let within = |bound: &Option<Amount>, is_minimum: bool| match bound {
            None => true,
            Some(bound) => {
                match (bound.to_minor(), amount.to_minor()) {
                    (Ok(bound), Ok(amount)) if is_minimum => amount >= bound,
                    (Ok(bound), Ok(amount)) => amount <= bound,
                    // Malformed bound: do not hide the method over it.
                    _ => true,
                }
            }
        };
        within(&self.minimum_amount, true) && within(&self.maximum_amount, false)
    }
}
