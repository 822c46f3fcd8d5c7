use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(rename = "type", default)]
    pub content_type: Option<String>,
}

/// `_links` of a payment resource. Presence of `refunds` or `chargebacks`
/// flags that the payment has at least one such record attached.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinks {
    #[serde(rename = "self", default)]
    pub self_: Option<Link>,
    #[serde(default)]
    pub checkout: Option<Link>,
    #[serde(default)]
    pub dashboard: Option<Link>,
    #[serde(default)]
    pub refunds: Option<Link>,
    #[serde(default)]
    pub chargebacks: Option<Link>,
    #[serde(default)]
    pub change_payment_state: Option<Link>,
    #[serde(default)]
    pub documentation: Option<Link>,
}

impl PaymentLinks {
    pub fn has_refunds(&self) -> bool {
        self.refunds.as_ref().map(|link| !link.href.is_empty()).unwrap_or(false)
    }

    pub fn has_chargebacks(&self) -> bool {
        self.chargebacks
            .as_ref()
            .map(|link| !link.href.is_empty())
            .unwrap_or(false)
    }
}
