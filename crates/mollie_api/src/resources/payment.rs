use commerce_types::Mode;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{links::PaymentLinks, method::MollieMethod};
use crate::types::Amount;

/// Provider payment lifecycle states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Open,
    Canceled,
    Pending,
    Authorized,
    Expired,
    Failed,
    Paid,
    /// A status this crate does not know. Mapped to "leave the host status
    /// unchanged" downstream.
    #[serde(other)]
    #[strum(serialize = "unknown")]
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SequenceType {
    #[default]
    Oneoff,
    First,
    Recurring,
}

/// Method-specific payment details. A typed allow-list of the keys the
/// reconciliation pass reads; anything else the provider sends is ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    #[serde(default)]
    pub consumer_name: Option<String>,
    #[serde(default)]
    pub consumer_account: Option<String>,
    #[serde(default)]
    pub consumer_bic: Option<String>,
    #[serde(default)]
    pub card_holder: Option<String>,
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub card_country_code: Option<String>,
    /// Wallet riding on a card rail, e.g. `applepay`.
    #[serde(default)]
    pub wallet: Option<MollieMethod>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub bank_account: Option<String>,
    #[serde(default)]
    pub bank_bic: Option<String>,
    #[serde(default)]
    pub transfer_reference: Option<String>,
    #[serde(default)]
    pub bank_reason_code: Option<String>,
    #[serde(default)]
    pub bank_reason: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub failure_message: Option<String>,
}

/// A payment resource snapshot. Never mutated locally; each fetch yields a
/// fresh snapshot that is reconciled onto the host payment.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub status: PaymentStatus,
    pub amount: Amount,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub method: Option<MollieMethod>,
    /// Opaque to this crate; the orchestrator owns the key conventions.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub sequence_type: SequenceType,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub mandate_id: Option<String>,
    #[serde(default)]
    pub details: Option<PaymentDetails>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub amount_refunded: Option<Amount>,
    #[serde(default)]
    pub amount_charged_back: Option<Amount>,
    #[serde(rename = "_links", default)]
    pub links: PaymentLinks,
}

impl Payment {
    pub fn checkout_url(&self) -> Option<&str> {
        self.links
            .checkout
            .as_ref()
            .map(|link| link.href.as_str())
            .filter(|href| !href.is_empty())
    }
}
