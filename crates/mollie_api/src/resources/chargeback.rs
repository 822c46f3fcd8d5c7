use serde::Deserialize;
use time::OffsetDateTime;

use crate::types::Amount;

/// A chargeback (`chb_…`) attached to a payment. `created_at` drives the
/// fraud-control cutoff for linked subscriptions.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chargeback {
    pub id: String,
    pub amount: Amount,
    #[serde(default)]
    pub reason: Option<ChargebackReason>,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub reversed_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChargebackReason {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
