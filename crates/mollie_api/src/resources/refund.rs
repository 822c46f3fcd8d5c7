use serde::Deserialize;
use time::OffsetDateTime;

use crate::types::Amount;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RefundStatus {
    Queued,
    #[default]
    Pending,
    Processing,
    Refunded,
    Failed,
    Canceled,
    #[serde(other)]
    #[strum(serialize = "unknown")]
    Unknown,
}

/// A refund (`re_…`) attached to a payment.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub id: String,
    pub amount: Amount,
    #[serde(default)]
    pub status: RefundStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}
