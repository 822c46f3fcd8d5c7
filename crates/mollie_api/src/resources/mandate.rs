use commerce_types::Mode;
use serde::Deserialize;
use time::OffsetDateTime;

use super::method::MollieMethod;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MandateStatus {
    #[default]
    Pending,
    Valid,
    Invalid,
    #[serde(other)]
    #[strum(serialize = "unknown")]
    Unknown,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MandateDetails {
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
    pub card_label: Option<String>,
}

/// A mandate (`mdt_…`) authorizing recurring charges against a customer's
/// account.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mandate {
    pub id: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub status: MandateStatus,
    #[serde(default)]
    pub method: Option<MollieMethod>,
    #[serde(default)]
    pub details: MandateDetails,
    #[serde(default)]
    pub mandate_reference: Option<String>,
    #[serde(default)]
    pub signature_date: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

impl Mandate {
    /// Pending mandates are accepted alongside valid ones: a SEPA mandate
    /// spends its first days pending while already being chargeable.
    pub fn is_usable(&self) -> bool {
        matches!(self.status, MandateStatus::Valid | MandateStatus::Pending)
    }

    /// Account-number match used when reusing a mandate for a one-off
    /// direct-debit payment.
    pub fn matches_account(&self, account: &str) -> bool {
        self.details
            .consumer_account
            .as_deref()
            .map(|known| known.eq_ignore_ascii_case(account.trim()))
            .unwrap_or(false)
    }
}
