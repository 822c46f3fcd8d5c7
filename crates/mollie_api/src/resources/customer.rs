use commerce_types::Mode;
use serde::Deserialize;
use time::OffsetDateTime;

/// A provider customer (`cst_…`). Soft-deleted customers answer 410 Gone and
/// are surfaced as `None` by the client, not as an error.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}
