use std::time::Duration;

/// Host metadata key holding the provider customer id (`cst_*`).
pub const META_CUSTOMER_ID: &str = "mollie_customer_id";
/// Host metadata key holding the provider mandate id (`mdt_*`).
pub const META_MANDATE_ID: &str = "mollie_mandate_id";
/// Host metadata key marking a payment as a `recurring` sequence charge.
/// Written by the host's renewal flow, never by reconciliation.
pub const META_SEQUENCE_TYPE: &str = "mollie_sequence_type";
/// Host metadata key counting failed start attempts for a recurring charge.
pub const META_START_ATTEMPTS: &str = "mollie_start_attempts";
/// Host metadata key for the provider's change-payment-state checkout URL.
pub const META_CHANGE_PAYMENT_STATE_URL: &str = "mollie_change_payment_state_url";
/// Host metadata key carrying a pre-tokenized card from the checkout form.
pub const META_CARD_TOKEN: &str = "mollie_card_token";
/// Host metadata key carrying the issuer chosen in the checkout form.
pub const META_ISSUER: &str = "mollie_issuer";

/// Marker value stored under [`META_SEQUENCE_TYPE`] for renewal charges.
pub const SEQUENCE_RECURRING: &str = "recurring";

/// Failed start attempts after which a recurring charge is abandoned.
pub const MAX_START_ATTEMPTS: u8 = 4;

/// How long a fetched payment-method list stays fresh.
pub const METHODS_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
