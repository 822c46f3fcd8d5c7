use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::enums::{
    Currency, HostPaymentStatus, LineItemKind, MinorUnit, PaymentMethodKind, SubscriptionStatus,
};

/// Free-form per-entity metadata persisted by the host platform. The gateway
/// records provider identifiers and scheduling state here under the keys in
/// `gateway_core::consts`.
pub type Metadata = BTreeMap<String, String>;

/// The buyer as the host platform knows them. `user_id` is absent for guest
/// checkouts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HostCustomer {
    pub user_id: Option<u64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub locale: Option<String>,
}

/// Raw billing address as collected at checkout, before provider-side
/// normalization.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingAddress {
    pub given_name: String,
    pub family_name: String,
    pub email: String,
    pub street_and_number: String,
    pub street_additional: Option<String>,
    pub postal_code: Option<String>,
    pub city: String,
    pub region: Option<String>,
    /// ISO 3166-1 alpha-2.
    pub country: String,
    pub organization_name: Option<String>,
    pub title: Option<String>,
    pub phone: Option<String>,
}

/// One order line. Amounts are minor units; `vat_rate` is a decimal string
/// such as `"21.00"` because the host platform stores it that way.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub kind: Option<LineItemKind>,
    pub quantity: u32,
    pub unit_price: MinorUnit,
    pub total: MinorUnit,
    pub discount: Option<MinorUnit>,
    pub vat_rate: String,
    pub vat_amount: MinorUnit,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub image_url: Option<String>,
    pub product_url: Option<String>,
}

/// Consumer bank or card details surfaced by the provider after a payment,
/// kept on the host payment for admin display and mandate matching.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumerDetails {
    pub name: Option<String>,
    /// IBAN, or a masked card number for card payments.
    pub account: Option<String>,
    pub bic: Option<String>,
    pub country: Option<String>,
}

/// Where a bank-transfer customer must send the funds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BankTransferRecipient {
    pub name: Option<String>,
    pub iban: Option<String>,
    pub bic: Option<String>,
    pub reference: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureReason {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl FailureReason {
    pub fn is_empty(&self) -> bool {
        self.code.as_deref().unwrap_or_default().is_empty()
            && self.message.as_deref().unwrap_or_default().is_empty()
    }
}

/// A provider refund as mirrored on the host payment. `provider_id` is the
/// diffing key during reconciliation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HostRefundRecord {
    pub provider_id: String,
    pub amount: MinorUnit,
    pub status: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

/// A host-initiated refund request, pre-provider. The gateway writes
/// `provider_refund_id` back once the provider accepts it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HostRefund {
    pub id: u64,
    pub payment_id: u64,
    pub amount: MinorUnit,
    pub currency: Currency,
    pub description: Option<String>,
    pub provider_refund_id: Option<String>,
}

/// The host platform's payment entity, as far as the gateway touches it.
/// Owned by the platform; the gateway only updates fields during
/// reconciliation and start.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HostPayment {
    pub id: u64,
    pub order_number: String,
    pub amount: MinorUnit,
    pub currency: Currency,
    pub status: HostPaymentStatus,
    pub method: Option<PaymentMethodKind>,
    /// Provider payment ID (`tr_…`), set on the first reconciliation.
    pub transaction_id: Option<String>,
    pub customer: HostCustomer,
    pub billing_address: Option<BillingAddress>,
    pub lines: Vec<LineItem>,
    /// Account-holder name collected at checkout for SEPA payments.
    pub consumer_name: Option<String>,
    /// IBAN collected at checkout for SEPA payments.
    pub consumer_account: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expiry_date: Option<OffsetDateTime>,
    pub consumer_details: Option<ConsumerDetails>,
    pub bank_transfer_recipient: Option<BankTransferRecipient>,
    pub failure_reason: Option<FailureReason>,
    /// Where to send the customer next (provider checkout, or the host's own
    /// return page for non-interactive methods).
    pub action_url: Option<String>,
    pub charged_back: Option<MinorUnit>,
    pub total_refunded: Option<MinorUnit>,
    pub refunds: Vec<HostRefundRecord>,
    pub metadata: Metadata,
    pub notes: Vec<String>,
}

impl HostPayment {
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// First-write-wins metadata write. Returns whether the value was stored.
    pub fn set_meta_if_absent(&mut self, key: &str, value: impl Into<String>) -> bool {
        if self.metadata.contains_key(key) {
            return false;
        }
        self.metadata.insert(key.to_string(), value.into());
        true
    }

    pub fn set_meta(&mut self, key: &str, value: impl Into<String>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    pub fn clear_meta(&mut self, key: &str) {
        self.metadata.remove(key);
    }

    /// Appends an audit note, skipping exact duplicates so reconciliation
    /// stays idempotent under at-least-twice webhook delivery.
    pub fn note(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !self.notes.contains(&text) {
            self.notes.push(text);
        }
    }
}

/// A host subscription linked to a payment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HostSubscription {
    pub id: u64,
    pub status: SubscriptionStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub activated_at: Option<OffsetDateTime>,
    pub method: Option<PaymentMethodKind>,
    pub metadata: Metadata,
    pub notes: Vec<String>,
}

impl HostSubscription {
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn set_meta_if_absent(&mut self, key: &str, value: impl Into<String>) -> bool {
        if self.metadata.contains_key(key) {
            return false;
        }
        self.metadata.insert(key.to_string(), value.into());
        true
    }

    pub fn set_meta(&mut self, key: &str, value: impl Into<String>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    pub fn note(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !self.notes.contains(&text) {
            self.notes.push(text);
        }
    }
}
