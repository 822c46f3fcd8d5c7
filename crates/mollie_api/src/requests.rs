//! Outbound request payloads. Builders accumulate optional fields and the
//! serialized form omits anything absent; the provider expects optional
//! fields to be missing rather than `null`. Empty strings are normalized to
//! absent at the setter, while zero amounts and empty collections survive
//! when a caller sets them deliberately.

use serde::Serialize;

use crate::{
    resources::{MollieMethod, SequenceType},
    types::{Address, Amount, Lines},
};

fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Payload of `POST /payments`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: Amount,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Lines>,
    /// `YYYY-MM-DD`, bank-transfer style methods only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_type: Option<SequenceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mandate_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl PaymentRequest {
    pub fn new(amount: Amount, description: impl Into<String>) -> Self {
        Self {
            amount,
            description: description.into(),
            redirect_url: None,
            webhook_url: None,
            method: None,
            locale: None,
            issuer: None,
            billing_email: None,
            billing_address: None,
            lines: None,
            due_date: None,
            customer_id: None,
            sequence_type: None,
            mandate_id: None,
            consumer_name: None,
            consumer_account: None,
            card_token: None,
            metadata: None,
        }
    }

    pub fn set_redirect_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.redirect_url = non_empty(url);
        self
    }

    pub fn set_webhook_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.webhook_url = non_empty(url);
        self
    }

    /// Accepts a raw method identifier so an unmapped host method can still
    /// be forwarded verbatim (the provider may recognize identifiers this
    /// crate's mapping table lacks).
    pub fn set_method_raw(&mut self, method: impl Into<String>) -> &mut Self {
        self.method = non_empty(method);
        self
    }

    pub fn set_method(&mut self, method: MollieMethod) -> &mut Self {
        self.method = Some(method.to_string());
        self
    }

    /// Recurring payments carry no method; the provider charges whatever the
    /// stored mandate dictates.
    pub fn clear_method(&mut self) -> &mut Self {
        self.method = None;
        self
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) -> &mut Self {
        self.locale = non_empty(locale);
        self
    }

    pub fn set_issuer(&mut self, issuer: impl Into<String>) -> &mut Self {
        self.issuer = non_empty(issuer);
        self
    }

    pub fn set_billing_email(&mut self, email: impl Into<String>) -> &mut Self {
        self.billing_email = non_empty(email);
        self
    }

    pub fn set_billing_address(&mut self, address: Address) -> &mut Self {
        self.billing_address = Some(address);
        self
    }

    pub fn set_lines(&mut self, lines: Lines) -> &mut Self {
        if !lines.is_empty() {
            self.lines = Some(lines);
        }
        self
    }

    pub fn set_due_date(&mut self, due_date: impl Into<String>) -> &mut Self {
        self.due_date = non_empty(due_date);
        self
    }

    pub fn set_customer_id(&mut self, customer_id: impl Into<String>) -> &mut Self {
        self.customer_id = non_empty(customer_id);
        self
    }

    pub fn set_sequence_type(&mut self, sequence_type: SequenceType) -> &mut Self {
        self.sequence_type = Some(sequence_type);
        self
    }

    pub fn set_mandate_id(&mut self, mandate_id: impl Into<String>) -> &mut Self {
        self.mandate_id = non_empty(mandate_id);
        self
    }

    pub fn set_consumer_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.consumer_name = non_empty(name);
        self
    }

    pub fn set_consumer_account(&mut self, account: impl Into<String>) -> &mut Self {
        self.consumer_account = non_empty(account);
        self
    }

    pub fn set_card_token(&mut self, token: impl Into<String>) -> &mut Self {
        self.card_token = non_empty(token);
        self
    }

    pub fn set_metadata(&mut self, metadata: serde_json::Value) -> &mut Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn sequence_type(&self) -> SequenceType {
        self.sequence_type.unwrap_or_default()
    }
}

/// Payload of `POST /payments/{id}/refunds`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl RefundRequest {
    pub fn new(amount: Amount) -> Self {
        Self { amount, description: None, metadata: None }
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = non_empty(description);
        self
    }

    pub fn set_metadata(&mut self, metadata: serde_json::Value) -> &mut Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Payload of `POST /customers`.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl CustomerRequest {
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = non_empty(name);
        self
    }

    pub fn set_email(&mut self, email: impl Into<String>) -> &mut Self {
        self.email = non_empty(email);
        self
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) -> &mut Self {
        self.locale = non_empty(locale);
        self
    }
}

/// Payload of `POST /customers/{id}/mandates`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MandateRequest {
    pub method: MollieMethod,
    pub consumer_name: String,
    pub consumer_account: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_bic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mandate_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_date: Option<String>,
}

impl MandateRequest {
    pub fn sepa(consumer_name: impl Into<String>, consumer_account: impl Into<String>) -> Self {
        Self {
            method: MollieMethod::Directdebit,
            consumer_name: consumer_name.into(),
            consumer_account: consumer_account.into(),
            consumer_bic: None,
            mandate_reference: None,
            signature_date: None,
        }
    }
}
