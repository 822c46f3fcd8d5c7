use async_trait::async_trait;
use commerce_types::Mode;
use error_stack::{report, ResultExt};
use masking::{PeekInterface, Secret};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{
    api::MollieApi,
    consts,
    errors::{ApiErrorBody, ClientError, CustomResult},
    requests::{CustomerRequest, MandateRequest, PaymentRequest, RefundRequest},
    resources::{
        Chargeback, Customer, ListEnvelope, Mandate, MethodResource, Payment, Profile, Refund,
        SequenceType,
    },
    types::Amount,
};

/// Authenticated HTTP client for the provider API. Bearer-token auth, JSON
/// bodies, `_links.next` pagination with a hard page cap. The transport
/// timeout lives on the inner `reqwest::Client`; a timeout surfaces as a
/// transport failure, never as a provider error.
#[derive(Clone, Debug)]
pub struct MollieClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Secret<String>,
}

impl MollieClient {
    pub fn new(http: reqwest::Client, api_key: Secret<String>) -> Self {
        Self { http, base_url: consts::BASE_URL.to_string(), api_key }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Test or live, derived from the key prefix.
    pub fn mode(&self) -> Mode {
        if self.api_key.peek().starts_with(consts::LIVE_KEY_PREFIX) {
            Mode::Live
        } else {
            Mode::Test
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// One transported round-trip. A 2xx body is decoded as `T`; a non-2xx
    /// body is decoded as the provider's structured error and raised as
    /// `ClientError::Api`, distinct from transport failures.
    async fn send<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: reqwest::Method,
        url: String,
        body: Option<&B>,
    ) -> CustomResult<T, ClientError> {
        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(self.api_key.peek());
        if let Some(body) = body {
            let body = serde_json::to_vec(body).change_context(ClientError::RequestEncoding)?;
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }
        let response = request.send().await.change_context(ClientError::Transport)?;
        let status = response.status();
        let bytes = response.bytes().await.change_context(ClientError::Transport)?;
        tracing::debug!(%method, %url, status = status.as_u16(), "provider call");
        if !status.is_success() {
            let body = serde_json::from_slice::<ApiErrorBody>(&bytes).unwrap_or_else(|_| {
                ApiErrorBody {
                    status: status.as_u16(),
                    title: status.canonical_reason().unwrap_or("Unknown").to_string(),
                    detail: String::from_utf8_lossy(&bytes).into_owned(),
                    field: None,
                }
            });
            return Err(report!(ClientError::Api(body)));
        }
        serde_json::from_slice(&bytes).change_context(ClientError::ResponseDecoding)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> CustomResult<T, ClientError> {
        self.send::<T, ()>(reqwest::Method::GET, url, None).await
    }

    /// Drains a paginated collection by following `_links.next.href`
    /// iteratively, capped at [`consts::PAGINATION_PAGE_CAP`] hops.
    async fn list_all<T: DeserializeOwned>(
        &self,
        first_url: String,
    ) -> CustomResult<Vec<T>, ClientError> {
        let mut items = Vec::new();
        let mut url = Some(first_url);
        for _ in 0..consts::PAGINATION_PAGE_CAP {
            let Some(current) = url.take() else { break };
            let envelope: ListEnvelope<T> = self.get_json(current).await?;
            url = envelope.next_href().map(str::to_string);
            items.extend(envelope.into_items());
        }
        if url.is_some() {
            tracing::warn!("pagination cap reached before the collection was drained");
        }
        Ok(items)
    }
}

#[async_trait]
impl MollieApi for MollieClient {
    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> CustomResult<Payment, ClientError> {
        self.send(reqwest::Method::POST, self.url("payments"), Some(request)).await
    }

    async fn get_payment(&self, payment_id: &str) -> CustomResult<Payment, ClientError> {
        self.get_json(self.url(&format!("payments/{payment_id}"))).await
    }

    async fn create_customer(
        &self,
        request: &CustomerRequest,
    ) -> CustomResult<Customer, ClientError> {
        self.send(reqwest::Method::POST, self.url("customers"), Some(request)).await
    }

    async fn get_customer(
        &self,
        customer_id: &str,
    ) -> CustomResult<Option<Customer>, ClientError> {
        let result: CustomResult<Customer, ClientError> =
            self.get_json(self.url(&format!("customers/{customer_id}"))).await;
        match result {
            Ok(customer) => Ok(Some(customer)),
            Err(error) if error.current_context().api_status() == Some(consts::HTTP_GONE) => {
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    async fn create_mandate(
        &self,
        customer_id: &str,
        request: &MandateRequest,
    ) -> CustomResult<Mandate, ClientError> {
        self.send(
            reqwest::Method::POST,
            self.url(&format!("customers/{customer_id}/mandates")),
            Some(request),
        )
        .await
    }

    async fn get_mandate(
        &self,
        customer_id: &str,
        mandate_id: &str,
    ) -> CustomResult<Mandate, ClientError> {
        self.get_json(self.url(&format!("customers/{customer_id}/mandates/{mandate_id}"))).await
    }

    async fn list_mandates(&self, customer_id: &str) -> CustomResult<Vec<Mandate>, ClientError> {
        self.list_all(self.url(&format!("customers/{customer_id}/mandates"))).await
    }

    async fn create_refund(
        &self,
        payment_id: &str,
        request: &RefundRequest,
    ) -> CustomResult<Refund, ClientError> {
        self.send(
            reqwest::Method::POST,
            self.url(&format!("payments/{payment_id}/refunds")),
            Some(request),
        )
        .await
    }

    async fn list_payment_refunds(
        &self,
        payment_id: &str,
    ) -> CustomResult<Vec<Refund>, ClientError> {
        self.list_all(self.url(&format!("payments/{payment_id}/refunds"))).await
    }

    async fn list_payment_chargebacks(
        &self,
        payment_id: &str,
    ) -> CustomResult<Vec<Chargeback>, ClientError> {
        self.list_all(self.url(&format!("payments/{payment_id}/chargebacks"))).await
    }

    async fn list_payment_methods(
        &self,
        amount: Option<&Amount>,
        sequence_type: Option<SequenceType>,
    ) -> CustomResult<Vec<MethodResource>, ClientError> {
        let mut query = Vec::new();
        if let Some(amount) = amount {
            query.push(format!("amount[currency]={}", amount.currency));
            query.push(format!("amount[value]={}", amount.value));
        }
        if let Some(sequence_type) = sequence_type {
            query.push(format!("sequenceType={sequence_type}"));
        }
        let path = if query.is_empty() {
            "methods".to_string()
        } else {
            format!("methods?{}", query.join("&"))
        };
        let envelope: ListEnvelope<MethodResource> = self.get_json(self.url(&path)).await?;
        Ok(envelope.into_items())
    }

    async fn get_profile(&self, profile_id: &str) -> CustomResult<Profile, ClientError> {
        self.get_json(self.url(&format!("profiles/{profile_id}"))).await
    }
}
