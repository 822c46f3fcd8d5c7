use async_trait::async_trait;

use crate::{
    errors::{ClientError, CustomResult},
    requests::{CustomerRequest, MandateRequest, PaymentRequest, RefundRequest},
    resources::{
        Chargeback, Customer, Mandate, MethodResource, Payment, Profile, Refund, SequenceType,
    },
    types::Amount,
};

/// Typed provider operations. `MollieClient` is the production
/// implementation; tests script their own. None of these retry: retry
/// policy belongs to the orchestrator, because only some failure classes on
/// some payment types are safe to retry.
#[async_trait]
pub trait MollieApi: Send + Sync {
    async fn create_payment(&self, request: &PaymentRequest)
        -> CustomResult<Payment, ClientError>;

    async fn get_payment(&self, payment_id: &str) -> CustomResult<Payment, ClientError>;

    async fn create_customer(
        &self,
        request: &CustomerRequest,
    ) -> CustomResult<Customer, ClientError>;

    /// `Ok(None)` when the provider answers 410 Gone: a soft-deleted
    /// customer is an expected absence, not a failure.
    async fn get_customer(&self, customer_id: &str)
        -> CustomResult<Option<Customer>, ClientError>;

    async fn create_mandate(
        &self,
        customer_id: &str,
        request: &MandateRequest,
    ) -> CustomResult<Mandate, ClientError>;

    async fn get_mandate(
        &self,
        customer_id: &str,
        mandate_id: &str,
    ) -> CustomResult<Mandate, ClientError>;

    async fn list_mandates(&self, customer_id: &str) -> CustomResult<Vec<Mandate>, ClientError>;

    async fn create_refund(
        &self,
        payment_id: &str,
        request: &RefundRequest,
    ) -> CustomResult<Refund, ClientError>;

    async fn list_payment_refunds(
        &self,
        payment_id: &str,
    ) -> CustomResult<Vec<Refund>, ClientError>;

    async fn list_payment_chargebacks(
        &self,
        payment_id: &str,
    ) -> CustomResult<Vec<Chargeback>, ClientError>;

    async fn list_payment_methods(
        &self,
        amount: Option<&Amount>,
        sequence_type: Option<SequenceType>,
    ) -> CustomResult<Vec<MethodResource>, ClientError>;

    async fn get_profile(&self, profile_id: &str) -> CustomResult<Profile, ClientError>;
}
