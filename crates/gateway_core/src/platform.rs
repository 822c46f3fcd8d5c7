use commerce_types::{HostPayment, HostSubscription};

use crate::errors::{CustomResult, StorageError};

/// A host payment together with the subscriptions it charges for. Loaded as
/// a unit so reconciliation sees and saves consistent state.
#[derive(Clone, Debug, Default)]
pub struct PaymentBundle {
    pub payment: HostPayment,
    pub subscriptions: Vec<HostSubscription>,
}

/// Everything the orchestrator needs from the host commerce platform.
#[async_trait::async_trait]
pub trait CommercePlatform: Send + Sync {
    /// Looks up the host payment a provider transaction id belongs to.
    async fn find_payment_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> CustomResult<Option<u64>, StorageError>;

    async fn load_payment(
        &self,
        payment_id: u64,
    ) -> CustomResult<Option<PaymentBundle>, StorageError>;

    /// Persists the bundle atomically. Reconciliation mutates in memory and
    /// saves once at the end.
    async fn persist(&self, bundle: &PaymentBundle) -> CustomResult<(), StorageError>;

    /// Merchant-facing payment description. Hosts override this to apply
    /// their own templating; the order number is the default.
    fn payment_description(&self, payment: &HostPayment) -> String {
        format!("Order {}", payment.order_number)
    }

    /// Where the customer lands after hosted checkout.
    fn redirect_url(&self, payment: &HostPayment) -> String;

    /// Publicly reachable webhook URL for this payment.
    fn webhook_url(&self, payment: &HostPayment) -> String;
}
