use std::time::Duration;

use commerce_types::HostPaymentStatus;

/// Notifications the orchestrator emits for the host platform to react to
/// (emails, fulfillment, audit trails). Publishing must be cheap and must
/// not fail; a bus that forwards asynchronously should buffer internally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayEvent {
    PaymentStatusUpdated {
        payment_id: u64,
        status: HostPaymentStatus,
    },
    /// Emitted exactly once per transition into a successful status.
    PaymentFulfilled { payment_id: u64 },
    WebhookReceived {
        payment_id: u64,
        transaction_id: String,
    },
    PaymentRetryScheduled {
        payment_id: u64,
        attempt: u8,
        delay: Duration,
    },
}

pub trait EventBus: Send + Sync {
    fn publish(&self, event: GatewayEvent);
}

/// Bus that drops every event. Useful for tools and tests that do not care
/// about side effects.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn publish(&self, _event: GatewayEvent) {}
}
