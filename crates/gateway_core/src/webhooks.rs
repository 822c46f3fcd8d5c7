//! Inbound provider notifications. A notification only says "something
//! changed about transaction X"; the handler resolves the host payment and
//! runs a full status sync.

use error_stack::ResultExt;

use crate::{
    errors::{CoreError, CustomResult},
    events::GatewayEvent,
    payments::MollieGateway,
    platform::PaymentBundle,
};

/// The identifiers a notification carries. The path-shaped route supplies
/// the host payment id; the legacy query-string route may only carry the
/// provider transaction id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WebhookNotification {
    pub transaction_id: Option<String>,
    pub payment_id: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    Processed { payment_id: u64 },
    /// The ids did not resolve to a known payment. Deliberately
    /// success-shaped so a probing caller cannot distinguish valid from
    /// invalid transaction ids.
    Acknowledged,
}

impl MollieGateway {
    #[tracing::instrument(skip_all)]
    pub async fn handle_notification(
        &self,
        notification: WebhookNotification,
    ) -> CustomResult<WebhookOutcome, CoreError> {
        let Some(mut bundle) = self.resolve_bundle(&notification).await? else {
            tracing::debug!(?notification, "notification did not resolve to a payment; acknowledged");
            return Ok(WebhookOutcome::Acknowledged);
        };
        let payment_id = bundle.payment.id;
        // A payment started before its first reconciliation only learns its
        // transaction id from the notification itself.
        if bundle.payment.transaction_id.is_none() {
            bundle.payment.transaction_id = notification.transaction_id.clone();
        }
        let Some(transaction_id) = bundle.payment.transaction_id.clone() else {
            tracing::debug!(payment_id, "payment has no transaction id to sync against; acknowledged");
            return Ok(WebhookOutcome::Acknowledged);
        };
        bundle.payment.note(format!("Webhook received for transaction {transaction_id}"));
        self.events.publish(GatewayEvent::WebhookReceived { payment_id, transaction_id });
        self.update_status(&mut bundle).await?;
        Ok(WebhookOutcome::Processed { payment_id })
    }

    async fn resolve_bundle(
        &self,
        notification: &WebhookNotification,
    ) -> CustomResult<Option<PaymentBundle>, CoreError> {
        if let Some(payment_id) = notification.payment_id {
            if let Some(bundle) = self
                .platform
                .load_payment(payment_id)
                .await
                .change_context(CoreError::Storage)?
            {
                return Ok(Some(bundle));
            }
        }
        let Some(transaction_id) = notification.transaction_id.as_deref() else {
            return Ok(None);
        };
        let Some(payment_id) = self
            .platform
            .find_payment_by_transaction_id(transaction_id)
            .await
            .change_context(CoreError::Storage)?
        else {
            return Ok(None);
        };
        self.platform.load_payment(payment_id).await.change_context(CoreError::Storage)
    }
}
