//! The gateway state machine: start a provider payment for a host payment,
//! reconcile provider snapshots back onto host state, create refunds, and
//! re-run failed recurring charges from the scheduler.

use std::{
    collections::HashSet,
    fmt,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use commerce_types::{
    BankTransferRecipient, ConsumerDetails, FailureReason, HostPayment, HostRefund,
    HostRefundRecord, PaymentMethodKind, SubscriptionStatus,
};
use error_stack::{report, Report, ResultExt};
use mollie_api::{
    requests::{CustomerRequest, MandateRequest, PaymentRequest, RefundRequest},
    resources::{MethodResource, MollieMethod, Payment, PaymentStatus, SequenceType},
    transformers::{
        normalize_locale, to_host_methods, to_host_status, to_provider_lines, to_provider_method,
    },
    types::{Address, Amount},
    ClientError, MollieApi,
};
use time::{macros::format_description, Duration as TimeDuration, OffsetDateTime};

use crate::{
    consts,
    errors::{CoreError, CustomResult},
    events::{EventBus, GatewayEvent},
    platform::{CommercePlatform, PaymentBundle},
    scheduler::{self, RetryScheduler},
    settings::GatewaySettings,
    store::{IdentityStore, NewCustomer, NewProfile},
};

/// What `start` did for the host payment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// Provider payment created; the customer should be sent to
    /// `action_url` when one exists.
    Created { action_url: Option<String> },
    /// Transient recurring failure; a re-run is queued.
    RetryScheduled { attempt: u8, delay: Duration },
    /// A concurrent path already created the provider payment, or the host
    /// payment is already terminal.
    AlreadyStarted,
}

struct MethodsCacheEntry {
    fetched_at: Instant,
    sequence_type: Option<SequenceType>,
    methods: Vec<MethodResource>,
}

pub struct MollieGateway {
    api: Arc<dyn MollieApi>,
    store: Arc<dyn IdentityStore>,
    pub(crate) platform: Arc<dyn CommercePlatform>,
    scheduler: Arc<dyn RetryScheduler>,
    pub(crate) events: Arc<dyn EventBus>,
    settings: GatewaySettings,
    methods_cache: Mutex<Option<MethodsCacheEntry>>,
}

impl fmt::Debug for MollieGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MollieGateway").field("settings", &self.settings).finish_non_exhaustive()
    }
}

impl MollieGateway {
    pub fn new(
        api: Arc<dyn MollieApi>,
        store: Arc<dyn IdentityStore>,
        platform: Arc<dyn CommercePlatform>,
        scheduler: Arc<dyn RetryScheduler>,
        events: Arc<dyn EventBus>,
        settings: GatewaySettings,
    ) -> Self {
        Self { api, store, platform, scheduler, events, settings, methods_cache: Mutex::new(None) }
    }

    /// Creates the provider payment for a host payment and reconciles the
    /// resulting snapshot. Only recurring charges with a mandate are retried
    /// on 429/502/503; every other failure re-raises immediately.
    #[tracing::instrument(skip_all, fields(payment_id = bundle.payment.id))]
    pub async fn start(&self, bundle: &mut PaymentBundle) -> CustomResult<StartOutcome, CoreError> {
        let request = self.build_payment_request(bundle).await?;
        let retry_eligible =
            request.sequence_type() == SequenceType::Recurring && request.mandate_id.is_some();
        match self.api.create_payment(&request).await {
            Ok(snapshot) => {
                bundle.payment.clear_meta(consts::META_START_ATTEMPTS);
                tracing::info!(transaction_id = %snapshot.id, "provider payment created");
                self.reconcile(bundle, &snapshot).await?;
                self.persist(bundle).await?;
                Ok(StartOutcome::Created { action_url: bundle.payment.action_url.clone() })
            }
            Err(error) if retry_eligible && error.current_context().is_transient() => {
                self.schedule_start_retry(bundle, error).await
            }
            Err(error) => Err(error.change_context(CoreError::Provider)),
        }
    }

    /// Fetches the current provider snapshot and reconciles it.
    #[tracing::instrument(skip_all, fields(payment_id = bundle.payment.id))]
    pub async fn update_status(&self, bundle: &mut PaymentBundle) -> CustomResult<(), CoreError> {
        let transaction_id = bundle.payment.transaction_id.clone().ok_or_else(|| {
            report!(CoreError::MissingTransactionId { payment_id: bundle.payment.id })
        })?;
        let snapshot =
            self.api.get_payment(&transaction_id).await.change_context(CoreError::Provider)?;
        self.reconcile(bundle, &snapshot).await?;
        self.persist(bundle).await
    }

    /// Scheduled-task entry point for a previously failed recurring charge.
    /// Re-checks the attempt cap and the transaction id before re-running;
    /// the schedule is at-least-once and the payment may have succeeded
    /// through another path in the meantime.
    pub async fn retry_start(&self, payment_id: u64) -> CustomResult<StartOutcome, CoreError> {
        let mut bundle = self
            .platform
            .load_payment(payment_id)
            .await
            .change_context(CoreError::Storage)?
            .ok_or_else(|| report!(CoreError::PaymentNotFound { payment_id }))?;
        if bundle.payment.transaction_id.is_some() {
            tracing::info!(payment_id, "retry fired after the charge already exists; syncing");
            self.update_status(&mut bundle).await?;
            return Ok(StartOutcome::AlreadyStarted);
        }
        if bundle.payment.status.is_terminal() {
            return Ok(StartOutcome::AlreadyStarted);
        }
        if self.stored_attempts(&bundle.payment) > consts::MAX_START_ATTEMPTS {
            return Err(report!(CoreError::RetryAttemptsExhausted { payment_id }));
        }
        self.start(&mut bundle).await
    }

    /// Submits a host-initiated refund and records the provider refund id on
    /// it. The host payment must already carry a transaction id.
    pub async fn create_refund(
        &self,
        payment: &HostPayment,
        refund: &mut HostRefund,
    ) -> CustomResult<(), CoreError> {
        let transaction_id = payment
            .transaction_id
            .as_deref()
            .ok_or_else(|| report!(CoreError::MissingTransactionId { payment_id: payment.id }))?;
        let mut request = RefundRequest::new(Amount::from_minor(refund.currency, refund.amount));
        if let Some(description) = refund.description.as_deref() {
            request.set_description(description);
        }
        request.set_metadata(serde_json::json!({
            "host_payment_id": payment.id,
            "host_refund_id": refund.id,
        }));
        let created =
            self.api.create_refund(transaction_id, &request).await.change_context(CoreError::Provider)?;
        tracing::info!(payment_id = payment.id, refund_id = %created.id, "refund submitted");
        refund.provider_refund_id = Some(created.id);
        Ok(())
    }

    /// Candidate provider customer ids come from the payment's own metadata,
    /// every linked subscription, and the identity store rows connected to
    /// the host user. The first candidate the provider still knows wins; a
    /// 410-gone candidate is skipped, not fatal.
    pub async fn customer_id_for_payment(
        &self,
        bundle: &PaymentBundle,
    ) -> CustomResult<Option<String>, CoreError> {
        let mut candidates: Vec<String> = Vec::new();
        if let Some(id) = bundle.payment.meta(consts::META_CUSTOMER_ID) {
            candidates.push(id.to_string());
        }
        for subscription in &bundle.subscriptions {
            if let Some(id) = subscription.meta(consts::META_CUSTOMER_ID) {
                candidates.push(id.to_string());
            }
        }
        if let Some(user_id) = bundle.payment.customer.user_id {
            let mode = self.settings.mode();
            let linked =
                self.store.customers_for_user(user_id).await.change_context(CoreError::Storage)?;
            candidates.extend(
                linked.into_iter().filter(|row| row.mode == mode).map(|row| row.provider_id),
            );
        }
        let mut seen = HashSet::new();
        for candidate in candidates.into_iter().filter(|id| seen.insert(id.clone())) {
            match self.api.get_customer(&candidate).await {
                Ok(Some(_)) => return Ok(Some(candidate)),
                Ok(None) => {
                    tracing::debug!(customer_id = %candidate, "provider customer gone; trying next candidate");
                }
                Err(error) => return Err(error.change_context(CoreError::Provider)),
            }
        }
        Ok(None)
    }

    /// Available provider methods, optionally filtered by order total.
    /// Failures degrade to an empty list with a warning so checkout can
    /// still render; the result is cached briefly.
    pub async fn payment_methods(
        &self,
        amount: Option<&Amount>,
        sequence_type: Option<SequenceType>,
    ) -> Vec<MethodResource> {
        if let Some(methods) = self.cached_methods(sequence_type) {
            return Self::filter_methods(methods, amount);
        }
        match self.api.list_payment_methods(None, sequence_type).await {
            Ok(methods) => {
                if let Ok(mut cache) = self.methods_cache.lock() {
                    *cache = Some(MethodsCacheEntry {
                        fetched_at: Instant::now(),
                        sequence_type,
                        methods: methods.clone(),
                    });
                }
                Self::filter_methods(methods, amount)
            }
            Err(error) => {
                tracing::warn!(?error, "payment method listing failed; offering no provider methods");
                Vec::new()
            }
        }
    }

    fn cached_methods(&self, sequence_type: Option<SequenceType>) -> Option<Vec<MethodResource>> {
        let cache = self.methods_cache.lock().ok()?;
        let entry = cache.as_ref()?;
        if entry.sequence_type != sequence_type
            || entry.fetched_at.elapsed() >= consts::METHODS_CACHE_TTL
        {
            return None;
        }
        Some(entry.methods.clone())
    }

    fn filter_methods(methods: Vec<MethodResource>, amount: Option<&Amount>) -> Vec<MethodResource> {
        match amount {
            None => methods,
            Some(amount) => methods.into_iter().filter(|method| method.accepts(amount)).collect(),
        }
    }

    async fn build_payment_request(
        &self,
        bundle: &mut PaymentBundle,
    ) -> CustomResult<PaymentRequest, CoreError> {
        let amount = Amount::from_minor(bundle.payment.currency, bundle.payment.amount);
        let description = self.platform.payment_description(&bundle.payment);
        let mut request = PaymentRequest::new(amount, description);
        request
            .set_redirect_url(self.platform.redirect_url(&bundle.payment))
            .set_webhook_url(self.platform.webhook_url(&bundle.payment));
        if let Some(locale) =
            bundle.payment.customer.locale.as_deref().and_then(normalize_locale)
        {
            request.set_locale(locale);
        }
        if let Some(billing) = bundle.payment.billing_address.as_ref() {
            match Address::try_from(billing) {
                Ok(address) => {
                    request.set_billing_email(address.email.clone()).set_billing_address(address);
                }
                Err(error) => {
                    tracing::debug!(?error, "billing address incomplete; sending payment without it");
                }
            }
        }
        request.set_lines(to_provider_lines(&bundle.payment.lines, bundle.payment.currency));
        if let Some(issuer) = bundle.payment.meta(consts::META_ISSUER) {
            request.set_issuer(issuer.to_string());
        }
        if let Some(token) = bundle.payment.meta(consts::META_CARD_TOKEN) {
            request.set_card_token(token.to_string());
        }

        let host_method = bundle.payment.method;
        match host_method.map(|method| (method, to_provider_method(method))) {
            Some((_, Some(provider))) => {
                request.set_method(provider);
            }
            // The provider may recognize identifiers the mapping lacks.
            Some((method, None)) => {
                request.set_method_raw(method.to_string());
            }
            None => {}
        }
        if host_method.is_some_and(PaymentMethodKind::is_direct_debit) {
            if let Some(name) = bundle.payment.consumer_name.as_deref() {
                request.set_consumer_name(name);
            }
            if let Some(account) = bundle.payment.consumer_account.as_deref() {
                request.set_consumer_account(account);
            }
        }
        if host_method == Some(PaymentMethodKind::BankTransfer) {
            if let Some(days) = self.settings.due_date_days {
                request.set_due_date(due_date_from_today(days));
            }
        }

        let recurring =
            bundle.payment.meta(consts::META_SEQUENCE_TYPE) == Some(consts::SEQUENCE_RECURRING);
        let customer_id = self.resolve_customer(bundle, recurring).await?;
        if let Some(id) = customer_id.as_deref() {
            request.set_customer_id(id);
        }
        if recurring {
            request.set_sequence_type(SequenceType::Recurring).clear_method();
            if let Some(mandate_id) = bundle.payment.meta(consts::META_MANDATE_ID) {
                request.set_mandate_id(mandate_id.to_string());
            }
        } else if !bundle.subscriptions.is_empty()
            || host_method.and_then(PaymentMethodKind::underlying_first_method).is_some()
        {
            request.set_sequence_type(SequenceType::First);
            // The customer completes the bank handshake on the interactive
            // rail; settlement later runs over the mandate.
            if let Some(provider) = host_method
                .and_then(PaymentMethodKind::underlying_first_method)
                .and_then(to_provider_method)
            {
                request.set_method(provider);
            }
        }

        if request.sequence_type() == SequenceType::Oneoff
            && host_method == Some(PaymentMethodKind::DirectDebit)
            && bundle.payment.meta(consts::META_MANDATE_ID).is_none()
        {
            if let (Some(customer_id), Some(account)) =
                (customer_id.as_deref(), bundle.payment.consumer_account.clone())
            {
                self.prepare_oneoff_mandate(bundle, &mut request, customer_id, &account).await?;
            }
        }
        Ok(request)
    }

    /// One-off SEPA is not first-class at the provider: find or create a
    /// mandate for the consumer's account and charge it as `recurring`.
    async fn prepare_oneoff_mandate(
        &self,
        bundle: &mut PaymentBundle,
        request: &mut PaymentRequest,
        customer_id: &str,
        account: &str,
    ) -> CustomResult<(), CoreError> {
        let mandates =
            self.api.list_mandates(customer_id).await.change_context(CoreError::Provider)?;
        let mandate_id = match mandates
            .into_iter()
            .find(|mandate| mandate.is_usable() && mandate.matches_account(account))
        {
            Some(mandate) => mandate.id,
            None => {
                let name = bundle
                    .payment
                    .consumer_name
                    .clone()
                    .or_else(|| bundle.payment.customer.name.clone())
                    .unwrap_or_default();
                let created = self
                    .api
                    .create_mandate(customer_id, &MandateRequest::sepa(name, account))
                    .await
                    .change_context(CoreError::Provider)?;
                bundle
                    .payment
                    .note(format!("Created SEPA mandate {} for one-off direct debit", created.id));
                created.id
            }
        };
        bundle.payment.set_meta_if_absent(consts::META_MANDATE_ID, mandate_id.clone());
        request.set_sequence_type(SequenceType::Recurring).set_mandate_id(mandate_id).clear_method();
        Ok(())
    }

    async fn resolve_customer(
        &self,
        bundle: &mut PaymentBundle,
        recurring: bool,
    ) -> CustomResult<Option<String>, CoreError> {
        if let Some(existing) = self.customer_id_for_payment(bundle).await? {
            bundle.payment.set_meta_if_absent(consts::META_CUSTOMER_ID, existing.clone());
            return Ok(Some(existing));
        }
        if recurring {
            // A renewal cannot mint a fresh customer; the provider will
            // reject the charge and the error surfaces to the caller.
            return Ok(None);
        }
        let mut create = CustomerRequest::default();
        if let Some(name) = bundle.payment.customer.name.as_deref() {
            create.set_name(name);
        }
        if let Some(email) = bundle.payment.customer.email.as_deref() {
            create.set_email(email);
        }
        if let Some(locale) =
            bundle.payment.customer.locale.as_deref().and_then(normalize_locale)
        {
            create.set_locale(locale);
        }
        let customer =
            self.api.create_customer(&create).await.change_context(CoreError::Provider)?;
        tracing::info!(customer_id = %customer.id, "provider customer created");
        let local_id = self
            .store
            .save_customer(&NewCustomer {
                provider_id: customer.id.clone(),
                profile_local_id: None,
                mode: self.settings.mode(),
                name: customer.name.clone(),
                email: customer.email.clone(),
            })
            .await
            .change_context(CoreError::Storage)?;
        if let Some(user_id) = bundle.payment.customer.user_id {
            self.store
                .connect_customer_to_user(local_id, user_id)
                .await
                .change_context(CoreError::Storage)?;
        }
        bundle.payment.set_meta_if_absent(consts::META_CUSTOMER_ID, customer.id.clone());
        Ok(Some(customer.id))
    }

    async fn schedule_start_retry(
        &self,
        bundle: &mut PaymentBundle,
        error: Report<ClientError>,
    ) -> CustomResult<StartOutcome, CoreError> {
        let payment_id = bundle.payment.id;
        let attempt = self.stored_attempts(&bundle.payment).saturating_add(1);
        bundle.payment.set_meta(consts::META_START_ATTEMPTS, attempt.to_string());
        if attempt > consts::MAX_START_ATTEMPTS {
            bundle.payment.note(format!(
                "Recurring charge abandoned after {} failed attempts",
                consts::MAX_START_ATTEMPTS
            ));
            self.persist(bundle).await?;
            return Err(error.change_context(CoreError::RetryAttemptsExhausted { payment_id }));
        }
        let delay = scheduler::retry_delay(attempt);
        self.scheduler
            .schedule_start_retry(payment_id, attempt, delay)
            .await
            .change_context(CoreError::Scheduler)?;
        bundle.payment.note(format!(
            "Transient provider failure; retry {attempt} scheduled in {}s",
            delay.as_secs()
        ));
        self.persist(bundle).await?;
        tracing::warn!(payment_id, attempt, ?error, "recurring charge failed transiently; retry scheduled");
        self.events.publish(GatewayEvent::PaymentRetryScheduled { payment_id, attempt, delay });
        Ok(StartOutcome::RetryScheduled { attempt, delay })
    }

    fn stored_attempts(&self, payment: &HostPayment) -> u8 {
        payment
            .meta(consts::META_START_ATTEMPTS)
            .and_then(|raw| raw.parse::<u8>().ok())
            .unwrap_or(0)
    }

    async fn persist(&self, bundle: &PaymentBundle) -> CustomResult<(), CoreError> {
        self.platform.persist(bundle).await.change_context(CoreError::Storage)
    }

    /// Applies a provider snapshot onto the host payment and its linked
    /// subscriptions. Idempotent under at-least-twice delivery; callers
    /// persist afterwards.
    pub async fn reconcile(
        &self,
        bundle: &mut PaymentBundle,
        snapshot: &Payment,
    ) -> CustomResult<(), CoreError> {
        bundle.payment.transaction_id = Some(snapshot.id.clone());
        self.reconcile_status(bundle, snapshot);
        reconcile_method(bundle, snapshot);
        reconcile_details(&mut bundle.payment, snapshot);
        self.reconcile_action_url(bundle, snapshot);
        let profile_local_id = self.sync_profile(snapshot).await?;
        self.sync_customer(bundle, snapshot, profile_local_id).await?;
        self.propagate_identifiers(bundle, snapshot).await;
        self.reconcile_chargebacks(bundle, snapshot).await?;
        self.reconcile_refunds(bundle, snapshot).await?;
        Ok(())
    }

    fn reconcile_status(&self, bundle: &mut PaymentBundle, snapshot: &Payment) {
        let Some(status) = to_host_status(snapshot.status) else {
            tracing::warn!(
                payment_id = bundle.payment.id,
                provider_status = %snapshot.status,
                "unrecognized provider status; host status left unchanged"
            );
            return;
        };
        if bundle.payment.status == status {
            return;
        }
        let previous = bundle.payment.status;
        bundle.payment.status = status;
        bundle
            .payment
            .note(format!("Payment {} status changed from {previous} to {status}", snapshot.id));
        self.events.publish(GatewayEvent::PaymentStatusUpdated {
            payment_id: bundle.payment.id,
            status,
        });
        if status.is_success() {
            self.events.publish(GatewayEvent::PaymentFulfilled { payment_id: bundle.payment.id });
        }
    }

    fn reconcile_action_url(&self, bundle: &mut PaymentBundle, snapshot: &Payment) {
        if let Some(url) = snapshot.checkout_url() {
            bundle.payment.action_url = Some(url.to_string());
        } else if snapshot.method == Some(MollieMethod::Directdebit)
            && bundle.payment.meta(consts::META_SEQUENCE_TYPE).is_none()
        {
            // Direct debit often has no interactive checkout step; send the
            // customer straight to the host's return page.
            let url = self.platform.redirect_url(&bundle.payment);
            bundle.payment.action_url = Some(url);
        }
        if let Some(link) = snapshot.links.change_payment_state.as_ref() {
            bundle.payment.set_meta(consts::META_CHANGE_PAYMENT_STATE_URL, link.href.clone());
        }
    }

    async fn sync_profile(&self, snapshot: &Payment) -> CustomResult<Option<i64>, CoreError> {
        let profile_id =
            snapshot.profile_id.clone().or_else(|| self.settings.profile_id.clone());
        let Some(profile_id) = profile_id else { return Ok(None) };
        let row = match self.api.get_profile(&profile_id).await {
            Ok(profile) => NewProfile {
                provider_id: profile.id,
                mode: profile.mode,
                name: profile.name,
                email: profile.email,
            },
            Err(error) => {
                tracing::debug!(%profile_id, ?error, "profile fetch failed; storing bare row");
                NewProfile {
                    provider_id: profile_id,
                    mode: snapshot.mode,
                    name: None,
                    email: None,
                }
            }
        };
        let local_id = self.store.save_profile(&row).await.change_context(CoreError::Storage)?;
        Ok(Some(local_id))
    }

    async fn sync_customer(
        &self,
        bundle: &PaymentBundle,
        snapshot: &Payment,
        profile_local_id: Option<i64>,
    ) -> CustomResult<(), CoreError> {
        let Some(customer_id) = snapshot.customer_id.as_deref() else { return Ok(()) };
        let local_id = self
            .store
            .get_or_insert_customer(&NewCustomer {
                provider_id: customer_id.to_string(),
                profile_local_id,
                mode: snapshot.mode,
                name: bundle.payment.customer.name.clone(),
                email: bundle.payment.customer.email.clone(),
            })
            .await
            .change_context(CoreError::Storage)?;
        if let Some(user_id) = bundle.payment.customer.user_id {
            self.store
                .connect_customer_to_user(local_id, user_id)
                .await
                .change_context(CoreError::Storage)?;
        }
        Ok(())
    }

    /// Customer and mandate ids land in host metadata first-write-wins: the
    /// host field means "first seen", and later snapshots never overwrite
    /// it. The one carve-out is a paid `first` payment, which force-updates
    /// every linked subscription's mandate because that is the authoritative
    /// mandate-creation moment.
    async fn propagate_identifiers(&self, bundle: &mut PaymentBundle, snapshot: &Payment) {
        if let Some(customer_id) = snapshot.customer_id.as_deref() {
            bundle.payment.set_meta_if_absent(consts::META_CUSTOMER_ID, customer_id);
            for subscription in &mut bundle.subscriptions {
                subscription.set_meta_if_absent(consts::META_CUSTOMER_ID, customer_id);
            }
        }
        let Some(mandate_id) = snapshot.mandate_id.as_deref() else { return };
        bundle.payment.set_meta_if_absent(consts::META_MANDATE_ID, mandate_id);
        let force_refresh = snapshot.sequence_type == SequenceType::First
            && snapshot.status == PaymentStatus::Paid;
        let mandate_method =
            if force_refresh { self.mandate_method(snapshot).await } else { None };
        for subscription in &mut bundle.subscriptions {
            if force_refresh {
                subscription.set_meta(consts::META_MANDATE_ID, mandate_id);
                if let Some(provider_method) = mandate_method {
                    let compatible = to_host_methods(provider_method);
                    if !compatible.is_empty()
                        && subscription.method.is_none_or_incompatible(&compatible)
                    {
                        subscription.method = compatible.first().copied();
                    }
                }
            } else {
                subscription.set_meta_if_absent(consts::META_MANDATE_ID, mandate_id);
            }
        }
    }

    /// Method enrichment from the mandate; a fetch failure is swallowed so
    /// it never blocks reconciliation.
    async fn mandate_method(&self, snapshot: &Payment) -> Option<MollieMethod> {
        let customer_id = snapshot.customer_id.as_deref()?;
        let mandate_id = snapshot.mandate_id.as_deref()?;
        match self.api.get_mandate(customer_id, mandate_id).await {
            Ok(mandate) => mandate.method,
            Err(error) => {
                tracing::debug!(%mandate_id, ?error, "mandate fetch failed; keeping subscription methods");
                None
            }
        }
    }

    async fn reconcile_chargebacks(
        &self,
        bundle: &mut PaymentBundle,
        snapshot: &Payment,
    ) -> CustomResult<(), CoreError> {
        let charged_back =
            snapshot.amount_charged_back.as_ref().filter(|amount| amount.is_positive());
        if let Some(amount) = charged_back {
            match amount.to_minor() {
                Ok(minor) => bundle.payment.charged_back = Some(minor),
                Err(error) => {
                    tracing::warn!(?error, "malformed charged-back amount; skipped")
                }
            }
        }
        if charged_back.is_none() && !snapshot.links.has_chargebacks() {
            return Ok(());
        }
        let chargebacks = self
            .api
            .list_payment_chargebacks(&snapshot.id)
            .await
            .change_context(CoreError::Provider)?;
        let Some(latest) = chargebacks.iter().max_by_key(|chargeback| chargeback.created_at)
        else {
            return Ok(());
        };
        bundle.payment.note(format!("Chargeback {} received for payment {}", latest.id, snapshot.id));
        for subscription in &mut bundle.subscriptions {
            let predates = subscription
                .activated_at
                .map_or(true, |activated| activated < latest.created_at);
            if subscription.status == SubscriptionStatus::Active && predates {
                subscription.status = SubscriptionStatus::OnHold;
                subscription.note(format!("Subscription put on hold after chargeback {}", latest.id));
                tracing::warn!(
                    subscription_id = subscription.id,
                    chargeback_id = %latest.id,
                    "subscription put on hold after chargeback"
                );
            }
        }
        Ok(())
    }

    async fn reconcile_refunds(
        &self,
        bundle: &mut PaymentBundle,
        snapshot: &Payment,
    ) -> CustomResult<(), CoreError> {
        let total_refunded = snapshot.amount_refunded.as_ref();
        if let Some(total) = total_refunded {
            match total.to_minor() {
                Ok(minor) => bundle.payment.total_refunded = Some(minor),
                Err(error) => tracing::warn!(?error, "malformed refunded amount; skipped"),
            }
        }
        // A queued refund has a zero refunded total but already carries a
        // refunds link, so the link is a fetch trigger of its own.
        let any_refunds = total_refunded.map_or(false, Amount::is_positive)
            || snapshot.links.has_refunds()
            || !bundle.payment.refunds.is_empty();
        if !any_refunds {
            return Ok(());
        }
        let refunds = self
            .api
            .list_payment_refunds(&snapshot.id)
            .await
            .change_context(CoreError::Provider)?;
        for refund in refunds {
            let minor = match refund.amount.to_minor() {
                Ok(minor) => minor,
                Err(error) => {
                    tracing::warn!(refund_id = %refund.id, ?error, "malformed refund amount; skipped");
                    continue;
                }
            };
            let status = refund.status.to_string();
            match bundle
                .payment
                .refunds
                .iter_mut()
                .find(|record| record.provider_id == refund.id)
            {
                Some(record) => {
                    record.amount = minor;
                    record.status = status;
                    record.description = refund.description;
                    record.created_at = refund.created_at;
                }
                None => {
                    bundle.payment.note(format!(
                        "Refund {} of {} {} registered",
                        refund.id, refund.amount.value, refund.amount.currency
                    ));
                    bundle.payment.refunds.push(HostRefundRecord {
                        provider_id: refund.id,
                        amount: minor,
                        status,
                        description: refund.description,
                        created_at: refund.created_at,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Mapped method with the wallet-override rule: a wallet riding on a card
/// rail (e.g. Apple Pay) takes precedence over the base method. An existing
/// compatible host method is kept so a virtual direct-debit variant is not
/// flattened to the base method.
fn reconcile_method(bundle: &mut PaymentBundle, snapshot: &Payment) {
    let wallet = snapshot
        .details
        .as_ref()
        .and_then(|details| details.wallet)
        .filter(|wallet| *wallet != MollieMethod::Unknown);
    let Some(provider_method) = wallet.or(snapshot.method) else { return };
    let compatible = to_host_methods(provider_method);
    if compatible.is_empty() {
        return;
    }
    if bundle.payment.method.is_none_or_incompatible(&compatible) {
        bundle.payment.method = compatible.first().copied();
    }
    if let Some(resolved) = bundle.payment.method {
        for subscription in &mut bundle.subscriptions {
            if subscription.method.is_none() {
                subscription.method = Some(resolved);
            }
        }
    }
}

fn reconcile_details(payment: &mut HostPayment, snapshot: &Payment) {
    if let Some(expires) = snapshot.expires_at {
        payment.expiry_date = Some(expires);
    }
    let Some(details) = snapshot.details.as_ref() else { return };
    let consumer = ConsumerDetails {
        name: details.consumer_name.clone().or_else(|| details.card_holder.clone()),
        account: details.card_number.clone().or_else(|| details.consumer_account.clone()),
        bic: details.consumer_bic.clone(),
        country: details.card_country_code.clone(),
    };
    if consumer != ConsumerDetails::default() {
        payment.consumer_details = Some(consumer);
    }
    let recipient = BankTransferRecipient {
        name: details.bank_name.clone(),
        iban: details.bank_account.clone(),
        bic: details.bank_bic.clone(),
        reference: details.transfer_reference.clone(),
    };
    if recipient != BankTransferRecipient::default() {
        payment.bank_transfer_recipient = Some(recipient);
    }
    let failure = FailureReason {
        code: details.bank_reason_code.clone().or_else(|| details.failure_reason.clone()),
        message: details.bank_reason.clone().or_else(|| details.failure_message.clone()),
    };
    if !failure.is_empty() {
        payment.failure_reason = Some(failure);
    }
}

fn due_date_from_today(days: u8) -> String {
    let format = format_description!("[year]-[month]-[day]");
    let date = OffsetDateTime::now_utc().date() + TimeDuration::days(i64::from(days));
    date.format(&format).unwrap_or_default()
}

trait MethodCompat {
    fn is_none_or_incompatible(&self, compatible: &[PaymentMethodKind]) -> bool;
}

impl MethodCompat for Option<PaymentMethodKind> {
    fn is_none_or_incompatible(&self, compatible: &[PaymentMethodKind]) -> bool {
        match self {
            None => true,
            Some(method) => !compatible.contains(method),
        }
    }
}
