//! End-to-end orchestrator tests against scripted collaborators: a scripted
//! provider API, an in-memory commerce platform, a recording scheduler and a
//! recording event bus.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use commerce_types::{
    Currency, HostCustomer, HostPayment, HostPaymentStatus, HostRefund, MinorUnit, Mode,
    PaymentMethodKind, SubscriptionStatus,
};
use error_stack::{report, Report};
use gateway_core::{
    consts,
    errors::{CoreError, StorageError},
    events::{EventBus, GatewayEvent},
    platform::{CommercePlatform, PaymentBundle},
    scheduler::RetryScheduler,
    settings::GatewaySettings,
    store::{memory::MemoryIdentityStore, IdentityStore},
    webhooks::{WebhookNotification, WebhookOutcome},
    MollieGateway, StartOutcome,
};
use masking::Secret;
use mollie_api::{
    errors::{ApiErrorBody, ClientError, CustomResult},
    requests::{CustomerRequest, MandateRequest, PaymentRequest, RefundRequest},
    resources::{
        Chargeback, Customer, Link, Mandate, MandateDetails, MandateStatus, MethodResource,
        MollieMethod, Payment, PaymentDetails, PaymentLinks, PaymentStatus, Refund, RefundStatus,
        SequenceType,
    },
    types::Amount,
    MollieApi,
};
use time::macros::datetime;

fn api_error(status: u16) -> Report<ClientError> {
    report!(ClientError::Api(ApiErrorBody {
        status,
        title: "scripted".into(),
        detail: "scripted failure".into(),
        field: None,
    }))
}

#[derive(Default)]
struct ApiState {
    create_payment_results: VecDeque<Result<(), u16>>,
    captured_payment_requests: Vec<PaymentRequest>,
    payments: HashMap<String, Payment>,
    /// `None` marks a 410-gone customer.
    customers: HashMap<String, Option<Customer>>,
    created_customers: u32,
    mandates: Vec<Mandate>,
    created_mandates: Vec<(String, MandateRequest)>,
    mandate_lookup: HashMap<String, Mandate>,
    chargebacks: Vec<Chargeback>,
    refunds: Vec<Refund>,
    methods: Vec<MethodResource>,
    methods_fail: bool,
}

#[derive(Default)]
struct FakeApi {
    state: Mutex<ApiState>,
}

impl FakeApi {
    fn lock(&self) -> std::sync::MutexGuard<'_, ApiState> {
        self.state.lock().expect("api state")
    }

    /// Snapshot echoing the request, the way the provider answers a create.
    fn echo_snapshot(request: &PaymentRequest, id: String) -> Payment {
        Payment {
            id: id.clone(),
            mode: Mode::Test,
            status: PaymentStatus::Open,
            amount: request.amount.clone(),
            description: Some(request.description.clone()),
            redirect_url: request.redirect_url.clone(),
            webhook_url: request.webhook_url.clone(),
            method: request.method.as_deref().and_then(|raw| raw.parse().ok()),
            metadata: request.metadata.clone(),
            profile_id: None,
            sequence_type: request.sequence_type(),
            customer_id: request.customer_id.clone(),
            mandate_id: request.mandate_id.clone(),
            details: None,
            expires_at: None,
            amount_refunded: None,
            amount_charged_back: None,
            links: PaymentLinks {
                checkout: Some(Link {
                    href: format!("https://checkout.example/{id}"),
                    content_type: None,
                }),
                ..PaymentLinks::default()
            },
        }
    }
}

#[async_trait::async_trait]
impl MollieApi for FakeApi {
    async fn create_payment(&self, request: &PaymentRequest) -> CustomResult<Payment, ClientError> {
        let mut state = self.lock();
        state.captured_payment_requests.push(request.clone());
        let count = state.captured_payment_requests.len();
        match state.create_payment_results.pop_front() {
            Some(Err(status)) => Err(api_error(status)),
            _ => {
                let snapshot = Self::echo_snapshot(request, format!("tr_fake_{count}"));
                state.payments.insert(snapshot.id.clone(), snapshot.clone());
                Ok(snapshot)
            }
        }
    }

    async fn get_payment(&self, payment_id: &str) -> CustomResult<Payment, ClientError> {
        self.lock().payments.get(payment_id).cloned().ok_or_else(|| api_error(404))
    }

    async fn create_customer(
        &self,
        request: &CustomerRequest,
    ) -> CustomResult<Customer, ClientError> {
        let mut state = self.lock();
        state.created_customers += 1;
        let customer = Customer {
            id: format!("cst_fake_{}", state.created_customers),
            mode: Mode::Test,
            name: request.name.clone(),
            email: request.email.clone(),
            locale: request.locale.clone(),
            created_at: None,
        };
        state.customers.insert(customer.id.clone(), Some(customer.clone()));
        Ok(customer)
    }

    async fn get_customer(&self, customer_id: &str) -> CustomResult<Option<Customer>, ClientError> {
        Ok(self.lock().customers.get(customer_id).cloned().flatten())
    }

    async fn create_mandate(
        &self,
        customer_id: &str,
        request: &MandateRequest,
    ) -> CustomResult<Mandate, ClientError> {
        let mut state = self.lock();
        state.created_mandates.push((customer_id.to_string(), request.clone()));
        let mandate = Mandate {
            id: format!("mdt_new_{}", state.created_mandates.len()),
            mode: Mode::Test,
            status: MandateStatus::Valid,
            method: Some(MollieMethod::Directdebit),
            details: MandateDetails {
                consumer_name: Some(request.consumer_name.clone()),
                consumer_account: Some(request.consumer_account.clone()),
                ..MandateDetails::default()
            },
            mandate_reference: None,
            signature_date: None,
            created_at: None,
        };
        Ok(mandate)
    }

    async fn get_mandate(
        &self,
        _customer_id: &str,
        mandate_id: &str,
    ) -> CustomResult<Mandate, ClientError> {
        self.lock().mandate_lookup.get(mandate_id).cloned().ok_or_else(|| api_error(404))
    }

    async fn list_mandates(&self, _customer_id: &str) -> CustomResult<Vec<Mandate>, ClientError> {
        Ok(self.lock().mandates.clone())
    }

    async fn create_refund(
        &self,
        payment_id: &str,
        request: &RefundRequest,
    ) -> CustomResult<Refund, ClientError> {
        Ok(Refund {
            id: "re_fake_1".into(),
            amount: request.amount.clone(),
            status: RefundStatus::Pending,
            description: request.description.clone(),
            payment_id: Some(payment_id.to_string()),
            created_at: None,
        })
    }

    async fn list_payment_refunds(
        &self,
        _payment_id: &str,
    ) -> CustomResult<Vec<Refund>, ClientError> {
        Ok(self.lock().refunds.clone())
    }

    async fn list_payment_chargebacks(
        &self,
        _payment_id: &str,
    ) -> CustomResult<Vec<Chargeback>, ClientError> {
        Ok(self.lock().chargebacks.clone())
    }

    async fn list_payment_methods(
        &self,
        _amount: Option<&Amount>,
        _sequence_type: Option<SequenceType>,
    ) -> CustomResult<Vec<MethodResource>, ClientError> {
        let state = self.lock();
        if state.methods_fail {
            return Err(api_error(503));
        }
        Ok(state.methods.clone())
    }

    async fn get_profile(
        &self,
        _profile_id: &str,
    ) -> CustomResult<mollie_api::resources::Profile, ClientError> {
        Err(api_error(404))
    }
}

#[derive(Default)]
struct FakePlatform {
    bundles: Mutex<HashMap<u64, PaymentBundle>>,
}

impl FakePlatform {
    fn seed(&self, bundle: PaymentBundle) {
        self.bundles.lock().expect("bundles").insert(bundle.payment.id, bundle);
    }

    fn bundle(&self, payment_id: u64) -> PaymentBundle {
        self.bundles.lock().expect("bundles").get(&payment_id).cloned().expect("seeded bundle")
    }
}

#[async_trait::async_trait]
impl CommercePlatform for FakePlatform {
    async fn find_payment_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> CustomResult<Option<u64>, StorageError> {
        Ok(self
            .bundles
            .lock()
            .expect("bundles")
            .values()
            .find(|bundle| bundle.payment.transaction_id.as_deref() == Some(transaction_id))
            .map(|bundle| bundle.payment.id))
    }

    async fn load_payment(
        &self,
        payment_id: u64,
    ) -> CustomResult<Option<PaymentBundle>, StorageError> {
        Ok(self.bundles.lock().expect("bundles").get(&payment_id).cloned())
    }

    async fn persist(&self, bundle: &PaymentBundle) -> CustomResult<(), StorageError> {
        self.bundles.lock().expect("bundles").insert(bundle.payment.id, bundle.clone());
        Ok(())
    }

    fn redirect_url(&self, payment: &HostPayment) -> String {
        format!("https://shop.example/return/{}", payment.id)
    }

    fn webhook_url(&self, payment: &HostPayment) -> String {
        format!("https://shop.example/mollie/webhook/{}", payment.id)
    }
}

#[derive(Default)]
struct FakeScheduler {
    calls: Mutex<Vec<(u64, u8, Duration)>>,
}

#[async_trait::async_trait]
impl RetryScheduler for FakeScheduler {
    async fn schedule_start_retry(
        &self,
        payment_id: u64,
        attempt: u8,
        delay: Duration,
    ) -> CustomResult<(), gateway_core::errors::SchedulerError> {
        self.calls.lock().expect("calls").push((payment_id, attempt, delay));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingBus {
    events: Mutex<Vec<GatewayEvent>>,
}

impl EventBus for RecordingBus {
    fn publish(&self, event: GatewayEvent) {
        self.events.lock().expect("events").push(event);
    }
}

struct Harness {
    api: Arc<FakeApi>,
    platform: Arc<FakePlatform>,
    scheduler: Arc<FakeScheduler>,
    bus: Arc<RecordingBus>,
    store: Arc<MemoryIdentityStore>,
    gateway: MollieGateway,
}

fn harness() -> Harness {
    let api = Arc::new(FakeApi::default());
    let platform = Arc::new(FakePlatform::default());
    let scheduler = Arc::new(FakeScheduler::default());
    let bus = Arc::new(RecordingBus::default());
    let store = Arc::new(MemoryIdentityStore::new());
    let settings = GatewaySettings {
        api_key: Secret::new("test_scripted".to_string()),
        profile_id: None,
        due_date_days: None,
        base_url: "https://api.example".to_string(),
        bind_address: "127.0.0.1:0".to_string(),
    };
    let gateway = MollieGateway::new(
        api.clone(),
        store.clone(),
        platform.clone(),
        scheduler.clone(),
        bus.clone(),
        settings,
    );
    Harness { api, platform, scheduler, bus, store, gateway }
}

fn host_payment(id: u64) -> HostPayment {
    HostPayment {
        id,
        order_number: format!("10{id}"),
        amount: MinorUnit::new(1099),
        currency: Currency::Eur,
        method: Some(PaymentMethodKind::Ideal),
        customer: HostCustomer {
            user_id: Some(7),
            name: Some("T. Ester".into()),
            email: Some("t.ester@example.org".into()),
            locale: Some("nl_NL".into()),
        },
        ..HostPayment::default()
    }
}

fn bundle(id: u64) -> PaymentBundle {
    PaymentBundle { payment: host_payment(id), subscriptions: Vec::new() }
}

fn snapshot(id: &str, status: PaymentStatus) -> Payment {
    Payment {
        id: id.to_string(),
        mode: Mode::Test,
        status,
        amount: Amount::from_minor(Currency::Eur, MinorUnit::new(1099)),
        description: None,
        redirect_url: None,
        webhook_url: None,
        method: Some(MollieMethod::Ideal),
        metadata: None,
        profile_id: None,
        sequence_type: SequenceType::Oneoff,
        customer_id: None,
        mandate_id: None,
        details: None,
        expires_at: None,
        amount_refunded: None,
        amount_charged_back: None,
        links: PaymentLinks::default(),
    }
}

fn live_customer(id: &str) -> Customer {
    Customer {
        id: id.to_string(),
        mode: Mode::Test,
        name: None,
        email: None,
        locale: None,
        created_at: None,
    }
}

#[tokio::test]
async fn start_creates_payment_and_returns_checkout_url() {
    let h = harness();
    let mut bundle = bundle(1);

    let outcome = h.gateway.start(&mut bundle).await.expect("start");

    let StartOutcome::Created { action_url } = outcome else {
        panic!("expected created outcome");
    };
    assert_eq!(action_url.as_deref(), Some("https://checkout.example/tr_fake_1"));
    assert_eq!(bundle.payment.transaction_id.as_deref(), Some("tr_fake_1"));

    let state = h.api.lock();
    let request = &state.captured_payment_requests[0];
    assert_eq!(request.amount.value, "10.99");
    assert_eq!(request.method.as_deref(), Some("ideal"));
    assert_eq!(request.locale.as_deref(), Some("nl_NL"));
    assert_eq!(request.webhook_url.as_deref(), Some("https://shop.example/mollie/webhook/1"));
    // A fresh provider customer was minted and linked to the host user.
    assert_eq!(state.created_customers, 1);
    assert_eq!(request.customer_id.as_deref(), Some("cst_fake_1"));
    drop(state);
    let linked = h.store.customers_for_user(7).await.expect("linked");
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].provider_id, "cst_fake_1");
}

#[tokio::test]
async fn reconcile_applies_the_same_snapshot_idempotently() {
    let h = harness();
    let mut bundle = bundle(2);
    h.api.lock().refunds = vec![Refund {
        id: "re_1".into(),
        amount: Amount::from_minor(Currency::Eur, MinorUnit::new(500)),
        status: RefundStatus::Refunded,
        description: Some("damaged goods".into()),
        payment_id: Some("tr_2".into()),
        created_at: Some(datetime!(2026-08-01 10:00 UTC)),
    }];
    let mut paid = snapshot("tr_2", PaymentStatus::Paid);
    paid.amount_refunded = Some(Amount::from_minor(Currency::Eur, MinorUnit::new(500)));
    paid.details = Some(PaymentDetails {
        consumer_name: Some("T. Ester".into()),
        consumer_account: Some("NL91ABNA0417164300".into()),
        consumer_bic: Some("ABNANL2A".into()),
        ..PaymentDetails::default()
    });

    h.gateway.reconcile(&mut bundle, &paid).await.expect("first pass");
    let after_first = bundle.clone();
    h.gateway.reconcile(&mut bundle, &paid).await.expect("second pass");

    assert_eq!(bundle.payment, after_first.payment);
    assert_eq!(bundle.payment.status, HostPaymentStatus::Success);
    assert_eq!(bundle.payment.refunds.len(), 1);
    assert_eq!(bundle.payment.total_refunded, Some(MinorUnit::new(500)));
    let details = bundle.payment.consumer_details.as_ref().expect("details");
    assert_eq!(details.account.as_deref(), Some("NL91ABNA0417164300"));
    let fulfilled = h
        .bus
        .events
        .lock()
        .expect("events")
        .iter()
        .filter(|event| matches!(event, GatewayEvent::PaymentFulfilled { .. }))
        .count();
    assert_eq!(fulfilled, 1, "fulfillment fires only on the transition");
}

#[tokio::test]
async fn queued_refund_is_mirrored_before_any_amount_is_refunded() {
    let h = harness();
    let mut bundle = bundle(21);
    h.api.lock().refunds = vec![Refund {
        id: "re_queued".into(),
        amount: Amount::from_minor(Currency::Eur, MinorUnit::new(1099)),
        status: RefundStatus::Queued,
        description: None,
        payment_id: Some("tr_21".into()),
        created_at: Some(datetime!(2026-08-20 09:00 UTC)),
    }];
    // A queued refund has not moved money yet: the snapshot still reports a
    // zero refunded total, only the refunds link betrays its existence.
    let mut paid = snapshot("tr_21", PaymentStatus::Paid);
    paid.amount_refunded = Some(Amount::from_minor(Currency::Eur, MinorUnit::new(0)));
    paid.links.refunds = Some(Link {
        href: "https://api.example/v2/payments/tr_21/refunds".into(),
        content_type: None,
    });

    h.gateway.reconcile(&mut bundle, &paid).await.expect("reconcile");

    assert_eq!(bundle.payment.total_refunded, Some(MinorUnit::new(0)));
    assert_eq!(bundle.payment.refunds.len(), 1);
    assert_eq!(bundle.payment.refunds[0].provider_id, "re_queued");
    assert_eq!(bundle.payment.refunds[0].status, "queued");
}

#[tokio::test]
async fn chargeback_puts_only_predating_active_subscriptions_on_hold() {
    let h = harness();
    let mut bundle = bundle(3);
    bundle.subscriptions = vec![
        commerce_types::HostSubscription {
            id: 31,
            status: SubscriptionStatus::Active,
            activated_at: Some(datetime!(2026-08-01 10:00 UTC)),
            ..commerce_types::HostSubscription::default()
        },
        commerce_types::HostSubscription {
            id: 32,
            status: SubscriptionStatus::Active,
            activated_at: Some(datetime!(2026-08-01 14:00 UTC)),
            ..commerce_types::HostSubscription::default()
        },
    ];
    h.api.lock().chargebacks = vec![Chargeback {
        id: "chb_1".into(),
        amount: Amount::from_minor(Currency::Eur, MinorUnit::new(1099)),
        reason: None,
        payment_id: Some("tr_3".into()),
        created_at: datetime!(2026-08-01 12:00 UTC),
        reversed_at: None,
    }];
    let mut charged = snapshot("tr_3", PaymentStatus::Paid);
    charged.amount_charged_back = Some(Amount::from_minor(Currency::Eur, MinorUnit::new(1099)));

    h.gateway.reconcile(&mut bundle, &charged).await.expect("reconcile");

    assert_eq!(bundle.payment.charged_back, Some(MinorUnit::new(1099)));
    assert_eq!(bundle.subscriptions[0].status, SubscriptionStatus::OnHold);
    assert_eq!(bundle.subscriptions[1].status, SubscriptionStatus::Active);
    let notes_before = bundle.subscriptions[0].notes.clone();

    h.gateway.reconcile(&mut bundle, &charged).await.expect("second pass");
    assert_eq!(bundle.subscriptions[0].notes, notes_before, "no duplicate on-hold note");
}

fn recurring_bundle(id: u64) -> PaymentBundle {
    let mut bundle = bundle(id);
    bundle.payment.method = Some(PaymentMethodKind::DirectDebit);
    bundle.payment.set_meta(consts::META_SEQUENCE_TYPE, consts::SEQUENCE_RECURRING);
    bundle.payment.set_meta(consts::META_CUSTOMER_ID, "cst_known");
    bundle.payment.set_meta(consts::META_MANDATE_ID, "mdt_1");
    bundle
}

#[tokio::test]
async fn transient_recurring_failure_walks_the_backoff_ladder() {
    let h = harness();
    h.api.lock().customers.insert("cst_known".into(), Some(live_customer("cst_known")));
    h.api.lock().create_payment_results = VecDeque::from([Err(503), Err(502)]);
    let mut bundle = recurring_bundle(4);

    let first = h.gateway.start(&mut bundle).await.expect("first attempt");
    assert_eq!(
        first,
        StartOutcome::RetryScheduled { attempt: 1, delay: Duration::from_secs(300) }
    );
    assert_eq!(bundle.payment.meta(consts::META_START_ATTEMPTS), Some("1"));

    let second = h.gateway.start(&mut bundle).await.expect("second attempt");
    assert_eq!(
        second,
        StartOutcome::RetryScheduled { attempt: 2, delay: Duration::from_secs(3600) }
    );

    let calls = h.scheduler.calls.lock().expect("calls").clone();
    assert_eq!(
        calls,
        vec![
            (4, 1, Duration::from_secs(300)),
            (4, 2, Duration::from_secs(3600)),
        ]
    );
    // The recurring request never carried a method.
    let state = h.api.lock();
    assert!(state.captured_payment_requests.iter().all(|request| request.method.is_none()));
    assert!(state
        .captured_payment_requests
        .iter()
        .all(|request| request.mandate_id.as_deref() == Some("mdt_1")));
}

#[tokio::test]
async fn non_transient_recurring_failure_reraises_immediately() {
    let h = harness();
    h.api.lock().customers.insert("cst_known".into(), Some(live_customer("cst_known")));
    h.api.lock().create_payment_results = VecDeque::from([Err(400)]);
    let mut bundle = recurring_bundle(5);

    let error = h.gateway.start(&mut bundle).await.expect_err("must fail");
    assert_eq!(*error.current_context(), CoreError::Provider);
    assert!(h.scheduler.calls.lock().expect("calls").is_empty());
}

#[tokio::test]
async fn transient_oneoff_failure_is_not_retried() {
    let h = harness();
    h.api.lock().create_payment_results = VecDeque::from([Err(503)]);
    let mut bundle = bundle(6);

    let error = h.gateway.start(&mut bundle).await.expect_err("must fail");
    assert_eq!(*error.current_context(), CoreError::Provider);
    assert!(h.scheduler.calls.lock().expect("calls").is_empty());
}

#[tokio::test]
async fn oneoff_direct_debit_short_circuits_into_a_mandate_charge() {
    let h = harness();
    h.api.lock().customers.insert("cst_known".into(), Some(live_customer("cst_known")));
    let mut bundle = bundle(7);
    bundle.payment.method = Some(PaymentMethodKind::DirectDebit);
    bundle.payment.consumer_name = Some("T. Ester".into());
    bundle.payment.consumer_account = Some("NL91ABNA0417164300".into());
    bundle.payment.set_meta(consts::META_CUSTOMER_ID, "cst_known");

    h.gateway.start(&mut bundle).await.expect("start");

    let state = h.api.lock();
    assert_eq!(state.created_mandates.len(), 1);
    let (customer_id, mandate_request) = &state.created_mandates[0];
    assert_eq!(customer_id, "cst_known");
    assert_eq!(mandate_request.consumer_account, "NL91ABNA0417164300");
    let request = &state.captured_payment_requests[0];
    assert_eq!(request.sequence_type(), SequenceType::Recurring);
    assert_eq!(request.mandate_id.as_deref(), Some("mdt_new_1"));
    assert!(request.method.is_none(), "never submits a plain oneoff direct debit");
    drop(state);
    assert_eq!(bundle.payment.meta(consts::META_MANDATE_ID), Some("mdt_new_1"));
}

#[tokio::test]
async fn oneoff_direct_debit_reuses_a_matching_mandate() {
    let h = harness();
    {
        let mut state = h.api.lock();
        state.customers.insert("cst_known".into(), Some(live_customer("cst_known")));
        state.mandates = vec![Mandate {
            id: "mdt_existing".into(),
            mode: Mode::Test,
            status: MandateStatus::Valid,
            method: Some(MollieMethod::Directdebit),
            details: MandateDetails {
                consumer_account: Some("nl91abna0417164300".into()),
                ..MandateDetails::default()
            },
            mandate_reference: None,
            signature_date: None,
            created_at: None,
        }];
    }
    let mut bundle = bundle(8);
    bundle.payment.method = Some(PaymentMethodKind::DirectDebit);
    bundle.payment.consumer_account = Some("NL91ABNA0417164300".into());
    bundle.payment.set_meta(consts::META_CUSTOMER_ID, "cst_known");

    h.gateway.start(&mut bundle).await.expect("start");

    let state = h.api.lock();
    assert!(state.created_mandates.is_empty());
    assert_eq!(state.captured_payment_requests[0].mandate_id.as_deref(), Some("mdt_existing"));
}

#[tokio::test]
async fn gone_customer_candidates_are_skipped_during_resolution() {
    let h = harness();
    {
        let mut state = h.api.lock();
        state.customers.insert("cst_gone".into(), None);
        state.customers.insert("cst_live".into(), Some(live_customer("cst_live")));
    }
    let mut bundle = bundle(9);
    bundle.payment.customer.user_id = None;
    bundle.subscriptions = vec![
        commerce_types::HostSubscription {
            id: 91,
            metadata: [(consts::META_CUSTOMER_ID.to_string(), "cst_gone".to_string())].into(),
            ..commerce_types::HostSubscription::default()
        },
        commerce_types::HostSubscription {
            id: 92,
            metadata: [(consts::META_CUSTOMER_ID.to_string(), "cst_live".to_string())].into(),
            ..commerce_types::HostSubscription::default()
        },
    ];

    let resolved = h.gateway.customer_id_for_payment(&bundle).await.expect("resolution");
    assert_eq!(resolved.as_deref(), Some("cst_live"));
}

#[tokio::test]
async fn first_success_force_refreshes_subscription_mandates() {
    let h = harness();
    h.api.lock().mandate_lookup.insert(
        "mdt_new".into(),
        Mandate {
            id: "mdt_new".into(),
            mode: Mode::Test,
            status: MandateStatus::Valid,
            method: Some(MollieMethod::Directdebit),
            details: MandateDetails::default(),
            mandate_reference: None,
            signature_date: None,
            created_at: None,
        },
    );
    let mut bundle = bundle(10);
    bundle.payment.customer.user_id = None;
    bundle.subscriptions = vec![commerce_types::HostSubscription {
        id: 101,
        metadata: [(consts::META_MANDATE_ID.to_string(), "mdt_old".to_string())].into(),
        ..commerce_types::HostSubscription::default()
    }];
    let mut paid_first = snapshot("tr_10", PaymentStatus::Paid);
    paid_first.sequence_type = SequenceType::First;
    paid_first.customer_id = Some("cst_known".into());
    paid_first.mandate_id = Some("mdt_new".into());

    h.gateway.reconcile(&mut bundle, &paid_first).await.expect("reconcile");

    assert_eq!(bundle.subscriptions[0].meta(consts::META_MANDATE_ID), Some("mdt_new"));
    assert_eq!(bundle.subscriptions[0].method, Some(PaymentMethodKind::DirectDebit));
    assert_eq!(bundle.payment.meta(consts::META_MANDATE_ID), Some("mdt_new"));

    // A concurrent second first-sequence payment that also succeeds updates
    // the subscription again, while each payment's own metadata stays
    // first-write-wins.
    let mut concurrent = paid_first.clone();
    concurrent.id = "tr_10b".into();
    concurrent.mandate_id = Some("mdt_newer".into());
    h.gateway.reconcile(&mut bundle, &concurrent).await.expect("concurrent reconcile");
    assert_eq!(bundle.subscriptions[0].meta(consts::META_MANDATE_ID), Some("mdt_newer"));
    assert_eq!(bundle.payment.meta(consts::META_MANDATE_ID), Some("mdt_new"));
}

#[tokio::test]
async fn pending_first_payment_does_not_overwrite_subscription_mandate() {
    let h = harness();
    let mut bundle = bundle(11);
    bundle.payment.customer.user_id = None;
    bundle.subscriptions = vec![commerce_types::HostSubscription {
        id: 111,
        metadata: [(consts::META_MANDATE_ID.to_string(), "mdt_old".to_string())].into(),
        ..commerce_types::HostSubscription::default()
    }];
    let mut open_first = snapshot("tr_11", PaymentStatus::Open);
    open_first.sequence_type = SequenceType::First;
    open_first.mandate_id = Some("mdt_attempt".into());

    h.gateway.reconcile(&mut bundle, &open_first).await.expect("reconcile");
    assert_eq!(bundle.subscriptions[0].meta(consts::META_MANDATE_ID), Some("mdt_old"));
}

#[tokio::test]
async fn webhook_with_unknown_ids_is_acknowledged_success_shaped() {
    let h = harness();
    let outcome = h
        .gateway
        .handle_notification(WebhookNotification {
            transaction_id: Some("tr_does_not_exist".into()),
            payment_id: None,
        })
        .await
        .expect("no error leaks");
    assert_eq!(outcome, WebhookOutcome::Acknowledged);
}

#[tokio::test]
async fn webhook_resolves_by_transaction_id_and_syncs() {
    let h = harness();
    let mut seeded = bundle(12);
    seeded.payment.transaction_id = Some("tr_12".into());
    h.platform.seed(seeded);
    h.api.lock().payments.insert("tr_12".into(), snapshot("tr_12", PaymentStatus::Paid));

    let outcome = h
        .gateway
        .handle_notification(WebhookNotification {
            transaction_id: Some("tr_12".into()),
            payment_id: None,
        })
        .await
        .expect("handled");

    assert_eq!(outcome, WebhookOutcome::Processed { payment_id: 12 });
    let persisted = h.platform.bundle(12);
    assert_eq!(persisted.payment.status, HostPaymentStatus::Success);
    let events = h.bus.events.lock().expect("events");
    assert!(events.iter().any(|event| matches!(
        event,
        GatewayEvent::WebhookReceived { payment_id: 12, .. }
    )));
}

#[tokio::test]
async fn retry_start_backs_off_when_the_charge_already_exists() {
    let h = harness();
    let mut seeded = bundle(13);
    seeded.payment.transaction_id = Some("tr_13".into());
    h.platform.seed(seeded);
    h.api.lock().payments.insert("tr_13".into(), snapshot("tr_13", PaymentStatus::Paid));

    let outcome = h.gateway.retry_start(13).await.expect("retry");
    assert_eq!(outcome, StartOutcome::AlreadyStarted);
    assert_eq!(h.platform.bundle(13).payment.status, HostPaymentStatus::Success);
}

#[tokio::test]
async fn retry_start_raises_after_the_attempt_cap() {
    let h = harness();
    let mut seeded = recurring_bundle(14);
    seeded.payment.set_meta(consts::META_START_ATTEMPTS, "5");
    h.platform.seed(seeded);

    let error = h.gateway.retry_start(14).await.expect_err("exhausted");
    assert_eq!(*error.current_context(), CoreError::RetryAttemptsExhausted { payment_id: 14 });
}

#[tokio::test]
async fn refund_creation_requires_and_uses_the_transaction_id() {
    let h = harness();
    let mut payment = host_payment(15);
    let mut refund = HostRefund {
        id: 151,
        payment_id: 15,
        amount: MinorUnit::new(500),
        currency: Currency::Eur,
        description: Some("damaged goods".into()),
        provider_refund_id: None,
    };

    let error = h.gateway.create_refund(&payment, &mut refund).await.expect_err("no tr id yet");
    assert_eq!(*error.current_context(), CoreError::MissingTransactionId { payment_id: 15 });

    payment.transaction_id = Some("tr_15".into());
    h.gateway.create_refund(&payment, &mut refund).await.expect("refund");
    assert_eq!(refund.provider_refund_id.as_deref(), Some("re_fake_1"));
}

#[tokio::test]
async fn payment_methods_filter_by_amount_and_degrade_on_failure() {
    let h = harness();
    h.api.lock().methods = vec![
        serde_json::from_value(serde_json::json!({
            "id": "ideal",
            "maximumAmount": { "currency": "EUR", "value": "50.00" }
        }))
        .expect("method"),
        serde_json::from_value(serde_json::json!({ "id": "banktransfer" })).expect("method"),
    ];

    let all = h.gateway.payment_methods(None, None).await;
    assert_eq!(all.len(), 2);

    let big_order = Amount::from_minor(Currency::Eur, MinorUnit::new(10_000));
    let filtered = h.gateway.payment_methods(Some(&big_order), None).await;
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, MollieMethod::Banktransfer);

    let failing = harness();
    failing.api.lock().methods_fail = true;
    assert!(failing.gateway.payment_methods(None, None).await.is_empty());
}
