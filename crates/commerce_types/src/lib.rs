#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

//! Host commerce platform model.
//!
//! The gateway core never creates host payments or subscriptions; it only
//! updates them after reconciling a provider snapshot. These types are the
//! shared vocabulary between the provider-facing crate and the orchestrator.

pub mod enums;
pub mod payment;

pub use enums::{
    Currency, HostPaymentStatus, LineItemKind, MinorUnit, Mode, PaymentMethodKind,
    SubscriptionStatus,
};
pub use payment::{
    BankTransferRecipient, BillingAddress, ConsumerDetails, FailureReason, HostCustomer,
    HostPayment, HostRefund, HostRefundRecord, HostSubscription, LineItem, Metadata,
};
