//! Typed provider resources. Each resource is a parse-don't-validate serde
//! struct; unknown detail keys are ignored, unknown enum values collapse to
//! an explicit `Unknown` variant so a new provider value never breaks
//! deserialization of an otherwise healthy snapshot.

pub mod chargeback;
pub mod customer;
pub mod links;
pub mod list;
pub mod mandate;
pub mod method;
pub mod payment;
pub mod profile;
pub mod refund;

pub use chargeback::Chargeback;
pub use customer::Customer;
pub use links::{Link, PaymentLinks};
pub use list::ListEnvelope;
pub use mandate::{Mandate, MandateDetails, MandateStatus};
pub use method::{MethodResource, MollieMethod};
pub use payment::{Payment, PaymentDetails, PaymentStatus, SequenceType};
pub use profile::Profile;
pub use refund::{Refund, RefundStatus};
