#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

//! Gateway orchestrator: builds provider requests from host payments,
//! reconciles provider snapshots back onto host payments and subscriptions,
//! schedules retries for transient recurring failures, and handles inbound
//! webhook notifications.

pub mod consts;
pub mod errors;
pub mod events;
pub mod logger;
pub mod payments;
pub mod platform;
pub mod routes;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod webhooks;

pub use errors::{CoreError, StorageError};
pub use payments::{MollieGateway, StartOutcome};
pub use platform::{CommercePlatform, PaymentBundle};
pub use settings::GatewaySettings;
