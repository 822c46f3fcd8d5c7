#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

//! Provider-facing half of the gateway: value objects, typed resources,
//! outbound request builders, the HTTP client and the pure transformers
//! between the host model and the provider model.

pub mod api;
pub mod client;
pub mod consts;
pub mod errors;
pub mod requests;
pub mod resources;
pub mod transformers;
pub mod types;

pub use api::MollieApi;
pub use client::MollieClient;
pub use errors::{ApiErrorBody, ClientError, CustomResult};
