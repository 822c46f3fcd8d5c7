use commerce_types::Mode;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use masking::{PeekInterface, Secret};
use serde::Deserialize;

use crate::errors::{CoreError, CustomResult};

/// Merchant-level gateway configuration. Loaded from `gateway.toml` with
/// `MOLLIE_GATEWAY_*` environment overrides layered on top.
#[derive(Clone, Debug, Deserialize)]
pub struct GatewaySettings {
    /// Provider API key; the `live_`/`test_` prefix decides the mode.
    pub api_key: Secret<String>,
    /// Provider profile to fall back to when a payment snapshot carries none.
    #[serde(default)]
    pub profile_id: Option<String>,
    /// Days until a bank-transfer payment expires, when the merchant set one.
    #[serde(default)]
    pub due_date_days: Option<u8>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_base_url() -> String {
    mollie_api::consts::BASE_URL.to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

impl GatewaySettings {
    pub fn load() -> CustomResult<Self, CoreError> {
        Figment::new()
            .merge(Toml::file("gateway.toml"))
            .merge(Env::prefixed("MOLLIE_GATEWAY_"))
            .extract::<Self>()
            .map_err(|error| {
                tracing::error!(%error, "configuration is invalid");
                error_stack::report!(CoreError::Validation { reason: "configuration" })
            })
    }

    pub fn mode(&self) -> Mode {
        if self.api_key.peek().starts_with(mollie_api::consts::LIVE_KEY_PREFIX) {
            Mode::Live
        } else {
            Mode::Test
        }
    }
}
