//! HTTP surface for inbound provider notifications. The provider posts
//! form-encoded bodies containing at minimum `id=tr_…`. Two shapes are
//! served: the current path-based route carrying the host payment id, and a
//! legacy query-string route kept for webhook URLs registered by older
//! installs.
//!
//! There is no signature verification on these routes; the unguessable URL
//! is the only authentication, matching the provider's webhook contract.
//! Handlers always answer 200 for resolvable and unresolvable ids alike.

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::{payments::MollieGateway, webhooks::WebhookNotification};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<MollieGateway>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
pub struct WebhookForm {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyWebhookQuery {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub payment_id: Option<u64>,
}

pub fn configure(config: &mut web::ServiceConfig) {
    config
        .route("/mollie/webhook/{payment_id}", web::post().to(payment_webhook))
        .route("/mollie/webhook", web::post().to(legacy_webhook));
}

async fn payment_webhook(
    state: web::Data<AppState>,
    path: web::Path<u64>,
    form: Option<web::Form<WebhookForm>>,
) -> HttpResponse {
    let notification = WebhookNotification {
        transaction_id: form.and_then(|form| form.into_inner().id),
        payment_id: Some(path.into_inner()),
    };
    dispatch(&state, notification).await
}

async fn legacy_webhook(
    state: web::Data<AppState>,
    query: web::Query<LegacyWebhookQuery>,
    form: Option<web::Form<WebhookForm>>,
) -> HttpResponse {
    let query = query.into_inner();
    let notification = WebhookNotification {
        transaction_id: form.and_then(|form| form.into_inner().id).or(query.id),
        payment_id: query.payment_id,
    };
    dispatch(&state, notification).await
}

async fn dispatch(state: &web::Data<AppState>, notification: WebhookNotification) -> HttpResponse {
    match state.gateway.handle_notification(notification).await {
        Ok(_) => HttpResponse::Ok().body("OK"),
        Err(error) => {
            tracing::error!(?error, "webhook processing failed");
            // 5xx makes the provider redeliver later.
            HttpResponse::InternalServerError().finish()
        }
    }
}
