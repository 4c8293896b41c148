//! Webhook receiver endpoint.
//!
//! # Responsibilities
//! - Parse the raw event body
//! - Route the event to its category handler
//! - Acknowledge with 200 so the sender stops redelivering
//!
//! # Design Decisions
//! - Unknown event types are acknowledged, not rejected
//! - Signature presence is logged; verification is not performed

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::config::SharedConfig;
use crate::http::response::GatewayError;
use crate::observability::metrics;
use crate::webhooks::events::EventCategory;

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Handle one inbound event. Returns the category it was routed to.
pub fn process_event(event: &Value) -> Option<EventCategory> {
    let event_type = event.get("type").and_then(Value::as_str).unwrap_or("unknown");
    let data_id = event.pointer("/data/id").and_then(Value::as_str);

    tracing::info!(
        event_type,
        id = ?event.get("id"),
        created_at = ?event.get("created_at"),
        "Webhook received"
    );

    let Some(category) = EventCategory::of(event_type) else {
        tracing::warn!(event_type, "Unknown webhook event type");
        return None;
    };

    match category {
        EventCategory::Customer => tracing::info!(customer_id = ?data_id, event_type, "Customer event"),
        EventCategory::KycLink => tracing::info!(kyc_link_id = ?data_id, event_type, "KYC event"),
        EventCategory::Transfer => tracing::info!(transfer_id = ?data_id, event_type, "Transfer event"),
        EventCategory::ExternalAccount => {
            tracing::info!(account_id = ?data_id, event_type, "External account event")
        }
        EventCategory::BridgeWallet => tracing::info!(wallet_id = ?data_id, event_type, "Wallet event"),
        EventCategory::Card => tracing::info!(card_id = ?data_id, event_type, "Card event"),
        EventCategory::CardTransaction => {
            tracing::info!(transaction_id = ?data_id, event_type, "Card transaction event")
        }
        EventCategory::VirtualAccount => {
            tracing::info!(account_id = ?data_id, event_type, "Virtual account event")
        }
        EventCategory::StaticMemo => tracing::info!(memo_id = ?data_id, event_type, "Static memo event"),
        EventCategory::LiquidationAddress => {
            tracing::info!(address_id = ?data_id, event_type, "Liquidation address event")
        }
    }
    metrics::record_webhook_event(category.as_str());
    Some(category)
}

pub async fn webhook_handler(
    State(settings): State<SharedConfig>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event: Value = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "Webhook parse error");
            return GatewayError::InvalidPayload.into_response();
        }
    };

    let has_secret = settings
        .load()
        .webhooks
        .secret
        .as_deref()
        .is_some_and(|s| !s.is_empty());
    if has_secret && headers.contains_key(SIGNATURE_HEADER) {
        tracing::info!(has_signature = true, "Webhook signature received");
    }

    process_event(&event);
    let event_type = event.get("type").and_then(Value::as_str).unwrap_or("unknown");

    Json(json!({
        "success": true,
        "message": "Webhook received",
        "eventType": event_type,
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use crate::config::{shared, GatewayConfig};

    async fn call(body: &'static str) -> (StatusCode, Value) {
        let response = webhook_handler(
            State(shared(GatewayConfig::default())),
            HeaderMap::new(),
            Bytes::from_static(body.as_bytes()),
        )
        .await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_process_known_event() {
        let event = json!({"id": "evt_1", "type": "virtual_account.funds_received", "data": {"id": "va_1"}});
        assert_eq!(process_event(&event), Some(EventCategory::VirtualAccount));
    }

    #[test]
    fn test_process_unknown_event() {
        assert_eq!(process_event(&json!({"type": "mystery.happened"})), None);
        assert_eq!(process_event(&json!([1, 2, 3])), None);
    }

    #[tokio::test]
    async fn test_acknowledges_event() {
        let (status, body) = call(r#"{"type":"transfer.completed","data":{"id":"tr_1"}}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"success": true, "message": "Webhook received", "eventType": "transfer.completed"})
        );
    }

    #[tokio::test]
    async fn test_missing_type_is_unknown() {
        let (status, body) = call(r#"{"id":"evt_2"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["eventType"], "unknown");
    }

    #[tokio::test]
    async fn test_invalid_payload() {
        let (status, body) = call("{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_PAYLOAD");
    }
}
