use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use log::{debug, info, warn};
use serde_json::Value;

use crate::error::RelayError;
use crate::events::{EventKind, EVENT_HEADER};
use crate::providers::gitlab::decode;
use crate::relay::{Delivery, Relay};

type Reply = (StatusCode, &'static str);

pub fn router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route(
            "/git/:chat",
            post(receive_hook)
                .get(nothing)
                .put(use_post)
                .delete(nothing),
        )
        .route("/health", get(|| async { "ok" }))
        .with_state(relay)
}

/// Serves the webhook endpoint until Ctrl-C.
pub async fn serve(addr: SocketAddr, relay: Arc<Relay>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Listening for GitLab webhooks on http://{addr}/git/<chat>");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down");
    };

    axum::serve(listener, router(relay))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Webhook server failed")
}

async fn receive_hook(
    State(relay): State<Arc<Relay>>,
    Path(chat): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Reply {
    let header = headers
        .get(EVENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    debug!("Received {header:?} for chat {chat}");

    let kind = match EventKind::from_header(header) {
        Ok(kind) => kind,
        Err(e) => {
            debug!("Ignoring hook: {e}");
            return reply(Err(e));
        }
    };

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Rejecting {header:?} with invalid JSON body: {e}");
            return (StatusCode::BAD_REQUEST, "Invalid payload");
        }
    };

    let event = decode(kind, &payload);
    debug!("Handling event for pipeline {}", event.pipeline_id());
    reply(relay.handle(event).await)
}

fn reply(result: crate::error::Result<Delivery>) -> Reply {
    match result {
        Ok(Delivery::Sent) => (StatusCode::OK, "Message sent"),
        Ok(Delivery::PipelineUpdated) => (StatusCode::OK, "Message_updated"),
        Ok(Delivery::JobUpdated) => (StatusCode::OK, "Message updated"),
        Err(RelayError::UnsupportedEventKind(_)) => (StatusCode::NOT_FOUND, "Hook is not supported"),
        Err(RelayError::PipelineNotFound(_)) => (StatusCode::NOT_FOUND, "pipeline not found"),
        Err(RelayError::SendFailed(_)) => (StatusCode::NOT_FOUND, "Message not sent"),
        Err(RelayError::UpdateFailed(_)) => (StatusCode::NOT_FOUND, "Message not updated"),
        Err(e) => {
            warn!("Unexpected error while handling webhook: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

async fn nothing() -> Reply {
    (StatusCode::NOT_FOUND, "Nothing")
}

async fn use_post() -> Reply {
    (StatusCode::NOT_FOUND, "Use POST to send message")
}
