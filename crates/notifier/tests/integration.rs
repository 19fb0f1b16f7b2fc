//! Delivery tests against a local stand-in for the Discord REST API.

use std::time::Duration;

use axum::Router;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;

use cqc_common::error::DeliveryError;
use cqc_common::types::{ChannelId, NotificationPayload};
use cqc_notifier::{DiscordSender, MessageSender};

/// Channel 1 accepts, 2 is deleted, 3 is rate limited, 4 is broken.
async fn create_message(Path(channel_id): Path<u64>, headers: HeaderMap) -> (StatusCode, String) {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bot test-token") {
        return (StatusCode::UNAUTHORIZED, "bad token".to_string());
    }
    match channel_id {
        1 => (StatusCode::OK, r#"{"id": "1"}"#.to_string()),
        2 => (
            StatusCode::NOT_FOUND,
            r#"{"message": "Unknown Channel", "code": 10003}"#.to_string(),
        ),
        3 => (
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"message": "You are being rate limited.", "retry_after": 0.25}"#.to_string(),
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string()),
    }
}

async fn spawn_fake_discord() -> String {
    let app = Router::new().route("/channels/{channel_id}/messages", post(create_message));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn payload() -> NotificationPayload {
    NotificationPayload {
        title: "CQC Activity Detected".to_string(),
        body: "🔹 ALPHA gained 1,000 points".to_string(),
        color: 0x2ecc71,
        footer: Some("CQC Monitor".to_string()),
    }
}

async fn sender() -> DiscordSender {
    let base = spawn_fake_discord().await;
    DiscordSender::new(base, "test-token".to_string(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_successful_delivery() {
    let sender = sender().await;
    assert!(sender.send(ChannelId(1), &payload()).await.is_ok());
}

#[tokio::test]
async fn test_deleted_channel_is_permanent() {
    let sender = sender().await;
    let err = sender.send(ChannelId(2), &payload()).await.unwrap_err();
    assert!(err.is_permanent());
}

#[tokio::test]
async fn test_rate_limit_is_transient_with_delay() {
    let sender = sender().await;
    let err = sender.send(ChannelId(3), &payload()).await.unwrap_err();
    assert_eq!(
        err,
        DeliveryError::Transient {
            reason: "rate limited".to_string(),
            retry_after: Some(Duration::from_millis(250)),
        }
    );
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let sender = sender().await;
    let err = sender.send(ChannelId(4), &payload()).await.unwrap_err();
    assert_eq!(err.kind(), "transient");
}

#[tokio::test]
async fn test_unreachable_host_is_transient() {
    let sender = DiscordSender::new(
        "http://127.0.0.1:1".to_string(),
        "test-token".to_string(),
        Duration::from_secs(2),
    )
    .unwrap();
    let err = sender.send(ChannelId(1), &payload()).await.unwrap_err();
    assert!(!err.is_permanent());
}
