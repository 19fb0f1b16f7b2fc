//! Integration tests for API routes.
//!
//! Uses `tower::ServiceExt` to drive the Axum router without a real HTTP
//! server. The registry is in-memory and delivery goes to a recording fake.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::sync::watch;
use tower::ServiceExt;

use cqc_api::routes::create_router;
use cqc_api::state::AppState;
use cqc_common::config::AppConfig;
use cqc_common::error::DeliveryError;
use cqc_common::types::{ChannelId, DestinationId, NotificationPayload, PollStatus};
use cqc_engine::DestinationRegistry;
use cqc_notifier::MessageSender;

const ADMIN_TOKEN: &str = "test-admin-token";

// ============================================================
// Helpers
// ============================================================

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<(ChannelId, String)>>,
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(
        &self,
        channel_id: ChannelId,
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push((channel_id, payload.title.clone()));
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn test_config(admin_token: Option<&str>) -> AppConfig {
    AppConfig {
        discord_bot_token: "unused".to_string(),
        discord_api_base: "http://unused".to_string(),
        leaderboard_url: "http://unused/leaderboard".to_string(),
        diff_url: "http://unused/diff/{action_id}".to_string(),
        poll_interval_secs: 60,
        cycle_timeout_secs: 45,
        http_timeout_secs: 10,
        delivery_max_attempts: 3,
        delivery_backoff_ms: 500,
        dispatch_concurrency: 8,
        registry_path: "unused.json".into(),
        api_bind_addr: "127.0.0.1:0".parse().unwrap(),
        admin_api_token: admin_token.map(str::to_string),
        highlight_squadrons: vec![],
    }
}

struct TestApp {
    state: AppState,
    sender: Arc<RecordingSender>,
    _status_tx: watch::Sender<PollStatus>,
}

impl TestApp {
    fn new(admin_token: Option<&str>) -> Self {
        let registry = Arc::new(DestinationRegistry::in_memory());
        let sender = Arc::new(RecordingSender::default());
        let (status_tx, status_rx) = watch::channel(PollStatus {
            poll_interval_secs: 60,
            last_action_id: Some(4242),
            ..Default::default()
        });
        let state = AppState::new(
            registry,
            sender.clone(),
            status_rx,
            test_config(admin_token),
        );
        Self {
            state,
            sender,
            _status_tx: status_tx,
        }
    }

    fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", ADMIN_TOKEN));

        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_string(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }
}

// ============================================================
// Health and authentication
// ============================================================

#[tokio::test]
async fn test_health_endpoint_is_public() {
    let app = TestApp::new(Some(ADMIN_TOKEN));

    let response = app
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "cqc-monitor");
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let app = TestApp::new(Some(ADMIN_TOKEN));

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/destinations")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .header("authorization", "Bearer wrong-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unset_admin_token_disables_admin_api() {
    let app = TestApp::new(None);
    let (status, body) = app.call("GET", "/api/destinations", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("ADMIN_API_TOKEN"));
}

// ============================================================
// Destination management
// ============================================================

#[tokio::test]
async fn test_destination_lifecycle_via_api() {
    let app = TestApp::new(Some(ADMIN_TOKEN));

    // 1. Register
    let (status, created) = app.call("PUT", "/api/destinations/100", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["destination_id"], 100);
    assert_eq!(created["enabled"], false);
    assert!(created["channel_id"].is_null());

    // 2. Enabling without a channel is refused
    let (status, _) = app.call("POST", "/api/destinations/100/enable", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // 3. Set channel, then enable
    let (status, updated) = app
        .call(
            "PUT",
            "/api/destinations/100/channel",
            Some(serde_json::json!({"channel_id": 555})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["channel_id"], 555);

    let (status, enabled) = app.call("POST", "/api/destinations/100/enable", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(enabled["enabled"], true);
    assert_eq!(app.state.registry.list_enabled().await.len(), 1);

    // 4. List
    let (status, list) = app.call("GET", "/api/destinations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    // 5. Disable
    let (status, disabled) = app.call("POST", "/api/destinations/100/disable", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(disabled["enabled"], false);
    assert!(app.state.registry.list_enabled().await.is_empty());

    // 6. Delete is idempotent
    let (status, first) = app.call("DELETE", "/api/destinations/100", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["removed"], true);

    let (status, second) = app.call("DELETE", "/api/destinations/100", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["removed"], false);
}

#[tokio::test]
async fn test_unknown_destination_is_not_found() {
    let app = TestApp::new(Some(ADMIN_TOKEN));

    let (status, body) = app.call("POST", "/api/destinations/9/enable", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = app
        .call(
            "PUT",
            "/api/destinations/9/channel",
            Some(serde_json::json!({"channel_id": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_reports_poll_and_registry() {
    let app = TestApp::new(Some(ADMIN_TOKEN));
    app.state.registry.upsert(DestinationId(1)).await;
    app.state.registry.upsert(DestinationId(2)).await;

    let (status, body) = app.call("GET", "/api/status", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["registry"]["total"], 2);
    assert_eq!(body["registry"]["enabled"], 0);
    assert_eq!(body["poll"]["last_action_id"], 4242);
    assert_eq!(body["poll"]["poll_interval_secs"], 60);
}

// ============================================================
// Command bridge
// ============================================================

#[tokio::test]
async fn test_admin_command_from_member_forbidden() {
    let app = TestApp::new(Some(ADMIN_TOKEN));

    let (status, _) = app
        .call(
            "POST",
            "/api/commands",
            Some(serde_json::json!({
                "command": "cqc_enable",
                "destination_id": 7,
                "invoking_channel_id": 70,
                "is_admin": false
            })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.state.registry.get(DestinationId(7)).await.is_none());
}

#[tokio::test]
async fn test_unknown_command_is_bad_request() {
    let app = TestApp::new(Some(ADMIN_TOKEN));

    let (status, _) = app
        .call(
            "POST",
            "/api/commands",
            Some(serde_json::json!({
                "command": "cqc_selfdestruct",
                "destination_id": 7,
                "invoking_channel_id": 70,
                "is_admin": true
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_channel_command_needs_channel_argument() {
    let app = TestApp::new(Some(ADMIN_TOKEN));
    let request = |channel: Option<u64>| {
        serde_json::json!({
            "command": "cqc_channel",
            "channel_id": channel,
            "destination_id": 7,
            "invoking_channel_id": 70,
            "is_admin": true
        })
    };

    let (status, body) = app.call("POST", "/api/commands", Some(request(None))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("channel"));

    let (status, _) = app
        .call("POST", "/api/commands", Some(request(Some(71))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.state.registry.get(DestinationId(7)).await.unwrap().channel_id,
        Some(ChannelId(71))
    );
}

#[tokio::test]
async fn test_this_channel_then_enable_via_commands() {
    let app = TestApp::new(Some(ADMIN_TOKEN));
    let ctx = |command: &str| {
        serde_json::json!({
            "command": command,
            "destination_id": 7,
            "invoking_channel_id": 70,
            "is_admin": true
        })
    };

    let (status, reply) = app
        .call("POST", "/api/commands", Some(ctx("/cqc_this_channel")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(reply["body"].as_str().unwrap().contains("<#70>"));

    let (status, _) = app.call("POST", "/api/commands", Some(ctx("cqc_enable"))).await;
    assert_eq!(status, StatusCode::OK);

    let dest = app.state.registry.get(DestinationId(7)).await.unwrap();
    assert_eq!(dest.channel_id, Some(ChannelId(70)));
    assert!(dest.enabled);
}

#[tokio::test]
async fn test_help_command_open_to_members() {
    let app = TestApp::new(Some(ADMIN_TOKEN));

    let (status, reply) = app
        .call(
            "POST",
            "/api/commands",
            Some(serde_json::json!({
                "command": "cqc_help",
                "destination_id": 8,
                "invoking_channel_id": 80,
                "is_admin": false
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(reply["body"].as_str().unwrap().contains("/cqc_enable"));
    // Any command registers the server.
    assert!(app.state.registry.get(DestinationId(8)).await.is_some());
}

// ============================================================
// Server membership
// ============================================================

#[tokio::test]
async fn test_guild_join_and_removal() {
    let app = TestApp::new(Some(ADMIN_TOKEN));

    let (status, body) = app
        .call(
            "POST",
            "/api/guilds/300/joined",
            Some(serde_json::json!({
                "channels": [
                    {"id": 1, "name": "general", "can_send": true},
                    {"id": 2, "name": "cqc-updates", "can_send": true}
                ]
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["channel_id"], 2);

    let dest = app.state.registry.get(DestinationId(300)).await.unwrap();
    assert_eq!(dest.channel_id, Some(ChannelId(2)));
    assert!(!dest.enabled);

    let sent = app.sender.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ChannelId(2));

    for _ in 0..2 {
        let (status, _) = app.call("POST", "/api/guilds/300/removed", None).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert!(app.state.registry.get(DestinationId(300)).await.is_none());
}
