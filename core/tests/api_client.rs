use serde_json::json;
use shiftsync_core::{
    models::{BreakType, SessionStatus},
    store::{ClockOutRequest, EndBreakRequest, StartBreakRequest},
    ApiClient, SessionStore, StoreError,
};
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

async fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(format!("{}/api/", server.uri())).with_token("secret-token")
}

#[tokio::test]
async fn clock_in_sends_bearer_token_and_decodes_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/clock-in"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "staffUserId": "u1",
            "clockIn": "2025-01-02T09:00:00Z",
            "status": "ACTIVE"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = client_for(&server).await.clock_in().await.unwrap();

    assert_eq!(session.id, "42");
    assert_eq!(session.status, SessionStatus::Active);
    assert_eq!(session.owner_id.unwrap(), "u1");
}

#[tokio::test]
async fn clock_out_posts_reason_and_notes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/clock-out"))
        .and(body_json(json!({"reason": "sick", "notes": "left early"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "s1",
            "clockInAt": "2025-01-02T09:00:00Z",
            "clockOutAt": "2025-01-02T11:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = client_for(&server)
        .await
        .clock_out(ClockOutRequest {
            reason: Some("sick".into()),
            notes: Some("left early".into()),
        })
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Closed);
}

#[tokio::test]
async fn break_commands_use_wire_field_names() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/breaks/start"))
        .and(body_json(json!({"type": "AWAY", "awayReason": "doctor"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "b1",
            "type": "AWAY",
            "actualStart": "2025-01-02T14:00:00Z",
            "awayReason": "doctor",
            "isPaused": false,
            "pausedDuration": 0
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/breaks/end"))
        .and(body_json(json!({"breakId": "b1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "b1",
            "actualEnd": "2025-01-02T14:30:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server).await;

    let started = client
        .start_break(StartBreakRequest {
            break_type: BreakType::Away,
            away_reason: Some("doctor".into()),
        })
        .await
        .unwrap();
    let ended = client
        .end_break(EndBreakRequest {
            break_id: "b1".into(),
        })
        .await
        .unwrap();

    assert_eq!(started.break_type, Some(BreakType::Away));
    assert_eq!(started.paused_duration_seconds, Some(0));
    assert!(ended.actual_end.is_some());
    assert!(ended.break_type.is_none());
}

#[tokio::test]
async fn reads_status_entries_and_scheduled_breaks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isClockedIn": true,
            "activeEntry": {"id": "s1", "clockInAt": "2025-01-02T09:00:00Z"},
            "activeBreak": null,
            "workSchedules": [{
                "id": "w1",
                "dayOfWeek": 4,
                "startTime": "09:00:00",
                "endTime": "17:00:00"
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/entries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [{"id": "s1", "clockInAt": "2025-01-02T09:00:00Z"}],
            "stats": {"today": 2.5, "week": 10.0, "month": 42.0}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/breaks/scheduled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "b1",
            "type": "LUNCH",
            "scheduledStart": "2025-01-02T12:00:00Z",
            "scheduledEnd": "2025-01-02T13:00:00Z"
        }])))
        .mount(&server)
        .await;
    let client = client_for(&server).await;

    let status = client.status().await.unwrap();
    let entries = client.entries().await.unwrap();
    let breaks = client.scheduled_breaks().await.unwrap();

    assert!(status.is_clocked_in);
    assert!(status.active_break.is_none());
    assert!(status.work_schedules[0].is_active);
    assert_eq!(entries.entries.len(), 1);
    assert_eq!(entries.stats.month, 42.0);
    assert_eq!(breaks[0].break_type, BreakType::Lunch);
    assert!(breaks[0].actual_start.is_none());
}

#[tokio::test]
async fn rejection_carries_store_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/clock-in"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"error": "Already clocked in"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).await.clock_in().await.unwrap_err();

    assert_eq!(
        err,
        StoreError::Rejected {
            status: 409,
            message: "Already clocked in".into(),
        }
    );
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/breaks/scheduled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .scheduled_breaks()
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Decode(_)));
}

#[tokio::test]
async fn unreachable_store_is_a_connectivity_error() {
    // Nothing listens on the discard port.
    let client = ApiClient::new("http://127.0.0.1:9");

    let err = client.status().await.unwrap_err();

    assert!(matches!(err, StoreError::Connectivity(_)));
}
