use std::sync::Arc;

use auto_assign_router::api::rest::router;
use auto_assign_router::models::opportunity::TargetType;
use auto_assign_router::state::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(1024));
    (router(state.clone()), state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn create_freelancer(app: &axum::Router, name: &str) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/freelancers",
            json!({
                "name": name,
                "email": format!("{}@example.com", name.to_lowercase()),
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["users"], 0);
    assert_eq!(body["opportunities"], 0);
    assert_eq!(body["queue_entries"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("queue_entries_created_total"));
}

#[tokio::test]
async fn create_freelancer_hides_password_and_defaults_type() {
    let (app, _state) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/freelancers",
            json!({ "name": "Alice", "email": "Alice@Example.com" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["name"], "Alice");
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["user_type"], "freelancer");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn create_freelancer_empty_name_returns_400() {
    let (app, _state) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/freelancers",
            json!({ "name": "  ", "email": "x@example.com" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn queue_for_missing_project_returns_404() {
    let (app, _state) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/queues",
            json!({
                "target_type": "project",
                "target_id": "00000000-0000-0000-0000-000000000000"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn queue_validation_errors_return_400() {
    let (app, _state) = setup();

    let missing_target = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/queues",
            json!({ "target_type": "gig" }),
        ))
        .await
        .unwrap();
    assert_eq!(missing_target.status(), StatusCode::BAD_REQUEST);

    let unknown_type = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/queues",
            json!({
                "target_type": "auction",
                "target_id": "00000000-0000-0000-0000-000000000001"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(unknown_type.status(), StatusCode::BAD_REQUEST);

    let negative_value = app
        .oneshot(json_request(
            "POST",
            "/queues",
            json!({
                "target_type": "gig",
                "target_id": "00000000-0000-0000-0000-000000000001",
                "project_value": -5.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(negative_value.status(), StatusCode::BAD_REQUEST);
    let body = body_json(negative_value).await;
    assert!(body["error"].as_str().unwrap().contains("project_value"));
}

#[tokio::test]
async fn unknown_resolution_status_returns_400() {
    let (app, _state) = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/queue-entries/00000000-0000-0000-0000-000000000000/resolve",
            json!({ "status": "expired" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn full_queue_flow() {
    let (app, state) = setup();
    let mut events = state.store.subscribe();

    let first = create_freelancer(&app, "Dana").await;
    let second = create_freelancer(&app, "Eli").await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/opportunities",
            json!({
                "target_type": "project",
                "name": "Landing page rebuild",
                "value": 1500.0,
                "auto_assign": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let created = body_json(res).await;
    let target_id = created["opportunity"]["target_id"]
        .as_str()
        .unwrap()
        .to_string();
    let queue = created["queue"].as_array().unwrap().clone();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0]["status"], "notified");
    assert_eq!(queue[1]["status"], "pending");
    assert_eq!(queue[0]["opportunity_name"], "Landing page rebuild");
    assert!(queue[0]["metadata"]["breakdown"]["recency_score"]
        .as_f64()
        .is_some());
    assert!(queue[0]["freelancer"].get("password_hash").is_none());

    let notified_id = queue[0]["id"].as_str().unwrap().to_string();
    let notified_freelancer = queue[0]["freelancer_id"].as_str().unwrap().to_string();
    assert!(notified_freelancer == first || notified_freelancer == second);

    let event = events.try_recv().unwrap();
    let event = serde_json::to_value(&event).unwrap();
    assert_eq!(event["event"], "notified");
    assert_eq!(event["entry_id"], notified_id.as_str());

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/queue-entries/{notified_id}/resolve"),
            json!({
                "status": "accepted",
                "freelancer_id": notified_freelancer,
                "rating": 4.8
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let resolved = body_json(res).await;
    assert_eq!(resolved["status"], "accepted");
    assert_eq!(resolved["freelancer"]["id"], notified_freelancer.as_str());

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/queue-entries/{notified_id}/resolve"),
            json!({ "status": "declined" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/queues/project/{target_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let project_queue = body_json(res).await;
    let entries = project_queue.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["status"], "notified");
    assert_eq!(entries[0]["position"], 1);
    assert_eq!(entries[0]["rank"], 2);
    assert_eq!(entries[1]["status"], "accepted");
    assert_eq!(entries[1]["position"], 2);

    let res = app
        .clone()
        .oneshot(get_request(&format!(
            "/freelancers/{notified_freelancer}/metrics"
        )))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let metrics = body_json(res).await;
    assert_eq!(metrics["total_assigned"], 1);
    assert_eq!(metrics["total_completed"], 1);
    assert_eq!(metrics["completion_rate"], 1.0);
    assert_eq!(metrics["rating"], 4.8);
    assert_eq!(metrics["lifetime_completed_value"], 1500.0);

    let other = if notified_freelancer == first {
        &second
    } else {
        &first
    };
    let res = app
        .clone()
        .oneshot(get_request(&format!("/freelancers/{other}/queue")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page = body_json(res).await;
    assert_eq!(page["pagination"]["total"], 1);
    assert_eq!(page["entries"][0]["status"], "notified");

    let res = app
        .oneshot(get_request(&format!(
            "/freelancers/{notified_freelancer}/queue?statuses=accepted,unknown"
        )))
        .await
        .unwrap();
    let page = body_json(res).await;
    assert_eq!(page["pagination"]["total"], 1);
    assert_eq!(page["entries"][0]["status"], "accepted");
}

#[tokio::test]
async fn failed_auto_assign_withdraws_opportunity() {
    let (app, state) = setup();
    create_freelancer(&app, "Fay").await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/opportunities",
            json!({
                "target_type": "bounty",
                "name": "Unknown kind",
                "auto_assign": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.directory.opportunity_count(), 0);

    let res = app
        .oneshot(json_request(
            "POST",
            "/opportunities",
            json!({
                "target_type": "gig",
                "name": "Logo sketch",
                "value": 300.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert!(body["queue"].as_array().unwrap().is_empty());
    assert_eq!(state.directory.opportunity_count(), 1);
}

#[tokio::test]
async fn rejected_auto_assign_keeps_existing_registration() {
    let (app, state) = setup();
    create_freelancer(&app, "Gus").await;
    let target_id = "00000000-0000-0000-0000-00000000abcd";

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/opportunities",
            json!({
                "target_type": "project",
                "target_id": target_id,
                "name": "Original brief",
                "value": 900.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(json_request(
            "POST",
            "/opportunities",
            json!({
                "target_type": "project",
                "target_id": target_id,
                "name": "Replacement brief",
                "value": -1.0,
                "auto_assign": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let stored = state
        .directory
        .opportunity(TargetType::Project, target_id.parse().unwrap())
        .unwrap();
    assert_eq!(stored.name, "Original brief");
    assert_eq!(stored.value, Some(900.0));
}

#[tokio::test]
async fn auto_assign_honours_limit_and_expiry() {
    let (app, _state) = setup();
    for name in ["Hana", "Ivo", "Jun"] {
        create_freelancer(&app, name).await;
    }

    let res = app
        .oneshot(json_request(
            "POST",
            "/opportunities",
            json!({
                "target_type": "gig",
                "name": "Icon set",
                "auto_assign": true,
                "limit": 2,
                "expires_in_minutes": 60
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    let queue = body["queue"].as_array().unwrap();
    assert_eq!(queue.len(), 2);
    let created_at: DateTime<Utc> = queue[0]["created_at"].as_str().unwrap().parse().unwrap();
    let expires_at: DateTime<Utc> = queue[0]["expires_at"].as_str().unwrap().parse().unwrap();
    assert_eq!(expires_at - created_at, Duration::minutes(60));
}

#[tokio::test]
async fn negative_limit_is_clamped_not_rejected() {
    let (app, _state) = setup();
    for name in ["Kai", "Lea"] {
        create_freelancer(&app, name).await;
    }

    let res = app
        .oneshot(json_request(
            "POST",
            "/queues",
            json!({
                "target_type": "job",
                "target_id": "00000000-0000-0000-0000-000000000002",
                "limit": -3
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let queue = body_json(res).await;
    assert_eq!(queue.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn metrics_for_unknown_freelancer_returns_404() {
    let (app, _state) = setup();
    let response = app
        .oneshot(get_request(
            "/freelancers/00000000-0000-0000-0000-000000000000/metrics",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
