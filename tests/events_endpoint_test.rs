use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use event_search::app::event_search_use_case::EventSearchUseCase;
use event_search::app::ports::{
    EventSearchPort, SearchParams, SummarizerPort, UpstreamOutcome, UpstreamResponse,
};
use event_search::common::error::{Result, SearchError};
use event_search::common::types::{EventRecord, RawSearchPayload, UpstreamDebug};
use event_search::pipeline::cache::{CachePolicy, QueryCache};
use event_search::server::{create_server, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct FixturePayload;

#[async_trait]
impl EventSearchPort for FixturePayload {
    async fn search(&self, params: &SearchParams) -> Result<UpstreamResponse> {
        let events = if params.page == 1 {
            let payload: RawSearchPayload = serde_json::from_value(json!({
                "events": [
                    {
                        "title": "Kimberly Akimbo",
                        "datetime_local": "2026-01-06T13:30:00",
                        "venue": { "name": "The Grand", "city": "Dallas", "state": "TX" },
                        "url": "https://tickets.example/ka-1",
                        "performers": [ { "name": "Cast", "image": null }, { "name": "Tour", "image": "img-b" } ]
                    },
                    {
                        "title": "Kimberly Akimbo",
                        "datetime_local": "2026-01-06T19:30:00",
                        "venue": { "name": "The Grand", "city": "Dallas", "state": "TX" },
                        "url": "https://tickets.example/ka-2"
                    },
                    {
                        "title": "Other Show",
                        "datetime_local": "2026-01-06T20:00:00",
                        "venue": { "name": "Small Room", "city": "Dallas", "state": "TX" },
                        "image": "img-other"
                    }
                ]
            }))?;
            payload.events
        } else {
            Vec::new()
        };
        Ok(UpstreamResponse {
            outcome: UpstreamOutcome::Events(events),
            debug: UpstreamDebug {
                url: format!("test://events?page={}", params.page),
                status: Some(200),
                mode: None,
                body: None,
            },
        })
    }
}

struct MissingClientId;

#[async_trait]
impl EventSearchPort for MissingClientId {
    async fn search(&self, _params: &SearchParams) -> Result<UpstreamResponse> {
        Err(SearchError::Config("Server missing SEATGEEK_CLIENT_ID".to_string()))
    }
}

struct ShortBlurb;

#[async_trait]
impl SummarizerPort for ShortBlurb {
    async fn summarize(&self, _event: &EventRecord) -> Result<String> {
        Ok("Short blurb".to_string())
    }
}

fn app(upstream: Arc<dyn EventSearchPort>) -> axum::Router {
    let summarizer: Arc<dyn SummarizerPort> = Arc::new(ShortBlurb);
    let cache = Arc::new(QueryCache::new(CachePolicy {
        capacity: 8,
        ttl: Duration::from_secs(60),
    }));
    create_server(AppState {
        use_case: Arc::new(EventSearchUseCase::new(upstream, Some(summarizer), cache, 3)),
        environment: "test".to_string(),
    })
}

fn post_events(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/events")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_events_are_deduplicated_and_described() {
    let resp = app(Arc::new(FixturePayload))
        .oneshot(post_events(
            r#"{"location":"Dallas, TX","interests":["theatre"],"date":"2026-01-06"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);

    let kimberly = &items[0];
    assert_eq!(kimberly["title"], "Kimberly Akimbo");
    assert_eq!(kimberly["image"], "img-b");
    assert_eq!(kimberly["showings"], 2);
    assert_eq!(kimberly["startTime"], "2026-01-06T13:30:00");
    assert_eq!(kimberly["otherStartTimes"], json!(["2026-01-06T19:30:00"]));
    assert_eq!(kimberly["venue"], "The Grand, Dallas, TX");

    let other = &items[1];
    assert_eq!(other["title"], "Other Show");
    assert_eq!(other["image"], "img-other");
    assert_eq!(other["showings"], 1);

    assert_eq!(body["descriptions"], json!(["Short blurb", "Short blurb"]));
    assert_eq!(body["debug"]["status"], 200);
}

#[tokio::test]
async fn test_second_request_marks_query_exhausted() {
    let app = app(Arc::new(FixturePayload));
    let request = r#"{"location":"Dallas, TX","interests":["theatre"]}"#;

    let first = json_body(app.clone().oneshot(post_events(request)).await.unwrap()).await;
    let second = json_body(app.clone().oneshot(post_events(request)).await.unwrap()).await;
    let third = json_body(app.oneshot(post_events(request)).await.unwrap()).await;

    assert_eq!(first["items"], second["items"]);
    assert!(second["debug"].is_object());
    // exhausted: served from cache without an upstream call
    assert!(third["debug"].is_null());
    assert_eq!(third["items"], first["items"]);
}

#[tokio::test]
async fn test_missing_credential_is_reported() {
    let resp = app(Arc::new(MissingClientId))
        .oneshot(post_events(r#"{"location":"Dallas, TX"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(resp).await;
    assert_eq!(body["error"], "Server missing SEATGEEK_CLIENT_ID");
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let resp = app(Arc::new(FixturePayload))
        .oneshot(post_events("{not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_body_is_default_query() {
    let resp = app(Arc::new(FixturePayload))
        .oneshot(post_events(""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_service_routes() {
    let app = app(Arc::new(FixturePayload));

    let health = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(json_body(health).await, json!({ "ok": true }));

    let version = app
        .clone()
        .oneshot(Request::builder().uri("/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let version = json_body(version).await;
    assert_eq!(version["name"], "event-backend");
    assert_eq!(version["environment"], "test");
    assert!(version["time"].is_string());

    let hint = app
        .oneshot(Request::builder().uri("/events").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(hint.status(), StatusCode::OK);
    assert!(json_body(hint).await["hint"].as_str().unwrap().contains("POST /events"));
}
