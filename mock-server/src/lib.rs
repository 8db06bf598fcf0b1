use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

/// Entity tag served by `/destinations/etag`.
pub const FIXTURE_ETAG: &str = "\"destinations-v1\"";

/// How long `/destinations/slow` stalls before answering.
pub const SLOW_DELAY: Duration = Duration::from_millis(1500);

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Destination {
    pub property_name: Option<String>,
    pub location: Option<String>,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub fare: Option<f64>,
    pub fare_unit: Option<String>,
    pub is_available: Option<bool>,
    pub hero_image: Option<String>,
    pub detail_images: Option<Vec<Option<String>>>,
    pub currency: Option<String>,
}

/// Shared fixture state: the payload served by `/destinations` and a
/// per-path request counter.
#[derive(Clone, Default)]
pub struct MockState {
    destinations: Arc<RwLock<Vec<Destination>>>,
    hits: Arc<RwLock<HashMap<String, usize>>>,
}

impl MockState {
    pub fn new(destinations: Vec<Destination>) -> Self {
        Self {
            destinations: Arc::new(RwLock::new(destinations)),
            hits: Arc::default(),
        }
    }

    pub async fn set_destinations(&self, destinations: Vec<Destination>) {
        *self.destinations.write().await = destinations;
    }

    /// Number of requests that reached the handler for `path`.
    pub async fn hits(&self, path: &str) -> usize {
        self.hits.read().await.get(path).copied().unwrap_or(0)
    }

    async fn record(&self, path: &str) {
        *self.hits.write().await.entry(path.to_string()).or_insert(0) += 1;
    }
}

pub fn sample_destinations() -> Vec<Destination> {
    vec![
        Destination {
            property_name: Some("Ubud Jungle Retreat".to_string()),
            location: Some("Ubud, Bali, Indonesia".to_string()),
            rating: Some(4.8),
            description: Some("Private villas above the Ayung river valley.".to_string()),
            fare: Some(120.0),
            fare_unit: Some("per night".to_string()),
            is_available: Some(true),
            hero_image: Some("https://img.example.com/ubud/hero.jpg".to_string()),
            detail_images: Some(vec![
                Some("https://img.example.com/ubud/1.jpg".to_string()),
                None,
                Some("https://img.example.com/ubud/2.jpg".to_string()),
            ]),
            currency: Some("USD".to_string()),
        },
        Destination {
            property_name: Some("Oia Cliff Suites".to_string()),
            location: Some("Santorini, Greece".to_string()),
            rating: Some(4.6),
            description: Some("Cave suites facing the caldera.".to_string()),
            fare: Some(310.5),
            fare_unit: Some("per night".to_string()),
            is_available: Some(false),
            hero_image: Some("https://img.example.com/oia/hero.jpg".to_string()),
            detail_images: None,
            currency: Some("EUR".to_string()),
        },
        Destination {
            property_name: Some("Gion Machiya House".to_string()),
            location: Some("Kyoto, Japan".to_string()),
            rating: None,
            description: None,
            fare: Some(18000.0),
            fare_unit: Some("per night".to_string()),
            is_available: None,
            hero_image: None,
            detail_images: Some(Vec::new()),
            currency: Some("JPY".to_string()),
        },
    ]
}

pub fn app() -> Router {
    app_with_state(MockState::new(sample_destinations()))
}

pub fn app_with_state(state: MockState) -> Router {
    Router::new()
        .route("/destinations", get(list_destinations))
        .route("/destinations/empty", get(empty_destinations))
        .route("/destinations/cached", get(cached_destinations))
        .route("/destinations/etag", get(etag_destinations))
        .route("/destinations/no-store", get(no_store_destinations))
        .route("/destinations/slow", get(slow_destinations))
        .route("/malformed", get(malformed))
        .route("/null", get(null_body))
        .route("/blank", get(blank_body))
        .route("/status/{code}", get(status))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn serve(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn list_destinations(State(state): State<MockState>) -> Json<Vec<Destination>> {
    state.record("/destinations").await;
    Json(state.destinations.read().await.clone())
}

async fn empty_destinations(State(state): State<MockState>) -> Json<Vec<Destination>> {
    state.record("/destinations/empty").await;
    Json(Vec::new())
}

async fn cached_destinations(State(state): State<MockState>) -> Response {
    state.record("/destinations/cached").await;
    let body = Json(state.destinations.read().await.clone());
    ([(header::CACHE_CONTROL, "public, max-age=60")], body).into_response()
}

async fn etag_destinations(State(state): State<MockState>, headers: HeaderMap) -> Response {
    state.record("/destinations/etag").await;
    let matches = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == FIXTURE_ETAG);
    if matches {
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, FIXTURE_ETAG)]).into_response();
    }
    let body = Json(state.destinations.read().await.clone());
    (
        [(header::ETAG, FIXTURE_ETAG), (header::CACHE_CONTROL, "no-cache")],
        body,
    )
        .into_response()
}

async fn no_store_destinations(State(state): State<MockState>) -> Response {
    state.record("/destinations/no-store").await;
    let body = Json(state.destinations.read().await.clone());
    ([(header::CACHE_CONTROL, "no-store")], body).into_response()
}

async fn slow_destinations(State(state): State<MockState>) -> Json<Vec<Destination>> {
    state.record("/destinations/slow").await;
    tokio::time::sleep(SLOW_DELAY).await;
    Json(state.destinations.read().await.clone())
}

async fn malformed(State(state): State<MockState>) -> Response {
    state.record("/malformed").await;
    ([(header::CONTENT_TYPE, "application/json")], "not json").into_response()
}

async fn null_body(State(state): State<MockState>) -> Response {
    state.record("/null").await;
    ([(header::CONTENT_TYPE, "application/json")], "null").into_response()
}

async fn blank_body(State(state): State<MockState>) -> StatusCode {
    state.record("/blank").await;
    StatusCode::OK
}

async fn status(State(state): State<MockState>, Path(code): Path<u16>) -> Response {
    state.record("/status").await;
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, format!("status {code}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_serializes_with_snake_case_keys() {
        let json = serde_json::to_value(&sample_destinations()[0]).unwrap();
        assert_eq!(json["property_name"], "Ubud Jungle Retreat");
        assert_eq!(json["fare_unit"], "per night");
        assert_eq!(json["is_available"], true);
        assert_eq!(json["detail_images"][1], serde_json::Value::Null);
    }

    #[test]
    fn absent_fields_serialize_as_null() {
        let json = serde_json::to_value(&sample_destinations()[2]).unwrap();
        assert!(json["rating"].is_null());
        assert!(json["hero_image"].is_null());
        assert_eq!(json["detail_images"], serde_json::json!([]));
    }

    #[test]
    fn sample_payload_keeps_declared_order() {
        let names: Vec<_> = sample_destinations()
            .into_iter()
            .filter_map(|d| d.property_name)
            .collect();
        assert_eq!(
            names,
            ["Ubud Jungle Retreat", "Oia Cliff Suites", "Gion Machiya House"]
        );
    }

    #[tokio::test]
    async fn hits_start_at_zero_and_count_per_path() {
        let state = MockState::default();
        assert_eq!(state.hits("/destinations").await, 0);
        state.record("/destinations").await;
        state.record("/destinations").await;
        state.record("/null").await;
        assert_eq!(state.hits("/destinations").await, 2);
        assert_eq!(state.hits("/null").await, 1);
    }
}
