//! Axum JSON API + Askama dashboard for the FoodShare marketplace.

use std::collections::BTreeSet;
use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path as AxumPath, Query, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use foodshare_catalog::{time_remaining_label, FilterCriteria, MarketStats};
use foodshare_core::{
    Coordinates, DonorType, FoodCategory, Listing, ListingDraft, ListingId, NotificationId,
    PartnerApplication, UserId,
};
use foodshare_market::{BrowseQuery, MarketConfig, MarketService, NotificationCenter};
use foodshare_store::StoreError;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub market: Arc<MarketService>,
    pub notifications: Arc<NotificationCenter>,
}

impl AppState {
    pub fn new(market: Arc<MarketService>, notifications: Arc<NotificationCenter>) -> Self {
        Self {
            market,
            notifications,
        }
    }

    /// Builds the service from config with the notification center wired in as its
    /// notifier.
    pub async fn from_config(config: MarketConfig) -> anyhow::Result<Self> {
        let notifications = Arc::new(NotificationCenter::new());
        let market = MarketService::from_config(config)
            .await?
            .with_notifier(notifications.clone());
        Ok(Self::new(Arc::new(market), notifications))
    }
}

#[derive(Debug, Deserialize, Default)]
struct ListingsQuery {
    q: Option<String>,
    category: Option<String>,
    max_distance: Option<String>,
    donor_type: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    page: Option<usize>,
    per_page: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct ViewerQuery {
    lat: Option<f64>,
    lng: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ClaimRequest {
    user_id: UserId,
}

#[derive(Debug, Clone)]
struct ListingRow {
    id: String,
    title: String,
    donor_name: String,
    categories: String,
    distance: String,
    time_left: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    stats: MarketStats,
    unread_notifications: usize,
}

#[derive(Template)]
#[template(path = "listings_table_partial.html")]
struct ListingsTablePartialTemplate {
    rows: Vec<ListingRow>,
    page: usize,
    total_pages: usize,
}

#[derive(Debug)]
enum ApiError {
    Store(StoreError),
    BadRequest(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

// Malformed bodies and query strings answer with the same `{"error"}` shape.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Store(err) => {
                let status = match &err {
                    StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                    StoreError::AlreadyUnavailable { .. } => StatusCode::CONFLICT,
                    StoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    StoreError::DuplicateId(_) | StoreError::DuplicatePartnerId(_) => {
                        StatusCode::CONFLICT
                    }
                };
                (status, err.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/listings", get(listings_handler).post(submit_listing_handler))
        .route("/listings/table", get(listings_table_handler))
        .route("/listings/facets", get(listings_facets_handler))
        .route("/listings/{id}", get(listing_detail_handler))
        .route("/listings/{id}/claim", post(claim_handler))
        .route("/partners", get(partners_handler).post(register_partner_handler))
        .route(
            "/notifications",
            get(notifications_handler).delete(clear_notifications_handler),
        )
        .route("/notifications/read-all", post(read_all_notifications_handler))
        .route("/notifications/{id}/read", post(read_notification_handler))
        .route("/notifications/{id}", delete(remove_notification_handler))
        .route("/stats", get(stats_handler))
        .with_state(Arc::new(state))
}

pub async fn serve(config: MarketConfig) -> anyhow::Result<()> {
    let port = config.web_port;
    let state = AppState::from_config(config).await?;
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "serving foodshare web");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    serve(MarketConfig::from_env()).await
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    render_html(IndexTemplate {
        stats: state.market.stats().await,
        unread_notifications: state.notifications.unread_count().await,
    })
}

async fn listings_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListingsQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let browse = browse_query(&query)?;
    Ok(Json(state.market.browse(&browse).await).into_response())
}

async fn listings_table_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListingsQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let browse = browse_query(&query)?;
    let page = state.market.browse(&browse).await;
    let now = state.market.now();
    let rows = page.items.iter().map(|l| listing_row(l, now)).collect();
    let mut resp = render_html(ListingsTablePartialTemplate {
        rows,
        page: page.page,
        total_pages: page.total_pages,
    });
    resp.headers_mut().insert(
        header::HeaderName::from_static("hx-trigger"),
        header::HeaderValue::from_static("listingsTableLoaded"),
    );
    Ok(resp)
}

async fn listings_facets_handler(State(state): State<Arc<AppState>>) -> Response {
    Json(state.market.facets().await).into_response()
}

async fn listing_detail_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    viewer: Result<Query<ViewerQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(viewer) = viewer?;
    let origin = viewer_origin(viewer.lat, viewer.lng)?;
    let listing = state.market.get(&ListingId::new(id), origin.as_ref()).await?;
    Ok(Json(listing).into_response())
}

async fn submit_listing_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ListingDraft>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(draft) = payload?;
    let listing = state.market.submit(draft).await?;
    Ok((StatusCode::CREATED, Json(listing)).into_response())
}

async fn claim_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    payload: Result<Json<ClaimRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let listing = state
        .market
        .claim(&ListingId::new(id), &request.user_id)
        .await?;
    Ok(Json(listing).into_response())
}

async fn partners_handler(State(state): State<Arc<AppState>>) -> Response {
    Json(state.market.partners().await).into_response()
}

async fn register_partner_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PartnerApplication>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(application) = payload?;
    let partner = state.market.register_partner(application).await?;
    Ok((StatusCode::CREATED, Json(partner)).into_response())
}

async fn notifications_handler(State(state): State<Arc<AppState>>) -> Response {
    let notifications = state.notifications.list().await;
    let unread = notifications.iter().filter(|n| !n.read).count();
    Json(serde_json::json!({
        "unread": unread,
        "notifications": notifications,
    }))
    .into_response()
}

async fn read_notification_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> StatusCode {
    if state.notifications.mark_as_read(&NotificationId::new(id)).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn read_all_notifications_handler(State(state): State<Arc<AppState>>) -> Response {
    let updated = state.notifications.mark_all_as_read().await;
    Json(serde_json::json!({ "updated": updated })).into_response()
}

async fn remove_notification_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> StatusCode {
    if state.notifications.remove(&NotificationId::new(id)).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn clear_notifications_handler(State(state): State<Arc<AppState>>) -> Response {
    let removed = state.notifications.clear_all().await;
    Json(serde_json::json!({ "removed": removed })).into_response()
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> Response {
    Json(state.market.stats().await).into_response()
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            error!(error = %err, "template render failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Server error: {err}")),
            )
                .into_response()
        }
    }
}

// Empty, "all" and "any" are the UI's "no filter" values.
fn selected(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all") && !v.eq_ignore_ascii_case("any"))
}

fn browse_query(query: &ListingsQuery) -> Result<BrowseQuery, ApiError> {
    let category = selected(&query.category)
        .map(|v| v.parse::<FoodCategory>())
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let donor_type = selected(&query.donor_type)
        .map(|v| v.parse::<DonorType>())
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let max_distance_km = selected(&query.max_distance)
        .map(|v| {
            v.parse::<f64>()
                .ok()
                .filter(|d| d.is_finite() && *d >= 0.0)
                .ok_or_else(|| ApiError::BadRequest(format!("invalid max_distance: {v}")))
        })
        .transpose()?;

    Ok(BrowseQuery {
        criteria: FilterCriteria {
            search_text: query.q.clone(),
            category,
            max_distance_km,
            donor_type,
            ..Default::default()
        },
        viewer: viewer_origin(query.lat, query.lng)?,
        page: query.page,
        per_page: query.per_page,
    })
}

fn viewer_origin(lat: Option<f64>, lng: Option<f64>) -> Result<Option<Coordinates>, ApiError> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => {
            let origin = Coordinates { lat, lng };
            if origin.is_valid() {
                Ok(Some(origin))
            } else {
                Err(ApiError::BadRequest(format!("invalid viewer coordinates {lat},{lng}")))
            }
        }
        (None, None) => Ok(None),
        _ => Err(ApiError::BadRequest("lat and lng must be given together".into())),
    }
}

fn listing_row(listing: &Listing, now: DateTime<Utc>) -> ListingRow {
    let categories = listing
        .items
        .iter()
        .map(|i| i.category)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(FoodCategory::label)
        .collect::<Vec<_>>()
        .join(", ");
    ListingRow {
        id: listing.id.to_string(),
        title: listing.title.clone(),
        donor_name: listing.donor.name.clone(),
        categories,
        distance: listing
            .location
            .distance_km
            .map(|d| format!("{d:.1} km"))
            .unwrap_or_else(|| "unknown".to_string()),
        time_left: time_remaining_label(listing.available_until, now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use foodshare_market::SeedFile;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const SEED: &str = r#"
listings:
  - id: A
    title: Fresh Bakery Items
    description: Bread and croissants
    donor: { id: d1, name: Green Leaf Cafe, donor_type: business, rating: 4.8 }
    items:
      - { name: Croissants, category: Baked Goods, quantity: 12, unit: pieces, condition: excellent }
    location: { address: 123 Main St, coordinates: { lat: 40.7128, lng: -74.006 }, distance_km: 0.8 }
    opens_in_minutes: -30
    closes_in_minutes: 180
  - id: B
    title: Surplus Vegetables
    donor: { id: d2, name: Organic Harvest Co, donor_type: business, rating: 4.9 }
    items:
      - { name: Carrots, category: Fresh Produce, quantity: 5, unit: kg, condition: good }
    location: { address: 456 Market Square, coordinates: { lat: 40.7589, lng: -73.9851 }, distance_km: 1.2 }
    closes_in_minutes: 600
  - id: C
    title: Day-Old Pastries
    donor: { id: d3, name: Sunrise Bakery, donor_type: business, rating: 4.9 }
    items:
      - { name: Muffins, category: Baked Goods, quantity: 10, unit: pieces, condition: good }
    location: { address: 789 Baker Ave, coordinates: { lat: 40.7831, lng: -73.9712 }, distance_km: 0.8 }
    closes_in_minutes: 600
    claimed_by: early-bird
"#;

    fn test_app() -> (Router, Arc<NotificationCenter>) {
        let (store, partners) = SeedFile::from_yaml(SEED)
            .unwrap()
            .build(chrono::Utc::now())
            .unwrap();
        let notifications = Arc::new(NotificationCenter::new());
        let market = MarketService::new(MarketConfig::default(), store, partners)
            .with_notifier(notifications.clone());
        (
            app(AppState::new(Arc::new(market), notifications.clone())),
            notifications,
        )
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn handler_smoke_get_index() {
        let (app, _) = test_app();
        let resp = app.oneshot(get("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("FoodShare Dashboard"));
    }

    #[tokio::test]
    async fn listings_filter_by_distance_with_sentinels() {
        let (app, _) = test_app();
        let resp = app
            .oneshot(get("/listings?max_distance=1&category=any&donor_type=all&q="))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let page = json_body(resp).await;
        assert_eq!(page["total_items"], 1);
        assert_eq!(page["items"][0]["id"], "A");
        assert_eq!(page["items"][0]["state"]["status"], "available");
    }

    #[tokio::test]
    async fn listings_reject_unknown_category() {
        let (app, _) = test_app();
        let resp = app.oneshot(get("/listings?category=candy")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let (app, _) = test_app();
        let resp = app.oneshot(get("/listings?lat=40.7")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn claim_once_then_conflict() {
        let (app, notifications) = test_app();
        let first = app
            .clone()
            .oneshot(post_json("/listings/A/claim", serde_json::json!({ "user_id": "seeker" })))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let claimed = json_body(first).await;
        assert_eq!(claimed["state"]["status"], "claimed");
        assert_eq!(claimed["state"]["claimed_by"], "seeker");

        let second = app
            .clone()
            .oneshot(post_json("/listings/A/claim", serde_json::json!({ "user_id": "other" })))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);

        let missing = app
            .oneshot(post_json("/listings/Z/claim", serde_json::json!({ "user_id": "other" })))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        assert_eq!(notifications.unread_count().await, 1);
    }

    #[tokio::test]
    async fn malformed_requests_answer_with_json_errors() {
        let (app, _) = test_app();
        let garbled = axum::http::Request::builder()
            .method("POST")
            .uri("/listings/A/claim")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"user_id\": "))
            .unwrap();
        let resp = app.clone().oneshot(garbled).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(resp).await["error"].is_string());

        let untyped = axum::http::Request::builder()
            .method("POST")
            .uri("/listings")
            .body(Body::from("{}"))
            .unwrap();
        let resp = app.clone().oneshot(untyped).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(resp).await["error"].is_string());

        let resp = app.clone().oneshot(get("/listings?page=first")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(resp).await["error"].is_string());

        let resp = app
            .oneshot(get("/listings/A"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn submit_rejects_listing_without_items() {
        let (app, _) = test_app();
        let draft = serde_json::json!({
            "title": "Nothing",
            "description": "",
            "donor": { "id": "d9", "name": "Someone", "donor_type": "individual", "rating": 4.0 },
            "items": [],
            "location": { "address": "1 Nowhere", "coordinates": { "lat": 40.7, "lng": -74.0 } },
            "available_from": "2030-01-01T10:00:00Z",
            "available_until": "2030-01-01T12:00:00Z",
            "contact_method": "phone"
        });
        let resp = app.oneshot(post_json("/listings", draft)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn submit_creates_listing() {
        let (app, _) = test_app();
        let draft = serde_json::json!({
            "title": "Leftover curry",
            "description": "Vegetable curry with rice",
            "donor": { "id": "d4", "name": "Community Care Kitchen", "donor_type": "organization", "rating": 5.0 },
            "items": [{ "name": "Curry", "category": "Prepared Meals", "quantity": 15, "unit": "portions", "condition": "excellent" }],
            "location": { "address": "789 Community Ave", "coordinates": { "lat": 40.7831, "lng": -73.9712 } },
            "available_from": "2030-01-01T10:00:00Z",
            "available_until": "2030-01-01T12:00:00Z",
            "contact_method": "phone",
            "tags": ["community"]
        });
        let resp = app
            .clone()
            .oneshot(post_json("/listings", draft))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = json_body(resp).await;
        let id = created["id"].as_str().unwrap().to_string();

        let detail = app.oneshot(get(&format!("/listings/{id}"))).await.unwrap();
        assert_eq!(detail.status(), StatusCode::OK);
        assert_eq!(json_body(detail).await["title"], "Leftover curry");
    }

    #[tokio::test]
    async fn handler_smoke_htmx_partials() {
        let (app, _) = test_app();
        let table = app.clone().oneshot(get("/listings/table")).await.unwrap();
        assert_eq!(table.status(), StatusCode::OK);
        assert_eq!(table.headers()["hx-trigger"], "listingsTableLoaded");

        let facets = app.oneshot(get("/listings/facets")).await.unwrap();
        assert_eq!(facets.status(), StatusCode::OK);
        let facets = json_body(facets).await;
        assert_eq!(facets[0]["category"], "Fresh Produce");
        assert_eq!(facets[1]["category"], "Baked Goods");
        assert_eq!(facets[1]["count"], 1);
    }

    #[tokio::test]
    async fn stats_and_notifications_json() {
        let (app, _) = test_app();
        let stats = app.clone().oneshot(get("/stats")).await.unwrap();
        assert_eq!(stats.status(), StatusCode::OK);
        assert_eq!(
            stats.headers()[header::CONTENT_TYPE].to_str().unwrap(),
            "application/json"
        );
        let stats = json_body(stats).await;
        assert_eq!(stats["total_listings"], 3);
        assert_eq!(stats["claimed"], 1);

        app.clone()
            .oneshot(post_json("/listings/B/claim", serde_json::json!({ "user_id": "u" })))
            .await
            .unwrap();
        let inbox = json_body(app.clone().oneshot(get("/notifications")).await.unwrap()).await;
        assert_eq!(inbox["unread"], 1);

        let read_all = app
            .clone()
            .oneshot(post_json("/notifications/read-all", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(json_body(read_all).await["updated"], 1);

        let missing = app
            .oneshot(post_json("/notifications/nope/read", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
