pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod types;

use std::sync::Arc;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;

pub use handlers::{
    get_parcel, health, method_not_allowed, not_found, search_area, search_point,
    search_radius, AppState,
};

/// Parcel endpoints, nested under `/fazendas`
pub fn parcel_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/busca-ponto", post(search_point))
        .route("/busca-raio", post(search_radius))
        .route("/busca-area", post(search_area))
        .route("/:id", get(get_parcel))
}

/// Build the full application router
pub fn router(state: Arc<AppState>, cors_enabled: bool) -> Router {
    let router = Router::new()
        .nest("/fazendas", parcel_router())
        .route("/health", get(health))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
        .layer(from_fn(middleware::error_envelope))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        );

    if cors_enabled {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parcels::tests::{count_row, parcel_row};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use sea_orm::{
        DatabaseBackend, DatabaseConnection, DbErr, MockDatabase, MockExecResult, Value,
    };
    use serde_json::{json, Value as JsonValue};
    use std::collections::BTreeMap;
    use tower::ServiceExt;

    fn app(db: DatabaseConnection) -> Router {
        router(Arc::new(AppState::new(Arc::new(db))), true)
    }

    /// A mock with nothing queued: any query that reaches it fails.
    fn untouched_db() -> DatabaseConnection {
        MockDatabase::new(DatabaseBackend::Postgres).into_connection()
    }

    fn empty_rows() -> Vec<BTreeMap<&'static str, Value>> {
        Vec::new()
    }

    fn post_json(uri: &str, body: JsonValue) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, JsonValue) {
        let resp = app.oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).expect("valid JSON response");
        (status, json)
    }

    #[tokio::test]
    async fn test_get_missing_parcel_is_404() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([empty_rows()])
            .into_connection();

        let (status, json) = send(app(db), get("/fazendas/999999")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["type"], "http_error");
        assert_eq!(json["error"]["method"], "GET");
        assert_eq!(json["error"]["path"], "/fazendas/999999");
    }

    #[tokio::test]
    async fn test_get_parcel() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![parcel_row(3, 250.5)]])
            .into_connection();

        let (status, json) = send(app(db), get("/fazendas/3")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], 3);
        assert_eq!(json["num_area"], 250.5);
        assert_eq!(json["dat_criaca"], "2020-05-17");
        assert_eq!(json["dat_atuali"], JsonValue::Null);
        assert_eq!(json["geom"]["type"], "MultiPolygon");
        assert!(json["geom"]["coordinates"].is_array());
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_rejected() {
        let (status, json) = send(app(untouched_db()), get("/fazendas/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["type"], "http_error");
    }

    #[tokio::test]
    async fn test_point_search_without_match() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(0)]])
            .append_query_results([empty_rows()])
            .into_connection();

        let (status, json) = send(
            app(db),
            post_json(
                "/fazendas/busca-ponto",
                json!({"latitude": -23.5505, "longitude": -46.6333}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"items": [], "limit": 10, "offset": 0, "total": 0}));
    }

    #[tokio::test]
    async fn test_radius_search_pages() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(3)]])
            .append_query_results([vec![parcel_row(1, 10.0), parcel_row(2, 20.0)]])
            .into_connection();

        let (status, json) = send(
            app(db),
            post_json(
                "/fazendas/busca-raio?limit=2&offset=0",
                json!({"latitude": -23.5505, "longitude": -46.6333, "raio_km": 50}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 3);
        assert_eq!(json["limit"], 2);
        assert_eq!(json["items"].as_array().unwrap().len(), 2);
        assert_eq!(json["items"][0]["id"], 1);
    }

    #[tokio::test]
    async fn test_area_search_with_theme_name() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(1)]])
            .append_query_results([vec![parcel_row(9, 75.0)]])
            .into_connection();

        let (status, json) = send(
            app(db),
            post_json(
                "/fazendas/busca-area?offset=0",
                json!({"area_min": 50, "area_max": 100, "nom_tema": "imovel"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 1);
        assert_eq!(json["items"][0]["num_area"], 75.0);
    }

    #[tokio::test]
    async fn test_limit_bounds_rejected_before_query() {
        for limit in [0, 101] {
            let (status, json) = send(
                app(untouched_db()),
                post_json(
                    &format!("/fazendas/busca-ponto?limit={}", limit),
                    json!({"latitude": 0, "longitude": 0}),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(json["error"]["type"], "http_error");
            assert!(json["error"]["message"].as_str().unwrap().contains("limit"));
        }
    }

    #[tokio::test]
    async fn test_out_of_range_body_rejected() {
        let (status, _) = send(
            app(untouched_db()),
            post_json(
                "/fazendas/busca-raio",
                json!({"latitude": -23.5, "longitude": -46.6, "raio_km": 501}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(
            app(untouched_db()),
            post_json("/fazendas/busca-ponto", json!({"latitude": 91, "longitude": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_malformed_json_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/fazendas/busca-ponto")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"latitude\": "))
            .unwrap();
        let (status, json) = send(app(untouched_db()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["type"], "http_error");
    }

    #[tokio::test]
    async fn test_database_error_is_503() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("connection reset".to_string())])
            .into_connection();

        let (status, json) = send(
            app(db),
            post_json("/fazendas/busca-area", json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"]["type"], "database_error");
        assert_eq!(json["error"]["message"], "Database error");
        assert_eq!(json["error"]["method"], "POST");
        assert!(!json.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_health() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let (status, json) = send(app(db), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"status": "ok", "database": "connected"}));

        let (status, json) = send(app(untouched_db()), get("/health")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"]["type"], "http_error");
    }

    #[tokio::test]
    async fn test_wrong_method_uses_error_envelope() {
        let (status, json) = send(app(untouched_db()), get("/fazendas/busca-ponto")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(json["error"]["type"], "http_error");
        assert_eq!(json["error"]["method"], "GET");
        assert_eq!(json["error"]["path"], "/fazendas/busca-ponto");

        let request = Request::builder()
            .method("DELETE")
            .uri("/fazendas/3")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(app(untouched_db()), request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(json["error"]["method"], "DELETE");
        assert_eq!(json["error"]["message"], "Method Not Allowed");
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let request = Request::builder()
            .method("POST")
            .uri("/fazendas/busca-ponto")
            .header(header::ORIGIN, "https://maps.example.org")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"latitude": 91, "longitude": 0}).to_string()))
            .unwrap();
        let resp = app(untouched_db()).oneshot(request).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );

        let preflight = Request::builder()
            .method("OPTIONS")
            .uri("/fazendas/busca-raio")
            .header(header::ORIGIN, "https://maps.example.org")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();
        let resp = app(untouched_db()).oneshot(preflight).await.unwrap();
        assert!(resp.status().is_success());
        let headers = resp.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "*");
    }

    #[tokio::test]
    async fn test_cors_disabled() {
        let app = router(Arc::new(AppState::new(Arc::new(untouched_db()))), false);
        let request = Request::builder()
            .method("GET")
            .uri("/nope")
            .header(header::ORIGIN, "https://maps.example.org")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(request).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(resp
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, json) = send(app(untouched_db()), get("/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["path"], "/nope");
    }
}
