use std::sync::Arc;

use axum::{
    extract::{rejection::PathRejection, Path, State},
    Json,
};
use sea_orm::DatabaseConnection;

use super::extract::ValidJson;
use super::types::{AreaSearchRequest, HealthResponse, PointSearchRequest, RadiusSearchRequest};
use crate::db;
use crate::error::{Result, ServerError};
use crate::parcels::{AreaFilter, Page, Pagination, Parcel, ParcelService};

/// Application state shared across handlers
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub parcels: ParcelService,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            parcels: ParcelService::new(db.clone()),
            db,
        }
    }
}

/// GET /fazendas/:id
pub async fn get_parcel(
    State(state): State<Arc<AppState>>,
    id: std::result::Result<Path<i32>, PathRejection>,
) -> Result<Json<Parcel>> {
    let Path(id) = id.map_err(|rejection| ServerError::BadRequest {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;

    match state.parcels.get(id).await? {
        Some(parcel) => {
            tracing::info!(id, "Parcel fetched");
            Ok(Json(parcel))
        }
        None => Err(ServerError::NotFound("Parcel not found".to_string())),
    }
}

/// POST /fazendas/busca-ponto
pub async fn search_point(
    State(state): State<Arc<AppState>>,
    page: Pagination,
    ValidJson(body): ValidJson<PointSearchRequest>,
) -> Result<Json<Page<Parcel>>> {
    let result = state.parcels.search_point((&body).into(), page).await?;

    tracing::info!(
        latitude = body.latitude,
        longitude = body.longitude,
        limit = page.limit,
        offset = page.offset,
        total = result.total,
        "Point search executed"
    );
    Ok(Json(result))
}

/// POST /fazendas/busca-raio
pub async fn search_radius(
    State(state): State<Arc<AppState>>,
    page: Pagination,
    ValidJson(body): ValidJson<RadiusSearchRequest>,
) -> Result<Json<Page<Parcel>>> {
    let result = state.parcels.search_radius((&body).into(), page).await?;

    tracing::info!(
        latitude = body.latitude,
        longitude = body.longitude,
        raio_km = body.raio_km,
        limit = page.limit,
        offset = page.offset,
        total = result.total,
        "Radius search executed"
    );
    Ok(Json(result))
}

/// POST /fazendas/busca-area
pub async fn search_area(
    State(state): State<Arc<AppState>>,
    page: Pagination,
    ValidJson(body): ValidJson<AreaSearchRequest>,
) -> Result<Json<Page<Parcel>>> {
    let filter = AreaFilter::from(body);
    let result = state.parcels.search_area(&filter, page).await?;

    tracing::info!(
        area_min = ?filter.min_area,
        area_max = ?filter.max_area,
        nom_tema = ?filter.theme_name,
        limit = page.limit,
        offset = page.offset,
        total = result.total,
        "Area search executed"
    );
    Ok(Json(result))
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>> {
    match db::ping(state.db.as_ref()).await {
        Ok(()) => Ok(Json(HealthResponse {
            status: "ok",
            database: "connected",
        })),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            Err(ServerError::Unavailable("Database unreachable".to_string()))
        }
    }
}

/// Unmatched routes
pub async fn not_found() -> ServerError {
    ServerError::NotFound("Not Found".to_string())
}

/// Known path, unsupported method
pub async fn method_not_allowed() -> ServerError {
    ServerError::MethodNotAllowed
}
