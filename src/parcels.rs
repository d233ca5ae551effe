//! Parcel queries.
//!
//! Every spatial predicate is evaluated by PostGIS; this module only builds
//! the `SELECT`s, runs the separate count and pages the results.

use std::sync::Arc;

use chrono::NaiveDate;
use sea_orm::sea_query::{extension::postgres::PgExpr, Expr, LikeExpr, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};
use serde::Serialize;

use crate::db::entities::fazenda;
use crate::geometry;

/// Hard cap on rows per page.
pub const MAX_PAGE_SIZE: u64 = 100;
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// SRID of every stored geometry (WGS84 lon/lat).
pub const SRID: i32 = 4326;

const GEOM_ALIAS: &str = "geom_geojson";

/// Validated page window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// Paginated result envelope
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub limit: u64,
    pub offset: u64,
    pub total: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointQuery {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadiusQuery {
    pub center: PointQuery,
    pub radius_km: f64,
}

/// Attribute filter for the area search. Unset fields add no predicate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AreaFilter {
    pub min_area: Option<f64>,
    pub max_area: Option<f64>,
    /// Case-insensitive substring of `nom_tema`
    pub theme_name: Option<String>,
}

impl AreaFilter {
    pub fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(min) = self.min_area {
            condition = condition.add(fazenda::Column::NumArea.gte(min));
        }
        if let Some(max) = self.max_area {
            condition = condition.add(fazenda::Column::NumArea.lte(max));
        }
        if let Some(name) = self.theme_name.as_deref().filter(|n| !n.trim().is_empty()) {
            let pattern = format!("%{}%", escape_like(name.trim()));
            condition = condition.add(
                Expr::col((fazenda::Entity, fazenda::Column::NomTema))
                    .ilike(LikeExpr::new(pattern).escape('\\')),
            );
        }
        condition
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `$1`/`$2` bind longitude then latitude (x before y).
fn point_expr() -> String {
    format!("ST_SetSRID(ST_MakePoint($1, $2), {})", SRID)
}

/// `ST_Contains(geom, point)`
pub fn contains_point(point: PointQuery) -> SimpleExpr {
    Expr::cust_with_values(
        format!(r#"ST_Contains("fazendas"."geom", {})"#, point_expr()),
        [point.longitude, point.latitude],
    )
}

/// `ST_DWithin` over geography casts, so the distance is geodesic metres.
pub fn within_radius(query: RadiusQuery) -> SimpleExpr {
    Expr::cust_with_values(
        format!(
            r#"ST_DWithin("fazendas"."geom"::geography, ({})::geography, $3)"#,
            point_expr()
        ),
        [
            query.center.longitude,
            query.center.latitude,
            query.radius_km * 1000.0,
        ],
    )
}

fn geojson_expr() -> SimpleExpr {
    Expr::cust(r#"ST_AsGeoJSON("fazendas"."geom")"#)
}

/// Row shape returned by parcel selects: entity columns plus GeoJSON text.
#[derive(Debug, FromQueryResult)]
pub struct ParcelRecord {
    pub id: i32,
    pub cod_tema: Option<String>,
    pub nom_tema: Option<String>,
    pub cod_imovel: Option<String>,
    pub mod_fiscal: Option<f64>,
    pub num_area: Option<f64>,
    pub ind_status: Option<String>,
    pub ind_tipo: Option<String>,
    pub des_condic: Option<String>,
    pub municipio: Option<String>,
    pub cod_estado: Option<String>,
    pub dat_criaca: Option<NaiveDate>,
    pub dat_atuali: Option<NaiveDate>,
    pub geom_geojson: Option<String>,
}

/// Parcel as served by the API.
#[derive(Debug, Clone, Serialize)]
pub struct Parcel {
    pub id: i32,
    pub cod_tema: Option<String>,
    pub nom_tema: Option<String>,
    pub cod_imovel: Option<String>,
    pub mod_fiscal: Option<f64>,
    pub num_area: Option<f64>,
    pub ind_status: Option<String>,
    pub ind_tipo: Option<String>,
    pub des_condic: Option<String>,
    pub municipio: Option<String>,
    pub cod_estado: Option<String>,
    pub dat_criaca: Option<NaiveDate>,
    pub dat_atuali: Option<NaiveDate>,
    pub geom: Option<geojson::Geometry>,
}

impl From<ParcelRecord> for Parcel {
    fn from(record: ParcelRecord) -> Self {
        let geom = record.geom_geojson.as_deref().and_then(geometry::from_stored);
        Self {
            id: record.id,
            cod_tema: record.cod_tema,
            nom_tema: record.nom_tema,
            cod_imovel: record.cod_imovel,
            mod_fiscal: record.mod_fiscal,
            num_area: record.num_area,
            ind_status: record.ind_status,
            ind_tipo: record.ind_tipo,
            des_condic: record.des_condic,
            municipio: record.municipio,
            cod_estado: record.cod_estado,
            dat_criaca: record.dat_criaca,
            dat_atuali: record.dat_atuali,
            geom,
        }
    }
}

/// Read-only parcel queries over the shared pool
#[derive(Clone)]
pub struct ParcelService {
    db: Arc<DatabaseConnection>,
}

impl ParcelService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: i32) -> Result<Option<Parcel>, DbErr> {
        let record = fazenda::Entity::find_by_id(id)
            .column_as(geojson_expr(), GEOM_ALIAS)
            .into_model::<ParcelRecord>()
            .one(self.db.as_ref())
            .await?;

        match &record {
            Some(_) => tracing::debug!(id, "Parcel found"),
            None => tracing::debug!(id, "Parcel not found"),
        }
        Ok(record.map(Parcel::from))
    }

    pub async fn search_point(
        &self,
        point: PointQuery,
        page: Pagination,
    ) -> Result<Page<Parcel>, DbErr> {
        let select = fazenda::Entity::find().filter(contains_point(point));
        let result = self.paginate(select, page).await?;
        tracing::debug!(
            latitude = point.latitude,
            longitude = point.longitude,
            total = result.total,
            "Point search finished"
        );
        Ok(result)
    }

    pub async fn search_radius(
        &self,
        query: RadiusQuery,
        page: Pagination,
    ) -> Result<Page<Parcel>, DbErr> {
        let select = fazenda::Entity::find().filter(within_radius(query));
        let result = self.paginate(select, page).await?;
        tracing::debug!(
            latitude = query.center.latitude,
            longitude = query.center.longitude,
            radius_km = query.radius_km,
            total = result.total,
            "Radius search finished"
        );
        Ok(result)
    }

    pub async fn search_area(
        &self,
        filter: &AreaFilter,
        page: Pagination,
    ) -> Result<Page<Parcel>, DbErr> {
        let select = fazenda::Entity::find().filter(filter.condition());
        let result = self.paginate(select, page).await?;
        tracing::debug!(
            area_min = ?filter.min_area,
            area_max = ?filter.max_area,
            nom_tema = ?filter.theme_name,
            total = result.total,
            "Area search finished"
        );
        Ok(result)
    }

    /// Count the unordered predicate, then fetch one id-ordered page.
    async fn paginate(
        &self,
        select: Select<fazenda::Entity>,
        page: Pagination,
    ) -> Result<Page<Parcel>, DbErr> {
        // Callers outside the HTTP extractor get the same 1..=100 window.
        let limit = page.limit.clamp(1, MAX_PAGE_SIZE);
        let total = select.clone().count(self.db.as_ref()).await?;

        let items = select
            .column_as(geojson_expr(), GEOM_ALIAS)
            .order_by_asc(fazenda::Column::Id)
            .limit(limit)
            .offset(page.offset)
            .into_model::<ParcelRecord>()
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Parcel::from)
            .collect();

        Ok(Page {
            items,
            limit,
            offset: page.offset,
            total,
        })
    }
}
