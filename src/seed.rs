//! Bulk parcel loader.
//!
//! Reads a GeoJSON FeatureCollection and inserts one `fazendas` row per
//! polygonal feature. The load and its `seed_control` ledger row commit in
//! one transaction, so a name that is already in the ledger is never loaded
//! twice.

use std::path::Path;

use chrono::NaiveDate;
use geojson::{Feature, GeoJson, Geometry, Value};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, Statement, TransactionTrait,
};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::db::entities::seed_control;
use crate::parcels::SRID;

pub const DEFAULT_SEED_NAME: &str = "seed_fazendas_default";

const DATE_FORMATS: [&str; 2] = ["%d/%m/%Y", "%Y-%m-%d"];

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Seed file not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a FeatureCollection")]
    NotFeatureCollection,

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The ledger already held this name; nothing was written.
    Skipped,
    Loaded { inserted: usize, skipped: usize },
}

/// Column values for one parcel row, geometry already as MultiPolygon GeoJSON.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelRow {
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
    pub geometry: Geometry,
}

/// Polygons become single-member MultiPolygons; other kinds are rejected.
pub fn to_multipolygon(geometry: Option<&Geometry>) -> Option<Geometry> {
    match &geometry?.value {
        Value::Polygon(polygon) => Some(Geometry::new(Value::MultiPolygon(vec![polygon.clone()]))),
        value @ Value::MultiPolygon(_) => Some(Geometry::new(value.clone())),
        _ => None,
    }
}

/// Accepts `DD/MM/YYYY` and `YYYY-MM-DD`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

fn text(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(feature: &Feature, key: &str) -> Option<f64> {
    match feature.property(key)? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn date(feature: &Feature, key: &str) -> Option<NaiveDate> {
    match feature.property(key)? {
        JsonValue::Null => None,
        JsonValue::String(s) => {
            let parsed = parse_date(s);
            if parsed.is_none() {
                tracing::warn!(field = key, value = %s, "Ignoring invalid date");
            }
            parsed
        }
        other => {
            tracing::warn!(field = key, value = %other, "Ignoring invalid date");
            None
        }
    }
}

impl ParcelRow {
    /// Map a feature's properties by column name. `None` when the geometry
    /// is missing or not polygonal.
    pub fn from_feature(feature: &Feature) -> Option<Self> {
        let geometry = to_multipolygon(feature.geometry.as_ref())?;
        Some(Self {
            cod_tema: text(feature, "cod_tema"),
            nom_tema: text(feature, "nom_tema"),
            cod_imovel: text(feature, "cod_imovel"),
            mod_fiscal: number(feature, "mod_fiscal"),
            num_area: number(feature, "num_area"),
            ind_status: text(feature, "ind_status"),
            ind_tipo: text(feature, "ind_tipo"),
            des_condic: text(feature, "des_condic"),
            municipio: text(feature, "municipio"),
            cod_estado: text(feature, "cod_estado"),
            dat_criaca: date(feature, "dat_criaca"),
            dat_atuali: date(feature, "dat_atuali"),
            geometry,
        })
    }

    fn insert_statement(&self, backend: sea_orm::DatabaseBackend) -> Result<Statement, SeedError> {
        let geometry = serde_json::to_string(&self.geometry)?;
        Ok(Statement::from_sql_and_values(
            backend,
            format!(
                r#"INSERT INTO fazendas (
                    cod_tema, nom_tema, cod_imovel, mod_fiscal, num_area, ind_status,
                    ind_tipo, des_condic, municipio, cod_estado, dat_criaca, dat_atuali, geom
                ) VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    ST_SetSRID(ST_GeomFromGeoJSON($13), {})
                )"#,
                SRID
            ),
            [
                self.cod_tema.clone().into(),
                self.nom_tema.clone().into(),
                self.cod_imovel.clone().into(),
                self.mod_fiscal.into(),
                self.num_area.into(),
                self.ind_status.clone().into(),
                self.ind_tipo.clone().into(),
                self.des_condic.clone().into(),
                self.municipio.clone().into(),
                self.cod_estado.clone().into(),
                self.dat_criaca.into(),
                self.dat_atuali.into(),
                geometry.into(),
            ],
        ))
    }
}

/// Parse features into rows, returning the rows and the number skipped.
pub fn parse_features(features: &[Feature]) -> (Vec<ParcelRow>, usize) {
    let mut rows = Vec::with_capacity(features.len());
    let mut skipped = 0;
    for (index, feature) in features.iter().enumerate() {
        match ParcelRow::from_feature(feature) {
            Some(row) => rows.push(row),
            None => {
                skipped += 1;
                tracing::warn!(index, "Skipping feature without polygonal geometry");
            }
        }
    }
    (rows, skipped)
}

/// Read a GeoJSON FeatureCollection from disk.
pub fn load_features(path: &Path) -> Result<Vec<Feature>, SeedError> {
    if !path.exists() {
        return Err(SeedError::NotFound(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path)?;
    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        _ => Err(SeedError::NotFeatureCollection),
    }
}

/// Load `features` under `seed_name` unless the ledger already holds it.
pub async fn seed_features(
    db: &DatabaseConnection,
    features: &[Feature],
    seed_name: &str,
) -> Result<SeedOutcome, SeedError> {
    let txn = db.begin().await?;

    let existing = seed_control::Entity::find()
        .filter(seed_control::Column::Name.eq(seed_name))
        .one(&txn)
        .await?;
    if existing.is_some() {
        tracing::info!(seed_name, "Seed already executed, skipping");
        return Ok(SeedOutcome::Skipped);
    }

    tracing::info!(seed_name, features = features.len(), "Starting parcel seed");
    let (rows, skipped) = parse_features(features);

    let backend = txn.get_database_backend();
    for row in &rows {
        txn.execute(row.insert_statement(backend)?).await?;
    }

    seed_control::ActiveModel {
        name: Set(seed_name.to_string()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(seed_name, inserted = rows.len(), skipped, "Parcel seed finished");
    Ok(SeedOutcome::Loaded {
        inserted: rows.len(),
        skipped,
    })
}

/// Entry point of the `seed` subcommand.
pub async fn run(
    db: &DatabaseConnection,
    path: &Path,
    seed_name: &str,
) -> Result<SeedOutcome, SeedError> {
    let features = load_features(path)?;
    tracing::info!(path = %path.display(), total = features.len(), "Seed file loaded");
    seed_features(db, &features, seed_name).await
}
