//! Request bodies and their range checks.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};
use crate::parcels::{AreaFilter, PointQuery, RadiusQuery, MAX_PAGE_SIZE};

const LATITUDE: RangeInclusive<f64> = -90.0..=90.0;
const LONGITUDE: RangeInclusive<f64> = -180.0..=180.0;
const MAX_RADIUS_KM: f64 = 500.0;
const AREA: RangeInclusive<f64> = 0.0..=1_000_000.0;

/// Input checks run by the extractors before a handler sees the value.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn check_range(field: &str, value: f64, range: &RangeInclusive<f64>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ServerError::Validation(format!(
            "{} must be between {} and {}",
            field,
            range.start(),
            range.end()
        )))
    }
}

/// Body of `/busca-ponto`
#[derive(Debug, Clone, Deserialize)]
pub struct PointSearchRequest {
    pub latitude: f64,
    pub longitude: f64,
}

impl Validate for PointSearchRequest {
    fn validate(&self) -> Result<()> {
        check_range("latitude", self.latitude, &LATITUDE)?;
        check_range("longitude", self.longitude, &LONGITUDE)
    }
}

impl From<&PointSearchRequest> for PointQuery {
    fn from(req: &PointSearchRequest) -> Self {
        PointQuery {
            latitude: req.latitude,
            longitude: req.longitude,
        }
    }
}

/// Body of `/busca-raio`
#[derive(Debug, Clone, Deserialize)]
pub struct RadiusSearchRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub raio_km: f64,
}

impl Validate for RadiusSearchRequest {
    fn validate(&self) -> Result<()> {
        check_range("latitude", self.latitude, &LATITUDE)?;
        check_range("longitude", self.longitude, &LONGITUDE)?;
        if self.raio_km > 0.0 && self.raio_km <= MAX_RADIUS_KM {
            Ok(())
        } else {
            Err(ServerError::Validation(format!(
                "raio_km must be greater than 0 and at most {}",
                MAX_RADIUS_KM
            )))
        }
    }
}

impl From<&RadiusSearchRequest> for RadiusQuery {
    fn from(req: &RadiusSearchRequest) -> Self {
        RadiusQuery {
            center: PointQuery {
                latitude: req.latitude,
                longitude: req.longitude,
            },
            radius_km: req.raio_km,
        }
    }
}

/// Body of `/busca-area`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AreaSearchRequest {
    pub area_min: Option<f64>,
    pub area_max: Option<f64>,
    pub nom_tema: Option<String>,
}

impl Validate for AreaSearchRequest {
    fn validate(&self) -> Result<()> {
        if let Some(min) = self.area_min {
            check_range("area_min", min, &AREA)?;
        }
        if let Some(max) = self.area_max {
            check_range("area_max", max, &AREA)?;
        }
        if let (Some(min), Some(max)) = (self.area_min, self.area_max) {
            if min > max {
                return Err(ServerError::Validation(
                    "area_min must not exceed area_max".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl From<AreaSearchRequest> for AreaFilter {
    fn from(req: AreaSearchRequest) -> Self {
        AreaFilter {
            min_area: req.area_min,
            max_area: req.area_max,
            theme_name: req.nom_tema,
        }
    }
}

/// Raw `?limit=&offset=` query string, checked into a
/// [`crate::parcels::Pagination`] by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Validate for PageParams {
    fn validate(&self) -> Result<()> {
        if let Some(limit) = self.limit {
            if limit < 1 || limit > MAX_PAGE_SIZE as i64 {
                return Err(ServerError::Validation(format!(
                    "limit must be between 1 and {}",
                    MAX_PAGE_SIZE
                )));
            }
        }
        if let Some(offset) = self.offset {
            if offset < 0 {
                return Err(ServerError::Validation(
                    "offset must be greater than or equal to 0".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}
