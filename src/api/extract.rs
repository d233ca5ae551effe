//! Extractors that turn axum rejections and out-of-range input into
//! [`ServerError`]s, so every 4xx shares the error envelope.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use super::types::{PageParams, Validate};
use crate::error::ServerError;
use crate::parcels::{Pagination, DEFAULT_PAGE_SIZE};

/// JSON body that has passed [`Validate`].
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ServerError::BadRequest {
                status: rejection.status(),
                message: rejection.body_text(),
            })?;
        value.validate()?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<PageParams>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ServerError::BadRequest {
                status: rejection.status(),
                message: rejection.body_text(),
            })?;
        params.validate()?;

        // validate() has ruled out negatives and zero
        Ok(Pagination {
            limit: params.limit.map_or(DEFAULT_PAGE_SIZE, |l| l as u64),
            offset: params.offset.map_or(0, |o| o as u64),
        })
    }
}
