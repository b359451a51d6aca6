// Availability handlers
// Read all flags, upsert one flag. Each request gets its own storage session.

use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::info;

use crate::{
    db::SharedStore,
    error::ApiError,
    models::{
        availability::to_availability_map, UpdateAvailabilityRequest, UpdateAvailabilityResponse,
    },
};

/// Get every stored flag as `{ "<dateKey>": <bool>, ... }`
/// GET /get-availability
pub async fn get_availability(State(store): State<SharedStore>) -> Result<impl IntoResponse, ApiError> {
    info!("Fetching all availability records");

    let session = store.open().await?;
    let result = session.fetch_all().await;
    session.close().await;
    let records = result?;

    info!("Retrieved {} availability records", records.len());
    Ok((StatusCode::OK, Json(to_availability_map(records))))
}

/// Insert or overwrite the flag for one date
/// POST /update-availability
///
/// The body is taken as raw bytes so that malformed JSON and a missing
/// `Content-Type` both surface as our own 400 bodies instead of axum rejections.
pub async fn update_availability(
    State(store): State<SharedStore>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let update = UpdateAvailabilityRequest::parse(&body)
        .map_err(ApiError::InvalidJson)?
        .validate()
        .map_err(ApiError::Validation)?;

    info!("Setting availability for {} to {}", update.date_key, update.is_available);

    let session = store.open().await?;
    let result = session.upsert(&update).await;
    session.close().await;
    let record = result?;

    info!("Stored availability for {}", record.date_key);
    Ok((StatusCode::OK, Json(UpdateAvailabilityResponse::from(record))))
}
