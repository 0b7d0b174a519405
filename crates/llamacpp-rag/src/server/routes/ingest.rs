//! Document ingestion endpoints

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::IngestResult;

/// POST /api/ingest - Ingest the configured data directory
pub async fn ingest_folder(State(state): State<AppState>) -> Result<Json<IngestResult>> {
    let folder = &state.config().ingestion.data_dir;
    let result = state.ingestor().ingest_local_folder(folder).await?;
    Ok(Json(result))
}

/// POST /api/ingest/upload - Upload and ingest files
pub async fn ingest_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResult>> {
    let mut result = IngestResult::default();
    let mut files = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::bad_request(format!("Failed to read multipart field: {}", e)))?
    {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::bad_request(format!("Failed to read file {}: {}", filename, e)))?;

        files += 1;
        result.merge(state.ingestor().ingest_upload(&filename, &data).await?);
    }

    if files == 0 {
        return Err(Error::bad_request("No file provided"));
    }
    Ok(Json(result))
}
