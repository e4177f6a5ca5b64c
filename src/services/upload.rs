use bytes::Bytes;

use crate::error::AppError;
use crate::models::Dataset;
use crate::services::csv::{parse_csv, utils::strip_extension};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Rejects anything that is not a `.csv` file within the size ceiling.
pub fn validate_upload(file_name: &str, size: usize, max_file_size: usize) -> Result<(), AppError> {
    if !file_name.to_lowercase().ends_with(".csv") {
        return Err(AppError::UploadRejected(format!(
            "{} is not a .csv file",
            file_name
        )));
    }
    if size > max_file_size {
        return Err(AppError::UploadRejected(format!(
            "{} is {} bytes, the limit is {} bytes",
            file_name, size, max_file_size
        )));
    }
    Ok(())
}

/// UTF-8 text of an upload, without a leading byte-order mark.
pub fn decode_text(data: &[u8]) -> Result<&str, AppError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    std::str::from_utf8(data).map_err(|e| AppError::Unreadable(e.to_string()))
}

/// Checks, decodes and parses one uploaded file off the async workers.
pub async fn ingest(file_name: String, data: Bytes, max_file_size: usize) -> Result<Dataset, AppError> {
    validate_upload(&file_name, data.len(), max_file_size)?;

    tracing::info!("Ingesting {} ({}KB)", file_name, data.len() / 1024);
    tokio::task::spawn_blocking(move || -> Result<Dataset, AppError> {
        let text = decode_text(&data)?;
        Ok(parse_csv(text, strip_extension(&file_name)))
    })
    .await
    .map_err(|e| AppError::Internal(format!("parse task failed: {}", e)))?
}
