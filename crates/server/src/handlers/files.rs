//! Upload, info, and download handlers.
//!
//! Thin translations between HTTP and the lifecycle manager; all record
//! semantics live in [`crate::lifecycle`].

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use ember_core::{FileName, FileRecord, LIFESPAN_UNLIMITED};
use serde::Serialize;

/// Record view returned by upload and info.
#[derive(Debug, Serialize)]
pub struct FileRecordResponse {
    pub name: String,
    pub original_filename: String,
    pub uploaded_at: i64,
    pub lifespan_secs: i64,
    pub remaining_downloads: i64,
    pub size: u64,
}

impl From<FileRecord> for FileRecordResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            name: record.name.to_string(),
            original_filename: record.original_filename,
            uploaded_at: record.uploaded_at,
            lifespan_secs: record.lifespan_secs,
            remaining_downloads: record.remaining_downloads,
            size: record.size,
        }
    }
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("invalid multipart body: {e}"))
}

fn parse_i64(field: &str, value: &str) -> ApiResult<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("field {field} is not an integer: {value}")))
}

/// POST /upload: multipart form with `name`, `file`, and optional `life`
/// (seconds, default unlimited) and `quota` (downloads, default 1).
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<FileRecordResponse>> {
    let mut name: Option<String> = None;
    let mut file: Option<(String, Bytes)> = None;
    let mut lifespan_secs = LIFESPAN_UNLIMITED;
    let mut quota = 1;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => name = Some(field.text().await.map_err(bad_multipart)?),
            "life" => lifespan_secs = parse_i64("life", &field.text().await.map_err(bad_multipart)?)?,
            "quota" => quota = parse_i64("quota", &field.text().await.map_err(bad_multipart)?)?,
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(bad_multipart)?;
                file = Some((filename, data));
            }
            // Unknown fields are ignored, not rejected.
            _ => {}
        }
    }

    let name = name.ok_or_else(|| ApiError::BadRequest("missing field: name".to_string()))?;
    let (original_filename, data) =
        file.ok_or_else(|| ApiError::BadRequest("missing field: file".to_string()))?;

    let name = FileName::new(name).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let original_filename = if original_filename.is_empty() {
        name.to_string()
    } else {
        original_filename
    };

    let record = state
        .lifecycle
        .create(name, original_filename, lifespan_secs, quota, data)
        .await?;
    Ok(Json(record.into()))
}

/// GET /info/{name}: record metadata without consuming quota.
pub async fn get_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<FileRecordResponse>> {
    let name = lookup_name(&name)?;
    let record = state.lifecycle.fetch(&name).await?;
    Ok(Json(record.into()))
}

/// GET /download/{name}: consume one download and stream the blob as an
/// attachment under its original filename.
pub async fn download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Response> {
    let name = lookup_name(&name)?;
    let (record, stream) = state.lifecycle.consume(&name).await?;

    let headers = [
        (CONTENT_TYPE, "application/octet-stream".to_string()),
        (CONTENT_LENGTH, record.size.to_string()),
        (
            CONTENT_DISPOSITION,
            attachment_disposition(&record.original_filename),
        ),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}

/// Parse a path segment as a file name for a read path.
///
/// Download and info report a malformed name exactly like a missing one:
/// such a record cannot exist, and the read surface never distinguishes
/// "never existed" from "expired".
fn lookup_name(name: &str) -> ApiResult<FileName> {
    FileName::new(name).map_err(|_| ApiError::NotFound("expired or quota exceeded".to_string()))
}

/// Build a Content-Disposition attachment header value.
///
/// The display name is client-supplied; quotes, backslashes and control
/// characters are stripped so it cannot break out of the quoted string.
fn attachment_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_strips_header_breakers() {
        assert_eq!(
            attachment_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
        assert_eq!(
            attachment_disposition("a\"b\\c\r\n.txt"),
            "attachment; filename=\"abc.txt\""
        );
    }

    #[test]
    fn lookup_name_hides_bad_names() {
        match lookup_name("../../etc/passwd") {
            Err(ApiError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
