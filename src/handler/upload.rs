//! File upload handler
//!
//! Accepts a `multipart/form-data` body and stores the configured file field
//! under the upload directory, named after the client's file name.

use std::convert::Infallible;
use std::ffi::OsStr;
use std::path::Path;

use hyper::body::Bytes;
use hyper::StatusCode;
use tokio::io::AsyncWriteExt;

use super::employees::HandlerResult;
use crate::config::UploadConfig;
use crate::error::ApiError;
use crate::http::build_text_response;
use crate::logger;

/// `POST /upload`
pub async fn handle_upload(
    content_type: Option<&str>,
    body: Bytes,
    config: &UploadConfig,
) -> HandlerResult {
    let content_type = content_type
        .ok_or_else(|| ApiError::bad_request("request Content-Type isn't multipart/form-data"))?;
    let boundary =
        multer::parse_boundary(content_type).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let stream = futures_util::stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.name() != Some(config.field_name.as_str()) {
            continue;
        }

        let file_name = stored_file_name(field.file_name())?;
        let size = persist_field(&mut field, Path::new(&config.dir), &file_name).await?;

        logger::log_upload(&file_name, size);
        return Ok(build_text_response(
            StatusCode::OK,
            format!("Successfully uploaded file\nName: {file_name}\nSize: {size} bytes"),
        ));
    }

    Err(ApiError::bad_request(format!(
        "no multipart field named '{}'",
        config.field_name
    )))
}

/// Final path component of the client-supplied name
fn stored_file_name(client_name: Option<&str>) -> Result<String, ApiError> {
    client_name
        .and_then(|name| Path::new(name).file_name())
        .and_then(OsStr::to_str)
        .map(ToString::to_string)
        .ok_or_else(|| ApiError::bad_request("missing file name"))
}

/// Stream the field into `dir/file_name`, returning the stored size
async fn persist_field(
    field: &mut multer::Field<'_>,
    dir: &Path,
    file_name: &str,
) -> Result<u64, ApiError> {
    let io_error = |e: std::io::Error| ApiError::internal(e.to_string());

    tokio::fs::create_dir_all(dir).await.map_err(io_error)?;
    let mut file = tokio::fs::File::create(dir.join(file_name))
        .await
        .map_err(io_error)?;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        file.write_all(&chunk).await.map_err(io_error)?;
    }
    file.flush().await.map_err(io_error)?;

    Ok(file.metadata().await.map_err(io_error)?.len())
}
