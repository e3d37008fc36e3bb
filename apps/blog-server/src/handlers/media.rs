use std::io::ErrorKind;

use actix_files::NamedFile;
use actix_web::http::header::{self, HeaderValue};
use actix_web::{HttpRequest, HttpResponse, web};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /media/{path}
pub async fn serve(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let key = path.into_inner();
    let file_path = state.media.path_of(&key)?;

    let file = NamedFile::open_async(&file_path).await.map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            AppError::NotFound(format!("media file {}", key))
        } else {
            AppError::Internal(format!("media storage: {}", e))
        }
    })?;

    let mut response = file.use_etag(true).use_last_modified(true).into_response(&req);
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400"),
    );
    Ok(response)
}
