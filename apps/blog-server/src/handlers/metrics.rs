//! Prometheus scrape endpoint.

use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, web};

use crate::middleware::error::{AppError, AppResult};
use crate::observability::{HostStats, metrics};
use crate::state::AppState;

/// GET /prometheus-metrics
pub async fn prometheus_metrics(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let stats = web::block(HostStats::collect)
        .await
        .map_err(|e| AppError::Internal(format!("collecting host stats: {}", e)))?;

    let body = metrics::render(&stats, state.metrics.total_requests());
    Ok(HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(body))
}
