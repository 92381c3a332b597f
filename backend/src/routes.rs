use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, web};
use log::{error, info};
use serde::Serialize;
use serde_json::json;
use shared::{AnalyzeRequest, BatchAnalyzeRequest, BatchAnalyzeResponse};

use crate::ingest::IngestError;
use crate::service::{AnalyzeError, ValidationError};
use crate::state::AppState;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Analyze(#[from] AnalyzeError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Analyze(AnalyzeError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Analyze(AnalyzeError::Ingest(IngestError::Fetch(_))) => StatusCode::BAD_GATEWAY,
            ApiError::Analyze(AnalyzeError::Ingest(_)) => StatusCode::BAD_REQUEST,
            ApiError::Analyze(AnalyzeError::Checker(_) | AnalyzeError::Blocking(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/analyze").route(web::post().to(analyze)))
        .service(web::resource("/batch-analyze").route(web::post().to(batch_analyze)));
}

/// JSON extractor settings: body size limit and `{"error": ...}` bodies for malformed input.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            let body = ErrorResponse {
                error: err.to_string(),
            };
            actix_web::error::InternalError::from_response(err, HttpResponse::BadRequest().json(body))
                .into()
        })
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn analyze(
    state: web::Data<AppState>,
    request: web::Json<AnalyzeRequest>,
) -> Result<HttpResponse, ApiError> {
    match state.service().analyze(request.into_inner()).await {
        Ok(response) => {
            info!(
                "Analyzed image: status={} time={}ms",
                response.status, response.inference_time_ms
            );
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            Err(e.into())
        }
    }
}

async fn batch_analyze(
    state: web::Data<AppState>,
    request: web::Json<BatchAnalyzeRequest>,
) -> Result<HttpResponse, ApiError> {
    let results = state
        .service()
        .analyze_batch(request.into_inner().images)
        .await?;
    Ok(HttpResponse::Ok().json(BatchAnalyzeResponse { results }))
}
