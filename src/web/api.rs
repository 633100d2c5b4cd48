use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::context::ServiceContext;
use crate::error::ServiceError;
use crate::ml::ForecastResult;

pub struct ApiServer {
    ctx: Arc<ServiceContext>,
}

#[derive(Debug, Deserialize)]
struct ForecastRequest {
    series: Option<Vec<f64>>,
    dates: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ClassifyRequest {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Serialize)]
struct ClassifyResponse {
    category: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiServer {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/forecast", post(forecast))
            .route("/classify", post(classify))
            .route("/health", get(health))
            .fallback(not_found)
            .layer(CorsLayer::permissive())
            .with_state(self.ctx.clone())
    }

    pub async fn start(&self, port: u16) -> Result<()> {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
        info!("API server listening on http://0.0.0.0:{}", port);

        axum::serve(listener, app).await?;
        Ok(())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

async fn forecast(
    State(ctx): State<Arc<ServiceContext>>,
    Json(request): Json<ForecastRequest>,
) -> Result<Json<ForecastResult>, ServiceError> {
    let series = request
        .series
        .ok_or_else(|| ServiceError::Validation("'series' is required".to_string()))?;
    let result = ctx.forecast(series, request.dates)?;
    Ok(Json(result))
}

async fn classify(
    State(ctx): State<Arc<ServiceContext>>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, ServiceError> {
    let category = ctx.classify(&request.description)?;
    Ok(Json(ClassifyResponse { category }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn not_found() -> ServiceError {
    ServiceError::NotFound("no such route".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_expected_status_codes() {
        let cases = [
            (
                ServiceError::Validation("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::NotFound("gone".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::Unavailable("later".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ServiceError::Prediction("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
