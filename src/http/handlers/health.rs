//! `GET /health`: store probe plus pool snapshot.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::db::{HealthReport, PoolStatus};
use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub success: bool,
    pub status: &'static str,
    pub database: HealthReport,
    pub pool: PoolStatus,
}

impl HealthBody {
    pub fn new(database: HealthReport, pool: PoolStatus) -> Self {
        let healthy = database.connected;
        Self {
            success: healthy,
            status: if healthy { "healthy" } else { "unhealthy" },
            database,
            pool,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        if self.success {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Response {
    let report = state.pool.health_check().await;
    let body = HealthBody::new(report, state.pool.status());
    if !body.success {
        tracing::warn!(detail = %body.database.detail, "Health probe failed");
    }
    (body.status_code(), Json(body)).into_response()
}
