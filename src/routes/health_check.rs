use actix_web::{web, HttpResponse};
use sqlx::SqlitePool;

/// GET /health_check
///
/// 200 when the database answers, 503 otherwise.
pub async fn health_check(pool: web::Data<SqlitePool>) -> HttpResponse {
    tracing::debug!("Health check endpoint called");

    match sqlx::query("SELECT 1").execute(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })),
        Err(e) => {
            tracing::error!(error = %e, "Health check database ping failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({ "status": "unavailable" }))
        }
    }
}
