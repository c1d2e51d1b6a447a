use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::api::AppState;

/// Device heartbeat; refreshes `last_seen_at`.
#[utoipa::path(
    post,
    path = "/api/v1/devices/{device_id}/heartbeat",
    params(
        ("device_id", Path, description = "Device ID")
    ),
    responses(
        (status = 200, description = "Heartbeat accepted", body = Object, example = json!({
            "message": "Heartbeat accepted"
        })),
        (status = 404, description = "Device not found", body = Object, example = json!({
            "message": "Device not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Device"
)]
pub async fn heartbeat(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> actix_web::Result<impl Responder> {
    let device_id = path.into_inner();
    let now = state.clock.now_utc();

    match state.devices.touch_last_seen(device_id, now).await {
        Ok(true) => Ok(HttpResponse::Ok().json(json!({ "message": "Heartbeat accepted" }))),
        Ok(false) => Ok(HttpResponse::NotFound().json(json!({ "message": "Device not found" }))),
        Err(e) => {
            error!(error = %e, %device_id, "heartbeat failed");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}
