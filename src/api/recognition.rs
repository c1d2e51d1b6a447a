use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use tracing::error;

use crate::api::AppState;
use crate::error::IngestError;
use crate::ingest::{Outcome, RecognitionIngress};

/// Recognition event ingest endpoint for edge devices.
#[utoipa::path(
    post,
    path = "/api/v1/recognitions",
    request_body = RecognitionIngress,
    responses(
        (status = 201, description = "Attendance recorded", body = Outcome),
        (status = 200, description = "Event stored (duplicate or no valid match)", body = Outcome),
        (status = 422, description = "Rejected by attendance policy", body = Outcome),
        (status = 400, description = "Ingress failed validation"),
        (status = 500, description = "Internal server error"),
        (status = 504, description = "Ingest deadline elapsed")
    ),
    tag = "Recognition"
)]
pub async fn ingest_recognition(
    state: web::Data<AppState>,
    payload: web::Json<RecognitionIngress>,
) -> actix_web::Result<impl Responder> {
    let outcome = match state.ingestion.ingest(payload.into_inner()).await {
        Ok(outcome) => outcome,
        Err(IngestError::BadInput(reason)) => {
            return Ok(HttpResponse::BadRequest().json(json!({ "message": reason })));
        }
        Err(e) => {
            error!(error = %e, "recognition ingest failed");
            return Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })));
        }
    };

    let response = match &outcome {
        Outcome::Recorded { .. } => HttpResponse::Created().json(&outcome),
        Outcome::Duplicate { .. } | Outcome::Stored { .. } => HttpResponse::Ok().json(&outcome),
        Outcome::Rejected { .. } => HttpResponse::UnprocessableEntity().json(&outcome),
        Outcome::EvaluationError { .. } => HttpResponse::InternalServerError().json(&outcome),
        Outcome::Timeout => HttpResponse::GatewayTimeout().json(&outcome),
    };
    Ok(response)
}
