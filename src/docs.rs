use utoipa::OpenApi;

use crate::ingest;
use crate::model;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::recognition::ingest_recognition,
        crate::api::device::heartbeat,
    ),
    components(schemas(
        ingest::RecognitionIngress,
        ingest::Outcome,
        model::RecognitionEvent,
        model::RecognitionStatus,
        model::AttendanceRecord,
        model::AttendanceStatus,
        model::EventType,
        model::RecordStatus,
        model::FaceBox,
    )),
    tags(
        (name = "Recognition", description = "Recognition event ingest"),
        (name = "Device", description = "Edge device liveness")
    )
)]
pub struct ApiDoc;
