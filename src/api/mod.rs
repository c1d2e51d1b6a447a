pub mod device;
pub mod recognition;

use std::sync::Arc;

use crate::ingest::IngestionService;
use crate::repo::DeviceRepo;
use crate::zone::Clock;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<IngestionService>,
    pub devices: Arc<dyn DeviceRepo>,
    pub clock: Arc<dyn Clock>,
}
