use actix_governor::{
    governor::middleware::NoOpMiddleware, Governor, GovernorConfigBuilder, PeerIpKeyExtractor,
};
use actix_web::web;

use crate::api::{device, recognition, AppState};
use crate::config::Config;

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, state: AppState) {
    // Per-route limiter keyed by peer IP.
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let ingest_limiter = build_limiter(config.rate_ingest_per_min);

    cfg.app_data(web::Data::new(state)).service(
        web::scope("")
            .service(
                web::resource("/recognitions")
                    .wrap(ingest_limiter)
                    .route(web::post().to(recognition::ingest_recognition)),
            )
            .service(
                web::resource("/devices/{device_id}/heartbeat")
                    .route(web::post().to(device::heartbeat)),
            ),
    );
}
