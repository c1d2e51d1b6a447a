use std::sync::Arc;
use std::time::Duration;

use actix_web::web::Data;
use actix_web::{get, App, HttpServer, Responder};
use dotenvy::dotenv;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use faceclock::api::AppState;
use faceclock::config::Config;
use faceclock::db::init_db;
use faceclock::docs::ApiDoc;
use faceclock::evaluator::PolicyEvaluator;
use faceclock::fingerprint::{Fingerprinter, LocalSnapshotReader};
use faceclock::ingest::IngestionService;
use faceclock::repo::cache::CachedPolicyRepo;
use faceclock::repo::mysql::{
    MySqlDeviceRepo, MySqlEmployeeRepo, MySqlEventRepo, MySqlPolicyRepo, MySqlRecordRepo,
};
use faceclock::repo::{DeviceRepo, NoHolidays, PolicyRepo};
use faceclock::routes;
use faceclock::zone::{BusinessZone, SystemClock};

const POLICY_CACHE_TTL: Duration = Duration::from_secs(60);

#[get("/healthz")]
async fn healthz() -> impl Responder {
    "ok"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "faceclock.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    info!(
        zone = config.business_zone.name(),
        dedup_window_seconds = config.dedup_window_seconds,
        "faceclock starting"
    );

    let pool = init_db(&config.database_url).await;

    let employees = Arc::new(MySqlEmployeeRepo::new(pool.clone()));
    let devices: Arc<dyn DeviceRepo> = Arc::new(MySqlDeviceRepo::new(pool.clone()));
    let events = Arc::new(MySqlEventRepo::new(pool.clone()));
    let records = Arc::new(MySqlRecordRepo::new(pool.clone()));
    let policies: Arc<dyn PolicyRepo> = Arc::new(CachedPolicyRepo::new(
        Arc::new(MySqlPolicyRepo::new(pool.clone())),
        POLICY_CACHE_TTL,
    ));

    let zone = BusinessZone::new(config.business_zone);
    let clock = Arc::new(SystemClock);
    let evaluator = Arc::new(PolicyEvaluator::new(policies, Arc::new(NoHolidays), zone));
    let fingerprinter = Fingerprinter::new(
        config.dedup_window_seconds,
        Arc::new(LocalSnapshotReader),
    );

    let ingestion = Arc::new(IngestionService::new(
        employees,
        devices.clone(),
        events,
        records,
        evaluator,
        fingerprinter,
        clock.clone(),
        &config,
    ));

    let state = AppState { ingestion, devices, clock };

    let server_addr = config.server_addr.clone();
    let api_prefix = config.api_prefix.clone();
    let config_for_app = config.clone();

    HttpServer::new(move || {
        let config = config_for_app.clone();
        let state = state.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .service(healthz)
            .service(
                actix_web::web::scope(&api_prefix)
                    .configure(|cfg| routes::configure(cfg, &config, state)),
            )
    })
    .bind(server_addr)?
    .run()
    .await
}
