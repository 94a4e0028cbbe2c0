// Regatta Telemetry API v0.1
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::Path;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod helpers;
mod models;
mod routes;
mod services;

use config::AppConfig;
use routes::AppState;

/// Regatta Telemetry API: OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Regatta Telemetry API",
        version = "0.1.0",
        description = "Time-indexed multi-boat track engine for sailing-race telemetry. \
            Merges per-boat logs into one time-aligned dataset, derives tack per sample, \
            resolves every boat's last known position at a scrubbed time, and overlays \
            the race course marks and boundary.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Dataset", description = "Loaded boats, time span and channels"),
        (name = "Course", description = "Race course marks and boundary"),
        (name = "Tracks", description = "Filtered tracks and positions at a point in time"),
        (name = "Stats", description = "Summary statistics per boat and channel"),
        (name = "Series", description = "Chart series: channels over time and X/Y pairs"),
        (name = "Playback", description = "Scrub-time playback controls"),
    ),
    paths(
        routes::health::health_check,
        routes::dataset::get_dataset,
        routes::dataset::get_channel_profile,
        routes::course::get_course,
        routes::tracks::post_tracks,
        routes::stats::post_stats,
        routes::series::post_series,
        routes::playback::get_playback,
        routes::playback::toggle_playback,
        routes::playback::tick_playback,
        routes::playback::seek_playback,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::dataset::BoatSummary,
            routes::dataset::DatasetResponse,
            routes::course::CourseResponse,
            routes::FilterRequest,
            routes::WarningBody,
            routes::tracks::TracksRequest,
            routes::tracks::TracksResponse,
            routes::tracks::SampleResponse,
            routes::tracks::CurrentPosition,
            routes::stats::StatsRequest,
            routes::stats::StatsResponse,
            routes::series::SeriesRequest,
            routes::series::XyRequest,
            routes::series::SeriesResponse,
            routes::series::BoatSeries,
            routes::series::XySeries,
            routes::playback::PlaybackResponse,
            routes::playback::SeekRequest,
            models::Position,
            models::Tack,
            models::ChannelValue,
            models::CourseMark,
            services::filter::TackFilter,
            services::filter::NumericRange,
            services::filter::FilterWarning,
            services::stats::ChannelSummary,
            services::stats::ChannelProfile,
            services::series::TimePoint,
            services::series::XyPoint,
            services::series::LinearFit,
            services::playback::PlaybackState,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regatta_telemetry_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Load the race course; the overlay is required
    let course = match services::course::load_course_file(Path::new(&config.course_xml)) {
        Ok(course) => course,
        Err(e) => {
            tracing::error!("Failed to load course from {}: {}", config.course_xml, e);
            std::process::exit(1);
        }
    };

    // Ingest every boat log; any bad file aborts the whole load
    let data_dir = Path::new(&config.data_dir);
    let dataset = match services::ingest::load_logs_from_dir(data_dir, &config.ingest_options()) {
        Ok(dataset) => dataset,
        Err(e) => {
            tracing::error!(
                "Failed to ingest logs from {}: {}",
                data_dir.display(),
                e
            );
            std::process::exit(1);
        }
    };
    if dataset.is_empty() {
        tracing::warn!("No telemetry found in {}", data_dir.display());
    } else {
        tracing::info!(
            "Loaded {} samples for {} boats across {} channels",
            dataset.sample_count(),
            dataset.tracks().len(),
            dataset.channels().len()
        );
    }

    let app_state = AppState::new(
        dataset,
        course,
        chrono::Duration::seconds(config.playback_step_secs),
    );

    // CORS: the dashboard reads with GET and drives filters/playback with POST
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/dataset", get(routes::dataset::get_dataset))
        .route(
            "/api/v1/dataset/channels/:name",
            get(routes::dataset::get_channel_profile),
        )
        .route("/api/v1/course", get(routes::course::get_course))
        .route("/api/v1/tracks", post(routes::tracks::post_tracks))
        .route("/api/v1/stats", post(routes::stats::post_stats))
        .route("/api/v1/series", post(routes::series::post_series))
        .route("/api/v1/playback", get(routes::playback::get_playback))
        .route(
            "/api/v1/playback/toggle",
            post(routes::playback::toggle_playback),
        )
        .route(
            "/api/v1/playback/tick",
            post(routes::playback::tick_playback),
        )
        .route(
            "/api/v1/playback/seek",
            post(routes::playback::seek_playback),
        )
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
