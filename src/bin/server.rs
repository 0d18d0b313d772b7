use axum::{routing::get, Router};
use mindease_server::{
    api,
    assistant::Assistant,
    config::AppConfig,
    migrator,
    openai::OpenAiClient,
    storage::{DbStorage, MemStorage, SharedStorage},
};
use sea_orm::Database;
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Load .env if present (dotenvy)
    dotenvy::dotenv().ok();

    mindease_server::telemetry::init_telemetry("mindease-server");

    let config = AppConfig::from_env().expect("Invalid configuration");

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    let storage: SharedStorage = match &config.database_url {
        Some(database_url) => {
            let db = Database::connect(database_url)
                .await
                .expect("Failed to connect to database");

            use sea_orm_migration::MigratorTrait;
            migrator::Migrator::up(&db, None)
                .await
                .expect("Failed to run migrations");

            let storage = DbStorage::new(db);
            storage
                .seed_demo_user()
                .await
                .expect("Failed to seed demo user");
            Arc::new(storage)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; records are kept in memory only");
            Arc::new(MemStorage::new())
        }
    };

    mindease_server::metrics::init_metrics(storage.as_ref()).await;

    let assistant = Arc::new(Assistant::new(Arc::new(OpenAiClient::new(&config.openai))));

    let app = app(&config, storage, assistant, prometheus_layer, metric_handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}

fn app(
    config: &AppConfig,
    storage: SharedStorage,
    assistant: Arc<Assistant>,
    prometheus_layer: axum_prometheus::PrometheusMetricLayer<'static>,
    metric_handle: metrics_exporter_prometheus::PrometheusHandle,
) -> Router {
    let cors_origin = config
        .cors_origin
        .parse::<axum::http::HeaderValue>()
        .expect("CORS_ORIGIN is not a valid header value");

    let session_key = api::middleware::session_key(config.session_secret.as_deref());

    api::router(storage, assistant, session_key)
        .layer(prometheus_layer)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());

                    // "METHOD /route", e.g. "POST /api/check-ins"
                    let span_name = if let Some(path) = matched_path {
                        format!("{} {}", request.method(), path)
                    } else {
                        format!("{} {}", request.method(), request.uri().path())
                    };

                    let user_ip = request
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|v| v.to_str().ok())
                        .or_else(|| {
                            request
                                .headers()
                                .get("x-real-ip")
                                .and_then(|v| v.to_str().ok())
                        })
                        .unwrap_or("unknown");

                    // Handlers fill in the empty fields.
                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        user_ip = user_ip,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        table = tracing::field::Empty,
                        action = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        business_event = tracing::field::Empty,
                        error = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(|_request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {
                    // Only completions are logged.
                })
                .on_response(|response: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                    span.record("status", tracing::field::display(response.status()));
                    span.record("latency", tracing::field::debug(latency));
                    tracing::info!("request completed");
                }),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(cors_origin)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PATCH,
                ])
                .allow_headers([axum::http::header::CONTENT_TYPE])
                .allow_credentials(true),
        )
        .route("/metrics", get(|| async move { metric_handle.render() }))
}
