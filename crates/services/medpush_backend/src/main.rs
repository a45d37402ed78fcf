// File: services/medpush_backend/src/main.rs
use axum::{routing::get, Router};
use medpush_common::{init_with_level, parse_level};
use medpush_config::load_config;
use medpush_db::DbClientFactory;
use medpush_notify::{routes as notify_routes, spawn_retention_sweep, NotifyState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

mod app_state;
mod service_factory;

use app_state::{prepare_database, AppState};
use service_factory::MedpushServiceFactory;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(load_config()?);
    init_with_level(parse_level(&config.logging.level));

    let db = DbClientFactory::new().from_app_config(&config).await?;
    prepare_database(&db).await?;

    let services = MedpushServiceFactory::new(&config);
    let state = AppState::new(config.clone(), db, &services);

    let sweep = spawn_retention_sweep(
        state.notify.registry.clone(),
        NotifyState::stale_after(&config),
        state.retention_interval(),
    );

    let api_router = Router::new()
        .route("/", get(|| async { "Welcome to the medpush API!" }))
        .merge(notify_routes(state.notify.clone()));

    #[allow(unused_mut)] // only mutated with the openapi feature
    let mut app = Router::new()
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http());

    // Conditionally add Swagger UI and JSON endpoint if openapi feature enabled
    #[cfg(feature = "openapi")]
    {
        use medpush_notify::openapi::NotifyApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        #[derive(OpenApi)]
        #[openapi(
            info(
                title = "medpush API",
                version = "0.1.0",
                description = "Push tokens, notification feed and broadcasts"
            ),
            servers( (url = "/api", description = "Main API Prefix")),
        )]
        struct ApiDoc;

        let mut openapi_doc = ApiDoc::openapi();
        openapi_doc.merge(NotifyApiDoc::openapi());
        info!("Adding Swagger UI at /api/docs");

        let swagger_ui = SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc);
        app = app.merge(swagger_ui);
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweep.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
