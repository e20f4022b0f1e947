use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower::util::ServiceExt;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod middleware;
mod routes;
mod seed;
mod services;

use services::store::RecordStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "helpdesk_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env();

    // Initialize database and record store
    let db = db::Database::connect(&config.database_url).await?;
    db.run_migrations().await?;
    let store = RecordStore::new(db.pool);

    if config.seed_demo_users {
        seed::seed_demo_users(&store).await?;
    }

    // Build application state
    let state = AppState {
        store,
        config: config.clone(),
    };

    let app = app(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    // Each portal is gated on its role; the session middleware wraps all of
    // them.
    let user_portal = Router::new()
        .nest("/tickets", routes::tickets::router())
        .route_layer(axum_middleware::from_fn(middleware::auth::require_user));

    let engineer_portal = Router::new()
        .nest("/engineer", routes::engineer::router())
        .route_layer(axum_middleware::from_fn(middleware::auth::require_engineer));

    let admin_portal = Router::new()
        .nest("/admin", routes::admin::router())
        .route_layer(axum_middleware::from_fn(middleware::auth::require_admin));

    let protected_routes = Router::new()
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        .merge(user_portal)
        .merge(engineer_portal)
        .merge(admin_portal)
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    // Build API router
    let api_router = Router::new()
        .nest("/auth", routes::auth::router())
        .merge(protected_routes);

    // Build main router with SPA fallback for the portal client
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_router)
        .fallback(serve_spa)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_check() -> &'static str {
    "OK"
}

async fn serve_spa(req: Request<Body>) -> Response {
    let path = req.uri().path();

    // Try to serve static file first
    let static_path = format!("static{path}");
    if std::path::Path::new(&static_path).exists() {
        let serve_dir = ServeDir::new("static");
        let res = serve_dir.oneshot(req).await.unwrap();
        return res.into_response();
    }

    // For SPA routes, serve index.html
    match tokio::fs::read("static/index.html").await {
        Ok(contents) => Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "text/html")
            .body(Body::from(contents))
            .unwrap(),
        Err(_) => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("Not found"))
            .unwrap(),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
    pub config: config::Config,
}
