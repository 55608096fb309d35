pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;

use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use services::SupabaseClient;

/// Shared application state. Built once at startup; no module-level
/// singletons and no mutable state between requests.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub supabase: SupabaseClient,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    ///
    /// Binds the listener eagerly so tests can pass port 0 and read back
    /// the assigned port before the server starts.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let supabase = SupabaseClient::new(config.supabase.clone());

        let state = AppState {
            config: config.clone(),
            supabase,
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route(
                "/api/checkUsernameAvailability",
                post(handlers::username::check_username_availability),
            )
            .route(
                "/api/calculateTotalCodeTime",
                post(handlers::code_time::calculate_total_code_time),
            )
            .route(
                "/api/sendDataToSupabase",
                post(handlers::ingest::send_data_to_supabase),
            )
            .layer(CatchPanicLayer::custom(handlers::panic_responder))
            .layer(from_fn(middleware::request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get(middleware::REQUEST_ID_HEADER)
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                }),
            )
            .with_state(state);

        let listener =
            TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        tracing::info!("Listening on port {}", self.port);
        axum::serve(self.listener, self.router).await?;

        Ok(())
    }
}
