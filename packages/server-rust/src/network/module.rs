//! Network module with deferred startup lifecycle.
//!
//! `new()` allocates shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{arm_handler, health_handler, liveness_handler, readiness_handler, AppState};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;
use crate::service::RequestPipeline;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Manages the HTTP server lifecycle.
///
/// Health probes are served at `/health`, `/health/live`, and
/// `/health/ready`. Every other path is an ARM request and goes through
/// the controller pipeline.
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
    pipeline: RequestPipeline,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, pipeline: RequestPipeline) -> Self {
        Self {
            config,
            listener: None,
            shutdown: Arc::new(ShutdownController::new()),
            pipeline,
        }
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::new(self.config.clone()),
            pipeline: self.pipeline.clone(),
            start_time: Instant::now(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .fallback(arm_handler)
            .layer(build_http_layers(&self.config))
            .with_state(state)
    }

    /// Binds the TCP listener and returns the bound port, which differs
    /// from the configured one when port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves, then drains in-flight
    /// requests for up to 30 seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called, if TLS material cannot
    /// be loaded, or if the server hits a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();

        self.shutdown.set_ready();

        if let Some(tls) = &self.config.tls {
            serve_tls(listener, router, tls, shutdown).await?;
        } else {
            info!("Serving plain HTTP connections");
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await?;
        }

        drain(&self.shutdown).await;
        Ok(())
    }
}

/// Serves TLS connections using `axum-server` with rustls on the pre-bound
/// listener.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls: &TlsConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!("Serving TLS connections on {}", addr);

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}

async fn drain(shutdown_ctrl: &ShutdownController) {
    shutdown_ctrl.trigger_shutdown();
    if shutdown_ctrl.wait_for_drain(DRAIN_TIMEOUT).await {
        info!("All in-flight requests drained");
    } else {
        warn!(
            in_flight = shutdown_ctrl.in_flight_count(),
            "Drain timeout expired with in-flight requests remaining"
        );
    }
}
