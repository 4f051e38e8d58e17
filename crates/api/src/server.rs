// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server implementation module
//!
//! This module provides the main server struct and implementation for the API server,
//! including server lifecycle management, the request pipeline, and coordinated graceful
//! shutdown using `CancellationToken`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{BoxError, Router, error_handling::HandleErrorLayer, middleware};
use hyper::Request;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::{ServiceBuilder, timeout::TimeoutLayer};
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, warn};

use crate::{
    config::ServerConfig,
    error::{ServerError, ServerResult},
    health::DependencyChecker,
    middleware::{
        REQUEST_ID_HEADER,
        access_log::log_access,
        context::tag_request,
        cors::cors_layer,
        error_responder::{handle_panic, respond_to_errors},
        guards::limit_declared_size,
        rate_limit::limit_site,
        security_headers::{hardening_headers, security_headers},
        timing::time_request,
    },
    openapi::OPENAPI_JSON_PATH,
    routes::create_routes,
    state::ServerState,
};

// Server constants
const DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS: u64 = 30;

/// Configuration for server shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Maximum time to drain in-flight requests before closing connections
    pub graceful_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            graceful_timeout: Duration::from_secs(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS),
        }
    }
}

/// Main server struct
#[derive(Debug)]
pub struct Server {
    /// Server configuration
    config: ServerConfig,
    /// Application router
    router: Router,
    /// Server state
    state: ServerState,
    /// Cancellation token for coordinated shutdown
    cancellation_token: CancellationToken,
    /// Configuration for coordinated shutdown
    graceful_shutdown_config: ShutdownConfig,
}

impl Server {
    /// Create new server instance probing the configured dependencies
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the configuration is invalid.
    pub fn new(config: ServerConfig, shutdown_config: ShutdownConfig) -> ServerResult<Self> {
        let registry = ServerState::registry_from_config(&config);
        Self::with_dependencies(config, shutdown_config, Arc::new(registry))
    }

    /// Create server with custom dependency probes for dependency injection
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the configuration is invalid.
    pub fn with_dependencies(
        config: ServerConfig,
        graceful_shutdown_config: ShutdownConfig,
        dependencies: Arc<dyn DependencyChecker>,
    ) -> ServerResult<Self> {
        if config.api.supported_versions.is_empty() {
            return Err(ServerError::Config {
                message: "api.supported_versions must not be empty".to_string(),
            });
        }

        let cancellation_token = CancellationToken::new();
        let state = ServerState::new(
            config.clone(),
            dependencies,
            cancellation_token.child_token(),
        );
        let router = Self::create_router(&state);

        Ok(Self {
            config,
            router,
            state,
            cancellation_token,
            graceful_shutdown_config,
        })
    }

    /// Create application router with the request pipeline
    ///
    /// Stages run outermost first: compression, browser hardening headers,
    /// correlation id, tracing span, timing, access log, API headers, size
    /// guard, site limiter, error responder, panic containment, CORS, and the
    /// request timeout.
    fn create_router(state: &ServerState) -> Router {
        let config = state.config();
        let timeout = config.timeout_seconds.value();
        let timeout_seconds = timeout.as_secs();

        let pipeline = ServiceBuilder::new()
            .layer(middleware::from_fn(tag_request))
            .layer(
                TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
                    if let Some(request_id) = req.headers().get(REQUEST_ID_HEADER) {
                        info_span!("http_request", ?request_id)
                    } else {
                        error!("failed to extract id from request");
                        info_span!("http_request", request_id = "unknown")
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(state.clone(), time_request))
            .layer(middleware::from_fn_with_state(state.clone(), log_access))
            .layer(middleware::from_fn(security_headers))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                limit_declared_size,
            ))
            .layer(middleware::from_fn_with_state(state.clone(), limit_site))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                respond_to_errors,
            ))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(cors_layer(&config.cors, config.environment))
            .layer(HandleErrorLayer::new(move |_: BoxError| async move {
                ServerError::Timeout { timeout_seconds }
            }))
            .layer(TimeoutLayer::new(timeout));

        let mut router = create_routes(state).layer(pipeline);
        for (name, value) in hardening_headers(config.environment) {
            router = router.layer(SetResponseHeaderLayer::if_not_present(name, value));
        }

        router
            .layer(CompressionLayer::new())
            .with_state(state.clone())
    }

    async fn bind(&self) -> ServerResult<(TcpListener, SocketAddr)> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                address: addr,
                source,
            })?;

        let actual_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Startup { source })?;

        Ok((listener, actual_addr))
    }

    /// Run the server with coordinated graceful shutdown
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address,
    /// or `ServerError::Startup` if the server fails to start.
    pub async fn run(self) -> ServerResult<()> {
        let (listener, actual_addr) = self.bind().await?;

        info!(
            address = %actual_addr,
            environment = %self.config.environment,
            health = %format!("http://{actual_addr}/api/health"),
            "{} starting",
            self.config.app.name,
        );
        if !self.config.environment.is_production() {
            info!(
                docs = %format!("http://{actual_addr}/api-docs"),
                openapi = %format!("http://{actual_addr}{OPENAPI_JSON_PATH}"),
                "API documentation available"
            );
        }

        let cancellation_token = self.cancellation_token.clone();
        let shutdown_token = cancellation_token.clone();
        tokio::spawn(async move {
            info!("spawning the graceful shutdown task");
            Self::shutdown_signal_handler(shutdown_token).await;
        });

        let graceful_timeout = self.graceful_shutdown_config.graceful_timeout;
        let serve = axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            cancellation_token.cancelled().await;
            info!("draining in-flight requests");
        })
        .into_future();
        tokio::pin!(serve);

        let drain_token = self.cancellation_token.clone();
        let server_result = tokio::select! {
            result = &mut serve => result,
            () = async {
                drain_token.cancelled().await;
                tokio::time::sleep(graceful_timeout).await;
            } => {
                warn!(
                    timeout_secs = graceful_timeout.as_secs(),
                    "graceful shutdown timed out, closing remaining connections"
                );
                Ok(())
            }
        };

        match server_result {
            Ok(()) => {
                info!("server shut down gracefully");
                Ok(())
            }
            Err(e) => {
                error!(error = ?e, "Server error during shutdown");
                Err(ServerError::Shutdown { source: e })
            }
        }
    }

    /// Handle shutdown signals and trigger coordinated cancellation
    ///
    /// This function listens for SIGINT (Ctrl+C) and SIGTERM signals,
    /// and cancels the provided cancellation token when received.
    async fn shutdown_signal_handler(cancellation_token: CancellationToken) {
        let signal_received = async {
            #[cfg(unix)]
            #[allow(clippy::expect_used)]
            {
                use tokio::signal::unix::{SignalKind, signal};

                let mut sigterm =
                    signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
                let mut sigint =
                    signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

                tokio::select! {
                    _ = sigterm.recv() => "SIGTERM",
                    _ = sigint.recv() => "SIGINT",
                }
            }

            #[cfg(not(unix))]
            #[allow(clippy::expect_used)]
            {
                tokio::signal::ctrl_c()
                    .await
                    .expect("Failed to install CTRL+C signal handler");
                "CTRL+C"
            }
        };

        // Wait for either a signal or existing cancellation
        tokio::select! {
            signal_name = signal_received => {
                warn!(signal = signal_name, "shutdown signal received, closing server");
                cancellation_token.cancel();
            },
            () = cancellation_token.cancelled() => {
                warn!("Cancellation token already cancelled, shutdown signal handler exiting");
            }
        }
    }

    /// Returns a clone of the cancellation token for coordinated shutdown
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Initiates graceful shutdown by cancelling the server's cancellation token
    pub fn shutdown(&self) {
        info!("programmatic shutdown requested");
        self.cancellation_token.cancel();
    }

    /// Run server for testing, returns the bound address
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address.
    pub async fn run_for_testing(self) -> ServerResult<(SocketAddr, CancellationToken)> {
        let (listener, actual_addr) = self.bind().await?;

        let token = self.cancellation_token.child_token();
        let task = token.child_token();
        tokio::spawn(async move {
            let _ = axum::serve(
                listener,
                self.router
                    .into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { task.cancelled().await })
            .await;
        });

        Ok((actual_addr, token))
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get server state for testing
    pub fn state(&self) -> &ServerState {
        &self.state
    }
}
