//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the gateway's Axum Router with all handlers
//! - Wire up middleware (panic recovery, request ID, tracing, timeout, CORS)
//! - Attach bearer verification to protected routes
//! - Serve a router on a listener until shutdown is signalled

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::client::{AuthClient, ContactClient};
use crate::config::GatewayConfig;
use crate::http::error::ApiError;
use crate::http::handler::dispatch;
use crate::http::handlers::{healthz, ContactHandler, LoginHandler, MeHandler, RegisterHandler};
use crate::http::request::{
    propagate_request_id_layer, set_request_id_layer, stamp_deadline, X_REQUEST_ID,
};
use crate::proxy::Forwarder;
use crate::security::{cors::cors_layer, require_bearer, TokenKeys};

/// Downstream collaborators the gateway routes to.
#[derive(Clone)]
pub struct GatewayBackends {
    pub auth: AuthClient,
    pub contact: ContactClient,
    pub forwarder: Forwarder,
}

/// HTTP server for the API gateway.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    pub fn new(config: &GatewayConfig, backends: GatewayBackends) -> Self {
        Self {
            router: Self::build_router(config, backends),
        }
    }

    fn build_router(config: &GatewayConfig, backends: GatewayBackends) -> Router {
        let limit = config.security.max_body_size;
        let keys = Arc::new(TokenKeys::new(
            &config.jwt.secret,
            Duration::from_secs(config.jwt.token_ttl_secs),
        ));

        let login = Arc::new(LoginHandler::new(backends.auth, limit));
        let register = Arc::new(RegisterHandler::new(backends.forwarder));
        let contact = Arc::new(ContactHandler::new(backends.contact, limit));

        let routes = Router::new()
            .route("/healthz", get(healthz))
            .route("/auth/login", post(dispatch::<LoginHandler>).with_state(login))
            .route("/auth/register", post(dispatch::<RegisterHandler>).with_state(register))
            .route("/contact", post(dispatch::<ContactHandler>).with_state(contact))
            .route(
                "/auth/me",
                get(dispatch::<MeHandler>)
                    .with_state(Arc::new(MeHandler))
                    .layer(middleware::from_fn_with_state(keys, require_bearer)),
            )
            .layer(RequestBodyLimitLayer::new(limit))
            .layer(cors_layer(&config.cors));

        with_common_layers(routes, config.timeouts.request())
    }

    /// The fully layered router; used directly by tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        serve("gateway", listener, self.router, shutdown).await
    }
}

/// Middleware shared by every HTTP surface, outermost last:
/// panic recovery, request id, request logging, timeout, deadline stamp.
#[allow(deprecated)]
pub fn with_common_layers(router: Router, request_timeout: Duration) -> Router {
    router
        .layer(middleware::from_fn_with_state(request_timeout, stamp_deadline))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(propagate_request_id_layer())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(&X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(set_request_id_layer())
        .layer(CatchPanicLayer::custom(panic_response))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");
    ApiError::Internal("internal error".to_string()).into_response()
}

/// Serve `router` until the shutdown channel fires, then drain.
pub async fn serve(
    name: &'static str,
    listener: TcpListener,
    router: Router,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(server = name, address = %addr, "HTTP server starting");

    let app = router.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    tracing::info!(server = name, "HTTP server stopped");
    Ok(())
}
