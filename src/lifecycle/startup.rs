//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize each process's subsystems in dependency order
//! - Bind listeners and hand servers to the supervisor
//! - Register cleanup (backend clients, store connections)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and nothing is left running
//! - Listeners bind last, so traffic arrives only once dependencies exist
//! - Configuration is already loaded and validated by the caller

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tonic::transport::Server;

use crate::client::{AuthClient, BackendConnection, ConnectError, ContactClient};
use crate::config::{
    AuthServiceConfig, ContactServiceConfig, GatewayConfig, StoreConfig, StoreKind,
};
use crate::http::{serve, with_common_layers, GatewayBackends, GatewayServer};
use crate::lifecycle::supervisor::{LifecycleError, Supervisor};
use crate::proxy::Forwarder;
use crate::security::TokenKeys;
use crate::services::auth::{self, AuthService, MemoryUserStore, MongoUserStore, UserRpc, UserStore};
use crate::services::contact::{
    self, verifier, ContactRpc, ContactService, ContactStore, EmailSender, MailError,
    MemoryContactStore, MongoContactStore, SmtpMailer, VerifyError,
};
use crate::services::{connect_mongo, serve_grpc, StoreError};

/// Body limit for the services' own REST surfaces.
const SERVICE_BODY_LIMIT: usize = 64 * 1024;
const SERVICE_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {what} listener on {address}: {source}")]
    Bind {
        what: &'static str,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("mailer misconfigured: {0}")]
    Mail(#[from] MailError),

    #[error("verifier misconfigured: {0}")]
    Verify(#[from] VerifyError),
}

/// A started process: its bound addresses and the supervisor owning its tasks.
pub struct RunningService {
    pub http_addr: SocketAddr,
    pub grpc_addr: Option<SocketAddr>,
    supervisor: Supervisor,
}

impl RunningService {
    /// Serve until `signal` resolves or a server fails, then shut down.
    pub async fn run_until<S>(self, signal: S) -> Result<(), LifecycleError>
    where
        S: std::future::Future<Output = ()>,
    {
        self.supervisor.run_until(signal).await
    }
}

async fn bind(what: &'static str, address: String) -> Result<TcpListener, StartupError> {
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            what,
            address: address.clone(),
            source,
        })?;
    Ok(listener)
}

fn local_addr(what: &'static str, listener: &TcpListener) -> Result<SocketAddr, StartupError> {
    listener.local_addr().map_err(|source| StartupError::Bind {
        what,
        address: "<bound>".to_string(),
        source,
    })
}

/// Connect backend clients and start the gateway's HTTP server.
pub async fn start_gateway(config: &GatewayConfig) -> Result<RunningService, StartupError> {
    let auth_conn = Arc::new(BackendConnection::connect("auth", &config.backends.auth_grpc).await?);
    let contact_conn =
        Arc::new(BackendConnection::connect("contact", &config.backends.contact_grpc).await?);

    let backends = GatewayBackends {
        auth: AuthClient::new(
            auth_conn.clone(),
            Duration::from_secs(config.timeouts.login_secs),
        ),
        contact: ContactClient::new(
            contact_conn.clone(),
            Duration::from_secs(config.timeouts.contact_submit_secs),
        ),
        forwarder: Forwarder::new(
            &config.backends.auth_http_base,
            Duration::from_secs(config.timeouts.register_secs),
        ),
    };
    let server = GatewayServer::new(config, backends);

    let listener = bind("http", config.listener.bind_address()).await?;
    let http_addr = local_addr("http", &listener)?;

    let mut supervisor = Supervisor::new(config.timeouts.shutdown_grace());
    let shutdown = supervisor.shutdown().subscribe();
    supervisor.spawn("gateway-http", server.run(listener, shutdown));
    supervisor.on_shutdown("auth-client", async move {
        auth_conn.close();
    });
    supervisor.on_shutdown("contact-client", async move {
        contact_conn.close();
    });

    tracing::info!(address = %http_addr, "Gateway started");
    Ok(RunningService {
        http_addr,
        grpc_addr: None,
        supervisor,
    })
}

async fn open_user_store(config: &StoreConfig) -> Result<Arc<dyn UserStore>, StartupError> {
    match (config.kind, config.mongodb_uri.as_deref()) {
        (StoreKind::Mongo, Some(uri)) => {
            let (client, db) = connect_mongo(uri, &config.database).await?;
            Ok(Arc::new(MongoUserStore::new(client, &db).await?))
        }
        (StoreKind::Mongo, None) => Err(StoreError::Backend("mongodb uri not set".into()).into()),
        (StoreKind::Memory, _) => {
            tracing::warn!("Using in-memory user store; data is lost on restart");
            Ok(Arc::new(MemoryUserStore::new()))
        }
    }
}

async fn open_contact_store(config: &StoreConfig) -> Result<Arc<dyn ContactStore>, StartupError> {
    match (config.kind, config.mongodb_uri.as_deref()) {
        (StoreKind::Mongo, Some(uri)) => {
            let (client, db) = connect_mongo(uri, &config.database).await?;
            Ok(Arc::new(MongoContactStore::new(client, &db)))
        }
        (StoreKind::Mongo, None) => Err(StoreError::Backend("mongodb uri not set".into()).into()),
        (StoreKind::Memory, _) => {
            tracing::warn!("Using in-memory contact store; data is lost on restart");
            Ok(Arc::new(MemoryContactStore::new()))
        }
    }
}

/// Start the auth service's gRPC and REST servers.
pub async fn start_auth_service(config: &AuthServiceConfig) -> Result<RunningService, StartupError> {
    let store = open_user_store(&config.store).await?;
    let tokens = TokenKeys::new(
        &config.jwt.secret,
        Duration::from_secs(config.jwt.token_ttl_secs),
    );
    let service = Arc::new(AuthService::new(store.clone(), tokens));

    let grpc_listener = bind("grpc", config.grpc.bind_address()).await?;
    let http_listener = bind("http", config.listener.bind_address()).await?;
    let grpc_addr = local_addr("grpc", &grpc_listener)?;
    let http_addr = local_addr("http", &http_listener)?;

    let mut supervisor = Supervisor::new(Duration::from_secs(config.shutdown_grace_secs));

    let grpc = Server::builder().add_service(UserRpc::new(service.clone()).into_server());
    let rx = supervisor.shutdown().subscribe();
    supervisor.spawn("auth-grpc", serve_grpc("auth-grpc", grpc_listener, grpc, rx));

    let router = with_common_layers(
        auth::http::router(service, SERVICE_BODY_LIMIT),
        SERVICE_REQUEST_TIMEOUT,
    );
    let rx = supervisor.shutdown().subscribe();
    supervisor.spawn("auth-http", serve("auth-http", http_listener, router, rx));

    supervisor.on_shutdown("user-store", async move { store.shutdown().await });

    tracing::info!(http = %http_addr, grpc = %grpc_addr, "Auth service started");
    Ok(RunningService {
        http_addr,
        grpc_addr: Some(grpc_addr),
        supervisor,
    })
}

/// Start the contact service's gRPC and REST servers.
pub async fn start_contact_service(
    config: &ContactServiceConfig,
) -> Result<RunningService, StartupError> {
    let store = open_contact_store(&config.store).await?;
    let verifier = verifier::from_config(&config.turnstile)?;
    let mailer: Option<Arc<dyn EmailSender>> = if config.smtp.is_enabled() {
        Some(Arc::new(SmtpMailer::from_config(&config.smtp)?))
    } else {
        None
    };
    let service = Arc::new(ContactService::new(store.clone(), verifier, mailer));

    let grpc_listener = bind("grpc", config.grpc.bind_address()).await?;
    let http_listener = bind("http", config.listener.bind_address()).await?;
    let grpc_addr = local_addr("grpc", &grpc_listener)?;
    let http_addr = local_addr("http", &http_listener)?;

    let mut supervisor = Supervisor::new(Duration::from_secs(config.shutdown_grace_secs));

    let grpc = Server::builder().add_service(ContactRpc::new(service.clone()).into_server());
    let rx = supervisor.shutdown().subscribe();
    supervisor.spawn("contact-grpc", serve_grpc("contact-grpc", grpc_listener, grpc, rx));

    let router = with_common_layers(
        contact::http::router(service, SERVICE_BODY_LIMIT),
        SERVICE_REQUEST_TIMEOUT,
    );
    let rx = supervisor.shutdown().subscribe();
    supervisor.spawn("contact-http", serve("contact-http", http_listener, router, rx));

    supervisor.on_shutdown("contact-store", async move { store.shutdown().await });

    tracing::info!(http = %http_addr, grpc = %grpc_addr, "Contact service started");
    Ok(RunningService {
        http_addr,
        grpc_addr: Some(grpc_addr),
        supervisor,
    })
}
