//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tonic::transport::Server;

use service_gateway::config::{GatewayConfig, RpcBackendConfig};
use service_gateway::lifecycle::{start_gateway, Shutdown};
use service_gateway::security::TokenKeys;
use service_gateway::services::auth::types::RegisterInput;
use service_gateway::services::auth::{AuthService, MemoryUserStore, UserProfile, UserRpc};
use service_gateway::services::contact::{
    BotVerifier, ContactRpc, ContactService, EmailSender, MailError, MemoryContactStore,
    VerifyError,
};
use service_gateway::services::serve_grpc;

#[allow(dead_code)]
pub const JWT_SECRET: &str = "integration-secret";

/// A request as seen by a programmable backend.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[allow(dead_code)]
impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<SeenRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    Some(SeenRequest {
        method,
        path,
        headers,
        body,
    })
}

/// Start a programmable HTTP backend on an ephemeral port.
///
/// Every request is recorded and answered with `f`'s status and JSON body.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Arc<Mutex<Vec<SeenRequest>>>)
where
    F: Fn(SeenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let log = seen.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                log.lock().unwrap().push(request.clone());
                let (status, body) = f(request).await;
                let status_text = match status {
                    200 => "200 OK",
                    201 => "201 Created",
                    400 => "400 Bad Request",
                    409 => "409 Conflict",
                    500 => "500 Internal Server Error",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, seen)
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// An address that accepts TCP connections and never writes a byte back.
#[allow(dead_code)]
pub async fn stalled_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// Verifier that records the remote IP and accepts only the token "pass".
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingVerifier {
    pub seen_ips: Mutex<Vec<String>>,
}

#[async_trait]
impl BotVerifier for RecordingVerifier {
    async fn verify(&self, token: &str, remote_ip: &str) -> Result<(), VerifyError> {
        self.seen_ips.lock().unwrap().push(remote_ip.to_string());
        if token == "pass" {
            Ok(())
        } else {
            Err(VerifyError::Rejected(vec!["invalid-input-response".into()]))
        }
    }
}

#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, subject: &str, body: &str) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}

/// In-process auth gRPC backend with one registered user.
#[allow(dead_code)]
pub struct AuthBackend {
    pub addr: SocketAddr,
    pub service: Arc<AuthService>,
    pub user: UserProfile,
    _shutdown: Shutdown,
}

#[allow(dead_code)]
pub const USER_EMAIL: &str = "ada@example.com";
#[allow(dead_code)]
pub const USER_PASSWORD: &str = "correct-horse";

#[allow(dead_code)]
pub async fn start_auth_backend() -> AuthBackend {
    let service = Arc::new(AuthService::new(
        Arc::new(MemoryUserStore::new()),
        TokenKeys::new(JWT_SECRET, Duration::from_secs(3600)),
    ));
    let user = service
        .register(RegisterInput {
            email: USER_EMAIL.into(),
            password: USER_PASSWORD.into(),
            fullname: "Ada Lovelace".into(),
        })
        .await
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let router = Server::builder().add_service(UserRpc::new(service.clone()).into_server());
    tokio::spawn(serve_grpc("test-auth", listener, router, shutdown.subscribe()));

    AuthBackend {
        addr,
        service,
        user,
        _shutdown: shutdown,
    }
}

/// In-process contact gRPC backend with recording collaborators.
#[allow(dead_code)]
pub struct ContactBackend {
    pub addr: SocketAddr,
    pub store: Arc<MemoryContactStore>,
    pub verifier: Arc<RecordingVerifier>,
    pub mailer: Arc<RecordingMailer>,
    _shutdown: Shutdown,
}

#[allow(dead_code)]
pub async fn start_contact_backend() -> ContactBackend {
    let store = Arc::new(MemoryContactStore::new());
    let verifier = Arc::new(RecordingVerifier::default());
    let mailer = Arc::new(RecordingMailer::default());
    let service = Arc::new(ContactService::new(
        store.clone(),
        verifier.clone(),
        Some(mailer.clone() as Arc<dyn EmailSender>),
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let router = Server::builder().add_service(ContactRpc::new(service).into_server());
    tokio::spawn(serve_grpc("test-contact", listener, router, shutdown.subscribe()));

    ContactBackend {
        addr,
        store,
        verifier,
        mailer,
        _shutdown: shutdown,
    }
}

/// Gateway config pointing at the given backends, listening on an ephemeral port.
#[allow(dead_code)]
pub fn gateway_config(auth: SocketAddr, contact: SocketAddr, auth_http: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.backends.auth_grpc = RpcBackendConfig::new(auth.to_string());
    config.backends.contact_grpc = RpcBackendConfig::new(contact.to_string());
    config.backends.auth_http_base = format!("http://{auth_http}");
    config.jwt.secret = JWT_SECRET.into();
    config.timeouts.login_secs = 2;
    config.timeouts.contact_submit_secs = 2;
    config.timeouts.register_secs = 2;
    config
}

/// A running gateway; dropping it shuts it down.
pub struct TestGateway {
    pub base: String,
    stop: Option<tokio::sync::oneshot::Sender<()>>,
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

#[allow(dead_code)]
pub async fn spawn_gateway(config: GatewayConfig) -> TestGateway {
    let running = start_gateway(&config).await.unwrap();
    let base = format!("http://{}", running.http_addr);
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = running
            .run_until(async move {
                let _ = rx.await;
            })
            .await;
    });
    TestGateway {
        base,
        stop: Some(tx),
    }
}

#[allow(dead_code)]
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(15))
        .build()
        .unwrap()
}
