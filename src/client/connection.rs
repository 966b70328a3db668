//! Long-lived connection to one gRPC backend.
//!
//! # Responsibilities
//! - Own exactly one channel per backend, shared by every request
//! - Re-dial dropped connections with exponential backoff
//! - Track connectivity state for logs and metrics
//! - Bound every call by its deadline and translate failures
//!
//! # Design Decisions
//! - Dialing goes through a custom connector so backoff applies to reconnects too
//! - The channel is lazy by default; an unreachable backend is a call error, not a startup error
//! - `close` swaps the channel out; later calls fail as unavailable

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;

use crate::client::error::{CallError, ConnectError};
use crate::config::RpcBackendConfig;
use crate::observability::metrics;
use crate::resilience::{remaining, BackoffPolicy};

/// Connectivity state of a backend connection.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle = 0,
    Connecting = 1,
    Ready = 2,
    /// An established connection dropped; re-dialing.
    Degraded = 3,
    Closed = 4,
}

impl From<u8> for ConnectionState {
    fn from(val: u8) -> Self {
        match val {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Ready,
            3 => ConnectionState::Degraded,
            4 => ConnectionState::Closed,
            _ => ConnectionState::Idle,
        }
    }
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
            ConnectionState::Degraded => "degraded",
            ConnectionState::Closed => "closed",
        }
    }
}

/// State shared between the handle and its connector.
#[derive(Debug)]
struct Link {
    backend: String,
    policy: BackoffPolicy,
    state: AtomicU8,
    consecutive_failures: AtomicU32,
}

impl Link {
    fn state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, next: ConnectionState) {
        let prev = ConnectionState::from(self.state.swap(next as u8, Ordering::AcqRel));
        if prev != next {
            tracing::debug!(
                backend = %self.backend,
                from = prev.as_str(),
                to = next.as_str(),
                "Connection state changed"
            );
            metrics::record_connection_state(&self.backend, next);
        }
    }

    /// Dial the backend, sleeping first according to the failure streak.
    async fn dial(self: Arc<Self>, uri: Uri) -> io::Result<TokioIo<TcpStream>> {
        match self.state() {
            ConnectionState::Closed => {
                return Err(io::Error::new(io::ErrorKind::NotConnected, "connection closed"));
            }
            ConnectionState::Ready => self.transition(ConnectionState::Degraded),
            ConnectionState::Idle => self.transition(ConnectionState::Connecting),
            ConnectionState::Connecting | ConnectionState::Degraded => {}
        }

        let failures = self.consecutive_failures.load(Ordering::Acquire);
        let delay = self.policy.delay_for(failures);
        if !delay.is_zero() {
            tracing::debug!(backend = %self.backend, attempt = failures + 1, delay = ?delay, "Backing off before dial");
            tokio::time::sleep(delay).await;
        }

        let host = uri
            .host()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "missing host"))?;
        let port = uri.port_u16().unwrap_or(80);

        let attempt = tokio::time::timeout(
            self.policy.connect_timeout(failures),
            TcpStream::connect((host.as_str(), port)),
        )
        .await;

        match attempt {
            Ok(Ok(stream)) => {
                stream.set_nodelay(true)?;
                self.consecutive_failures.store(0, Ordering::Release);
                self.transition(ConnectionState::Ready);
                tracing::info!(backend = %self.backend, address = %uri, "Backend connected");
                Ok(TokioIo::new(stream))
            }
            Ok(Err(e)) => {
                self.record_failure(&e);
                Err(e)
            }
            Err(_) => {
                let e = io::Error::new(io::ErrorKind::TimedOut, "connect timed out");
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    fn record_failure(&self, error: &io::Error) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::warn!(backend = %self.backend, failures, error = %error, "Backend dial failed");
    }
}

/// A shared, reconnecting connection to one backend.
#[derive(Debug)]
pub struct BackendConnection {
    link: Arc<Link>,
    address: String,
    channel: ArcSwapOption<Channel>,
}

impl BackendConnection {
    /// Create the connection for `backend`.
    ///
    /// Fails only when the address cannot be dialed at all, or when
    /// `wait_for_ready` is set and the backend stays unreachable for the
    /// configured ready timeout.
    pub async fn connect(backend: &str, config: &RpcBackendConfig) -> Result<Self, ConnectError> {
        let address = normalize_address(&config.address);
        let endpoint = Endpoint::from_shared(address.clone()).map_err(|e| {
            ConnectError::InvalidAddress {
                backend: backend.to_string(),
                address: config.address.clone(),
                reason: e.to_string(),
            }
        })?;
        if endpoint.uri().host().map_or(true, str::is_empty) {
            return Err(ConnectError::InvalidAddress {
                backend: backend.to_string(),
                address: config.address.clone(),
                reason: "missing host".to_string(),
            });
        }

        let link = Arc::new(Link {
            backend: backend.to_string(),
            policy: config.connect.backoff(),
            state: AtomicU8::new(ConnectionState::Idle as u8),
            consecutive_failures: AtomicU32::new(0),
        });
        let dialer = link.clone();
        let connector = service_fn(move |uri: Uri| dialer.clone().dial(uri));

        let channel = if config.connect.wait_for_ready {
            let timeout = Duration::from_secs(config.connect.ready_timeout_secs);
            let deadline = Instant::now() + timeout;
            loop {
                match tokio::time::timeout_at(
                    deadline,
                    endpoint.connect_with_connector(connector.clone()),
                )
                .await
                {
                    Ok(Ok(channel)) => break channel,
                    Ok(Err(e)) => {
                        tracing::debug!(backend = %backend, error = %e, "Waiting for backend");
                    }
                    Err(_) => {
                        return Err(ConnectError::NotReady {
                            backend: backend.to_string(),
                            timeout,
                        })
                    }
                }
            }
        } else {
            endpoint.connect_with_connector_lazy(connector)
        };

        tracing::info!(
            backend = %backend,
            address = %address,
            wait_for_ready = config.connect.wait_for_ready,
            "Backend client created"
        );

        Ok(Self {
            link,
            address,
            channel: ArcSwapOption::from_pointee(channel),
        })
    }

    pub fn backend(&self) -> &str {
        &self.link.backend
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    /// Issue one call bounded by `deadline`.
    ///
    /// `call` receives a channel clone and the time budget left, which it
    /// should forward as the gRPC timeout.
    pub async fn call<T, F, Fut>(
        &self,
        operation: &'static str,
        deadline: Instant,
        call: F,
    ) -> Result<T, CallError>
    where
        F: FnOnce(Channel, Duration) -> Fut,
        Fut: Future<Output = Result<tonic::Response<T>, tonic::Status>>,
    {
        let started = Instant::now();
        let result = self.call_inner(deadline, call).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        metrics::record_call(self.backend(), operation, outcome, started.elapsed());
        if let Err(e) = &result {
            tracing::debug!(backend = %self.backend(), operation, error = %e, "Backend call failed");
        }

        result
    }

    async fn call_inner<T, F, Fut>(&self, deadline: Instant, call: F) -> Result<T, CallError>
    where
        F: FnOnce(Channel, Duration) -> Fut,
        Fut: Future<Output = Result<tonic::Response<T>, tonic::Status>>,
    {
        let channel = self
            .channel
            .load_full()
            .ok_or_else(CallError::closed)?;
        let budget = remaining(deadline).ok_or_else(CallError::deadline_exceeded)?;

        match tokio::time::timeout_at(deadline, call((*channel).clone(), budget)).await {
            Ok(Ok(response)) => Ok(response.into_inner()),
            Ok(Err(status)) => Err(CallError::from(status)),
            Err(_) => Err(CallError::deadline_exceeded()),
        }
    }

    /// Release the channel. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        let was_open = self.channel.swap(None).is_some();
        if was_open {
            self.link.transition(ConnectionState::Closed);
            tracing::info!(backend = %self.backend(), "Backend client closed");
        }
        was_open
    }
}

/// Accept `host:port` as well as full URIs.
fn normalize_address(address: &str) -> String {
    let address = address.trim();
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}
