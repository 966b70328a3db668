//! Process-wide stop broadcast.
//!
//! The supervisor owns one [`Shutdown`]. Every HTTP and gRPC server it starts
//! (the gateway's public listener, each service's REST and gRPC listeners)
//! holds a receiver and begins draining when the supervisor fires it.

use tokio::sync::broadcast;

/// Stop broadcast shared by the servers of one process.
///
/// Receivers must be taken before [`Shutdown::trigger`]; a receiver created
/// afterwards never observes the stop.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver handed to a server's graceful-shutdown future.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Tell every server to stop accepting and drain. Returns how many
    /// servers were listening.
    pub fn trigger(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
