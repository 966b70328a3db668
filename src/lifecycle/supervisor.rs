//! Task supervision and ordered shutdown.
//!
//! # Responsibilities
//! - Own every long-running task of one process (HTTP and gRPC servers)
//! - Stop on an external signal or when any task exits on its own
//! - Broadcast shutdown, drain within the grace period, then run closers
//!
//! # Design Decisions
//! - Closers run after servers drain, in reverse registration order
//! - Tasks still running when the grace period ends are aborted
//! - After an external signal, aborting stragglers is logged, not reported
//! - The first failure is reported; later ones are only logged

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;
use tokio::task::{JoinError, JoinSet};

use crate::lifecycle::shutdown::Shutdown;

type Closer = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("task {name} failed: {source}")]
    TaskFailed {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("task panicked or was cancelled: {0}")]
    TaskAborted(String),

    #[error("tasks still running after shutdown grace period of {0:?}")]
    GraceExceeded(Duration),
}

pub struct Supervisor {
    shutdown: Shutdown,
    tasks: JoinSet<(&'static str, io::Result<()>)>,
    closers: Vec<(&'static str, Closer)>,
    grace: Duration,
}

impl Supervisor {
    pub fn new(grace: Duration) -> Self {
        Self {
            shutdown: Shutdown::new(),
            tasks: JoinSet::new(),
            closers: Vec::new(),
            grace,
        }
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Run a task until it finishes; it should exit when the shutdown fires.
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = io::Result<()>> + Send + 'static,
    {
        self.tasks.spawn(async move { (name, task.await) });
    }

    /// Register cleanup to run once every task has stopped.
    pub fn on_shutdown<F>(&mut self, name: &'static str, closer: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.closers.push((name, Box::pin(closer)));
    }

    /// Block until `signal` resolves or a task exits, then shut down.
    pub async fn run_until<S>(mut self, signal: S) -> Result<(), LifecycleError>
    where
        S: Future<Output = ()>,
    {
        let mut failure: Option<LifecycleError> = None;
        let mut signalled = false;

        tokio::select! {
            _ = signal => {
                tracing::info!("Shutdown requested");
                signalled = true;
            }
            Some(joined) = self.tasks.join_next() => {
                if let Err(e) = outcome(joined) {
                    tracing::error!(error = %e, "Task stopped unexpectedly");
                    failure = Some(e);
                } else {
                    tracing::warn!("Task exited before shutdown was requested");
                }
            }
        }

        let listeners = self.shutdown.trigger();
        tracing::debug!(listeners, "Shutdown broadcast");

        let grace = self.grace;
        let tasks = &mut self.tasks;
        let drained = tokio::time::timeout(grace, async {
            let mut first = None;
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = outcome(joined) {
                    tracing::error!(error = %e, "Task failed during shutdown");
                    first.get_or_insert(e);
                }
            }
            first
        })
        .await;

        match drained {
            Ok(Some(e)) => {
                failure.get_or_insert(e);
            }
            Ok(None) => {}
            Err(_) => {
                tracing::warn!(
                    grace = ?grace,
                    remaining = self.tasks.len(),
                    "Grace period elapsed; aborting remaining tasks"
                );
                self.tasks.abort_all();
                if !signalled {
                    failure.get_or_insert(LifecycleError::GraceExceeded(grace));
                }
            }
        }

        while let Some((name, closer)) = self.closers.pop() {
            closer.await;
            tracing::debug!(resource = name, "Closed");
        }

        tracing::info!("Shutdown complete");
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn outcome(
    joined: Result<(&'static str, io::Result<()>), JoinError>,
) -> Result<(), LifecycleError> {
    match joined {
        Ok((_, Ok(()))) => Ok(()),
        Ok((name, Err(source))) => Err(LifecycleError::TaskFailed { name, source }),
        Err(e) => Err(LifecycleError::TaskAborted(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn signal_stops_tasks_then_runs_closers_in_reverse() {
        let mut supervisor = Supervisor::new(Duration::from_secs(1));
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut rx = supervisor.shutdown().subscribe();
        let seen = order.clone();
        supervisor.spawn("server", async move {
            let _ = rx.recv().await;
            seen.lock().unwrap().push("server");
            Ok(())
        });
        for name in ["first", "second"] {
            let seen = order.clone();
            supervisor.on_shutdown(name, async move { seen.lock().unwrap().push(name) });
        }

        supervisor.run_until(async {}).await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["server", "second", "first"]);
    }

    #[tokio::test]
    async fn failing_task_triggers_shutdown_and_is_reported() {
        let mut supervisor = Supervisor::new(Duration::from_secs(1));
        let stopped = Arc::new(AtomicUsize::new(0));

        let mut rx = supervisor.shutdown().subscribe();
        let counter = stopped.clone();
        supervisor.spawn("healthy", async move {
            let _ = rx.recv().await;
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        supervisor.spawn("broken", async {
            Err(io::Error::new(io::ErrorKind::AddrInUse, "port taken"))
        });

        let err = supervisor
            .run_until(std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::TaskFailed { name: "broken", .. }));
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stuck_task_after_signal_is_aborted_and_shutdown_succeeds() {
        let mut supervisor = Supervisor::new(Duration::from_millis(50));
        supervisor.spawn("stuck", std::future::pending());
        let closed = Arc::new(AtomicUsize::new(0));
        let counter = closed.clone();
        supervisor.on_shutdown("store", async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let started = tokio::time::Instant::now();
        supervisor.run_until(async {}).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stuck_task_after_unrequested_exit_is_reported() {
        let mut supervisor = Supervisor::new(Duration::from_millis(50));
        supervisor.spawn("stuck", std::future::pending());
        supervisor.spawn("quitter", async { Ok(()) });

        let err = supervisor
            .run_until(std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::GraceExceeded(_)));
    }

    #[tokio::test]
    async fn task_failure_wins_over_stuck_siblings() {
        let mut supervisor = Supervisor::new(Duration::from_millis(50));
        supervisor.spawn("stuck", std::future::pending());
        supervisor.spawn("broken", async {
            Err(io::Error::new(io::ErrorKind::AddrInUse, "port taken"))
        });

        let err = supervisor
            .run_until(std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::TaskFailed { name: "broken", .. }));
    }
}
