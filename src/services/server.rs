//! gRPC serving shared by the backend services.

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::server::Router;

/// Serve `router` on `listener` until the shutdown channel fires.
pub async fn serve_grpc(
    name: &'static str,
    listener: TcpListener,
    router: Router,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(server = name, address = %addr, "gRPC server starting");

    router
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
            let _ = shutdown.recv().await;
        })
        .await
        .map_err(std::io::Error::other)?;

    tracing::info!(server = name, "gRPC server stopped");
    Ok(())
}
