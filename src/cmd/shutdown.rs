use tokio::signal;
use tracing::{info, warn};

/// Resolve on SIGINT (Ctrl-C) or SIGTERM
pub(crate) async fn shutdown_signal() {
    let sigint = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received SIGINT"),
            Err(e) => {
                warn!(error = %e, "failed to install SIGINT handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received SIGTERM");
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = sigint => {}
        () = sigterm => {}
    }
}
