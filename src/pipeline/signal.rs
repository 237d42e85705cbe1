use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Cancel `ct` when the process receives an interrupt.
///
/// The listener exits quietly if the token is cancelled by someone else.
pub fn spawn_interrupt_listener(ct: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = ct.cancelled() => {}
            result = wait_for_interrupt() => match result {
                Ok(signal) => {
                    warn!(signal, "Interrupt received, cancelling pipeline");
                    ct.cancel();
                }
                Err(e) => error!(error = %e, "Failed to install signal handler"),
            },
        }
    })
}

#[cfg(unix)]
async fn wait_for_interrupt() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = interrupt.recv() => Ok("SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
