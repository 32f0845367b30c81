//! Process-wide shutdown token.

use tokio_util::sync::CancellationToken;

/// Returns a token cancelled on SIGTERM or SIGINT (ctrl-c elsewhere).
///
/// Every probe loop watches it; an in-flight probe is dropped, closing its socket.
pub fn install_shutdown_handler() -> anyhow::Result<CancellationToken> {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    #[cfg(unix)]
    {
        use anyhow::Context;
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM, stopping probes"),
                _ = sigint.recv() => tracing::info!("Received SIGINT, stopping probes"),
            }
            token_clone.cancel();
        });
    }

    #[cfg(not(unix))]
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received ctrl-c, stopping probes");
        }
        token_clone.cancel();
    });

    Ok(token)
}
