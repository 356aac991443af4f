use disk_bench_core::prelude::ShutdownHandle;
use tokio::signal;

/// Trigger the returned handle on Ctrl-C.
pub(crate) fn start_shutdown_listener(runtime: &tokio::runtime::Runtime) -> ShutdownHandle {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    runtime.spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                log::warn!("Received shutdown signal, stopping after the current trial is cleaned up");
                listener_handle.shutdown();
            }
            Err(e) => log::error!("Failed to listen for Ctrl-C, shutdown on signal is disabled: {e}"),
        }
    });

    handle
}
