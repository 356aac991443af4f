use std::future::Future;

use anyhow::Context;
use disk_bench_core::prelude::ShutdownHandle;

use crate::shutdown::start_shutdown_listener;

/// Owns the tokio runtime that trials are driven on, together with the Ctrl-C listener.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
    shutdown_handle: ShutdownHandle,
}

impl Executor {
    pub fn new() -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
        let shutdown_handle = start_shutdown_listener(&runtime);

        Ok(Self {
            runtime,
            shutdown_handle,
        })
    }

    pub fn shutdown_handle(&self) -> &ShutdownHandle {
        &self.shutdown_handle
    }

    /// Run async code in place, blocking until it completes.
    ///
    /// The future is not cancelled on shutdown. Futures that should stop early must listen to
    /// [Executor::shutdown_handle] themselves, which lets them return partial results.
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }
}
