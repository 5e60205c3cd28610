use anyhow::Result;
use std::future::Future;

#[cfg(unix)]
use anyhow::Context;
#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Ctrl+C arrived while a secret was being worked on
#[derive(Debug, thiserror::Error)]
#[error("Interrupted")]
pub struct Interrupted;

impl Interrupted {
    /// 128 + SIGINT
    pub const EXIT_CODE: i32 = 130;
}

/// Holds Ctrl+C for as long as it lives, so an interrupted edit unwinds
/// through the workspace cleanup instead of killing the process.
pub struct Interrupt {
    #[cfg(unix)]
    sigint: Signal,
}

impl Interrupt {
    pub fn listen() -> Result<Self> {
        #[cfg(unix)]
        let interrupt = Self {
            sigint: signal(SignalKind::interrupt()).context("Failed to listen for Ctrl+C")?,
        };
        #[cfg(not(unix))]
        let interrupt = Self {};
        Ok(interrupt)
    }

    async fn recv(&mut self) {
        #[cfg(unix)]
        let received = self.sigint.recv().await.is_some();
        #[cfg(not(unix))]
        let received = tokio::signal::ctrl_c().await.is_ok();

        if !received {
            std::future::pending::<()>().await;
        }
    }

    /// Run `task`, dropping it (and any child it spawned) on Ctrl+C
    pub async fn interruptible<F, T>(&mut self, task: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            result = task => result,
            _ = self.recv() => {
                log::debug!("Received Ctrl+C, abandoning");
                Err(Interrupted.into())
            }
        }
    }

    /// Run `task` to completion, leaving Ctrl+C to the child that owns the
    /// terminal (an editor uses it for its own purposes).
    pub async fn uninterruptible<F, T>(&mut self, task: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::pin!(task);
        loop {
            tokio::select! {
                result = &mut task => return result,
                _ = self.recv() => log::debug!("Ctrl+C left to the editor"),
            }
        }
    }
}
