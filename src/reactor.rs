//! A thin wrapper around a current-thread [`tokio::runtime::Runtime`]: the
//! binaries each drive one reactor for the lifetime of the process.

use std::{
  future::Future,
  time::Duration,
};

use tokio::runtime::Runtime;
use tracing::warn;

/// Owns a tokio runtime and drives futures and periodic actions on it.
pub struct Reactor {
  runtime: Runtime,
}

impl Reactor {
  /// Build a current-thread runtime with timers and I/O enabled.
  pub fn new() -> std::io::Result<Self> {
    let runtime = tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()?;
    Ok(Self { runtime })
  }

  /// Block the calling thread running `future` to completion.
  pub fn block_on<F: Future>(&self, future: F) -> F::Output {
    self.runtime.block_on(future)
  }

  /// Spawn a task that runs `action` every `period`, rescheduling itself
  /// after each run completes rather than on a fixed-rate tick, so a slow
  /// run pushes later runs back instead of piling them up.
  pub fn schedule_every<F, Fut>(&self, period: Duration, mut action: F)
  where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
  {
    self.runtime.spawn(async move {
      loop {
        tokio::time::sleep(period).await;
        action().await;
      }
    });
  }

  /// Run until the process receives `SIGINT`/ctrl-c, logging if the signal
  /// handler itself fails to install.
  pub async fn wait_for_shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
      warn!(%err, "failed to listen for shutdown signal");
    }
  }
}
