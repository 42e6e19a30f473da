use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodic maintenance tasks tied to the process lifecycle.
pub struct BackgroundJobs {
    token: CancellationToken,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Default for BackgroundJobs {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundJobs {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    /// Run `task` after every `period()`. The period is re-read before each
    /// sleep so settings reloads take effect on the next tick.
    pub fn spawn_periodic<P, T, Fut>(&mut self, name: &'static str, period: P, mut task: T)
    where
        P: Fn() -> Duration + Send + 'static,
        T: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();

        let handle = tokio::spawn(async move {
            info!("⏱️ Background job '{}' started", name);
            loop {
                let wait = period();
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {
                        debug!("Running background job '{}'", name);
                        task().await;
                    }
                }
            }
            info!("Background job '{}' stopped", name);
        });

        self.handles.push((name, handle));
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cancel every job and wait for it to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                warn!("Background job '{}' ended abnormally: {}", name, e);
            }
        }
    }
}
