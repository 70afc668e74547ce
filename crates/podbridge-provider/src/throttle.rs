use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Caps the number of in-flight calls to one back-end API.
#[derive(Debug, Clone)]
pub struct ApiThrottle {
    permits: Arc<Semaphore>,
}

impl ApiThrottle {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Run `call` once a permit is free.
    pub async fn run<F: Future>(&self, call: F) -> F::Output {
        // The semaphore is never closed, so acquire only fails on shutdown.
        let _permit = self.permits.acquire().await.ok();
        call.await
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
