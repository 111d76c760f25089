use std::time::Duration;

use async_trait::async_trait;

/// Every wait in the loader goes through this trait so tests can observe sleeps
/// instead of performing them.
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Plain timer sleep. Zero durations return immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
