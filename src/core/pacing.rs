use std::time::Duration;

/// Cooperative pacing between external calls. Injected into the engine so
/// "how fast can we call the channel" stays separate from the per-item
/// decision logic; it paces calls, it is not a lock.
#[derive(Debug, Clone)]
pub struct DispatchPacer {
    message_delay: Duration,
    batch_delay: Duration,
}

impl DispatchPacer {
    pub fn new(message_delay: Duration, batch_delay: Duration) -> Self {
        Self {
            message_delay,
            batch_delay,
        }
    }

    pub fn from_seconds(message_delay_seconds: f64, batch_delay_seconds: f64) -> Self {
        Self::new(
            Duration::from_secs_f64(message_delay_seconds.max(0.0)),
            Duration::from_secs_f64(batch_delay_seconds.max(0.0)),
        )
    }

    /// No delays at all; for tests.
    pub fn unthrottled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub async fn after_dispatch(&self) {
        if !self.message_delay.is_zero() {
            tokio::time::sleep(self.message_delay).await;
        }
    }

    pub async fn after_batch(&self) {
        if !self.batch_delay.is_zero() {
            tokio::time::sleep(self.batch_delay).await;
        }
    }
}
