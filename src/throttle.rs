use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Enforces a minimum spacing between successive outbound requests.
///
/// One instance is shared by every fetch of a run, so the delay is a global
/// rate limit rather than a per-caller one.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits until the delay since the previous call has elapsed, then
    /// records this call as the latest request. The first call never waits.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                sleep(self.delay - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}
