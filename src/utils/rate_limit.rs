use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Sliding-window rate limiter shared by all watchers of one HTTP client.
///
/// `acquire` is the only entry point: it waits until a request slot is free,
/// so callers never have to coordinate with each other.
#[derive(Debug)]
pub struct RateLimiter {
    requests: Mutex<Vec<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            max_requests,
            window,
        }
    }

    /// Wait for a request slot in the current window, then claim it
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut requests = self.requests.lock().await;
                let now = Instant::now();
                requests.retain(|&time| now.duration_since(time) < self.window);

                if requests.len() < self.max_requests {
                    requests.push(now);
                    return;
                }
                // Entries are pushed in time order, so the front is the
                // next one to expire
                self.window - now.duration_since(requests[0])
            };
            tokio::time::sleep(wait).await;
        }
    }
}
