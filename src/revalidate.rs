//! Cache-path invalidation signal
//!
//! Writes publish the paths whose rendered pages are stale. Subscribers (a
//! front-end cache, the logger) receive them over a broadcast channel.

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct Revalidator {
    sender: broadcast::Sender<String>,
}

impl Revalidator {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Mark a path stale. Having no subscribers is not an error.
    pub fn revalidate(&self, path: impl Into<String>) {
        let path = path.into();
        debug!("Revalidating {}", path);
        let _ = self.sender.send(path);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }
}

/// Log published paths until every sender is gone. Returns how many were seen.
pub async fn log_invalidations(mut receiver: broadcast::Receiver<String>) -> usize {
    let mut seen = 0;
    loop {
        match receiver.recv().await {
            Ok(path) => {
                seen += 1;
                debug!("Revalidated {}", path);
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Invalidation log fell behind, skipped {} paths", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
    seen
}

impl Default for Revalidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_paths_in_order() {
        let revalidator = Revalidator::new();
        let mut rx = revalidator.subscribe();

        revalidator.revalidate("/admin/properties");
        revalidator.revalidate(format!("/properties/{}", 7));

        assert_eq!(rx.recv().await.unwrap(), "/admin/properties");
        assert_eq!(rx.recv().await.unwrap(), "/properties/7");
    }

    #[tokio::test]
    async fn test_logger_survives_lag_and_stops_on_close() {
        let revalidator = Revalidator::new();
        let rx = revalidator.subscribe();

        for i in 0..CHANNEL_CAPACITY + 6 {
            revalidator.revalidate(format!("/properties/{}", i));
        }
        drop(revalidator);

        assert_eq!(log_invalidations(rx).await, CHANNEL_CAPACITY);
    }

    #[test]
    fn test_revalidate_without_subscribers() {
        Revalidator::new().revalidate("/admin/properties");
    }
}
