//! FrameHub - Annotated Frame Distribution
//!
//! ## Responsibilities
//!
//! - Fan annotated JPEG frames out from the detection pipeline to every
//!   `/video_feed` viewer
//! - Track the last publish time for health reporting
//!
//! Built on `tokio::sync::broadcast`: slow viewers skip frames instead of
//! applying backpressure to the pipeline.

use bytes::Bytes;
use std::sync::RwLock;
use std::time::Instant;
use tokio::sync::broadcast;

/// Broadcast capacity; a lagging viewer loses the oldest frames first
const CHANNEL_CAPACITY: usize = 8;

/// A camera is considered live if it published within this window
const LIVE_WINDOW_SECS: u64 = 5;

/// FrameHub instance
pub struct FrameHub {
    tx: broadcast::Sender<Bytes>,
    last_publish: RwLock<Option<Instant>>,
}

impl FrameHub {
    /// Create new FrameHub
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            last_publish: RwLock::new(None),
        }
    }

    /// Publish an annotated frame to all viewers
    pub fn publish(&self, frame: Bytes) {
        if let Ok(mut last) = self.last_publish.write() {
            *last = Some(Instant::now());
        }
        // Err just means no viewer is connected right now
        let _ = self.tx.send(frame);
    }

    /// Subscribe to the frame stream
    pub fn subscribe(&self) -> broadcast::Receiver<Bytes> {
        self.tx.subscribe()
    }

    /// Number of connected viewers
    pub fn viewer_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// True when a frame was published recently
    pub fn is_live(&self) -> bool {
        self.last_publish
            .read()
            .ok()
            .and_then(|last| *last)
            .map(|t| t.elapsed().as_secs() < LIVE_WINDOW_SECS)
            .unwrap_or(false)
    }
}

impl Default for FrameHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_published_frame() {
        let hub = FrameHub::new();
        let mut rx = hub.subscribe();

        hub.publish(Bytes::from_static(b"frame-1"));

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.as_ref(), b"frame-1");
    }

    #[tokio::test]
    async fn test_publish_without_viewers_does_not_block() {
        let hub = FrameHub::new();
        hub.publish(Bytes::from_static(b"frame"));
        assert_eq!(hub.viewer_count(), 0);
    }

    #[tokio::test]
    async fn test_is_live_after_publish() {
        let hub = FrameHub::new();
        assert!(!hub.is_live());
        hub.publish(Bytes::from_static(b"frame"));
        assert!(hub.is_live());
    }

    #[tokio::test]
    async fn test_lagging_viewer_skips_frames() {
        let hub = FrameHub::new();
        let mut rx = hub.subscribe();

        for i in 0..(CHANNEL_CAPACITY + 4) {
            hub.publish(Bytes::from(format!("frame-{}", i)));
        }

        // First recv reports the lag, after which fresh frames flow again
        match rx.recv().await {
            Err(broadcast::error::RecvError::Lagged(n)) => assert!(n > 0),
            other => panic!("expected lag, got {:?}", other),
        }
        assert!(rx.recv().await.is_ok());
    }
}
