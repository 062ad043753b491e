//! Positioning source interface.
//!
//! The tracking engine treats the device's positioning subsystem as a
//! capability that may be missing or refused, and that streams raw fixes
//! once subscribed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, RwLock};

use super::error::CollaboratorError;
use crate::models::PositionFix;

/// Channel capacity used by the mock source.
const MOCK_CHANNEL_CAPACITY: usize = 64;

/// Outcome of a location permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
}

/// Options passed when subscribing to continuous fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    /// How long the source may take to deliver a fix.
    pub timeout: Duration,
    /// Oldest cached fix the source may hand out.
    pub maximum_age: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(15),
            maximum_age: Duration::from_secs(30),
        }
    }
}

/// Stream of raw fixes. Dropping it ends the subscription.
pub type FixStream = mpsc::Receiver<PositionFix>;

/// Device positioning capability.
#[async_trait::async_trait]
pub trait PositionSource: Send + Sync {
    /// Whether the environment has a positioning capability at all.
    fn is_available(&self) -> bool;

    /// Ask for (or report) location permission.
    async fn request_permission(&self) -> PermissionState;

    /// Start continuous position delivery.
    async fn subscribe(&self, options: WatchOptions) -> Result<FixStream, CollaboratorError>;

    /// Stop continuous position delivery.
    async fn unsubscribe(&self) {}
}

/// Position source driven by test code.
#[derive(Debug)]
pub struct MockPositionSource {
    available: AtomicBool,
    permission: RwLock<PermissionState>,
    sender: Mutex<Option<mpsc::Sender<PositionFix>>>,
    last_options: Mutex<Option<WatchOptions>>,
}

impl Default for MockPositionSource {
    fn default() -> Self {
        Self {
            available: AtomicBool::new(true),
            permission: RwLock::new(PermissionState::Granted),
            sender: Mutex::new(None),
            last_options: Mutex::new(None),
        }
    }
}

impl MockPositionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source that reports no positioning capability.
    pub fn unavailable() -> Self {
        let source = Self::default();
        source.available.store(false, Ordering::SeqCst);
        source
    }

    /// A source whose permission prompt is refused.
    pub fn denied() -> Self {
        Self {
            permission: RwLock::new(PermissionState::Denied),
            ..Self::default()
        }
    }

    /// Deliver a fix to the current subscriber.
    ///
    /// Returns false when nobody is subscribed.
    pub async fn push(&self, fix: PositionFix) -> bool {
        let sender = self.sender.lock().await.clone();
        match sender {
            Some(tx) => tx.send(fix).await.is_ok(),
            None => false,
        }
    }

    pub async fn is_subscribed(&self) -> bool {
        self.sender.lock().await.is_some()
    }

    pub async fn last_options(&self) -> Option<WatchOptions> {
        *self.last_options.lock().await
    }
}

#[async_trait::async_trait]
impl PositionSource for MockPositionSource {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn request_permission(&self) -> PermissionState {
        *self.permission.read().await
    }

    async fn subscribe(&self, options: WatchOptions) -> Result<FixStream, CollaboratorError> {
        let (tx, rx) = mpsc::channel(MOCK_CHANNEL_CAPACITY);
        *self.sender.lock().await = Some(tx);
        *self.last_options.lock().await = Some(options);
        Ok(rx)
    }

    async fn unsubscribe(&self) {
        self.sender.lock().await.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;
    use chrono::Utc;

    #[tokio::test]
    async fn test_mock_source_delivers_to_subscriber() {
        let source = MockPositionSource::new();
        let fix = PositionFix::new(Coordinate::new(10.0, 106.0, 5.0, Utc::now()));
        assert!(!source.push(fix.clone()).await);

        let mut rx = source.subscribe(WatchOptions::default()).await.unwrap();
        assert!(source.push(fix.clone()).await);
        assert_eq!(rx.recv().await, Some(fix));
    }

    #[tokio::test]
    async fn test_mock_source_unsubscribe_closes_stream() {
        let source = MockPositionSource::new();
        let mut rx = source.subscribe(WatchOptions::default()).await.unwrap();
        source.unsubscribe().await;

        assert!(rx.recv().await.is_none());
        assert!(!source.is_subscribed().await);
    }

    #[tokio::test]
    async fn test_mock_source_capabilities() {
        assert!(!MockPositionSource::unavailable().is_available());
        assert_eq!(
            MockPositionSource::denied().request_permission().await,
            PermissionState::Denied
        );
        assert_eq!(
            MockPositionSource::new().request_permission().await,
            PermissionState::Granted
        );
    }
}
