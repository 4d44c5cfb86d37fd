use async_trait::async_trait;

use crate::error::Result;
use crate::state::MessageHandle;

/// Chat transport used to publish pipeline summaries.
///
/// Implementations report failures as
/// [`crate::error::RelayError::SendFailed`] and
/// [`crate::error::RelayError::UpdateFailed`] and never retry on their own.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Posts a new message and returns its handle.
    async fn send(&self, text: &str) -> Result<MessageHandle>;

    /// Replaces the text of a previously sent message.
    async fn update(&self, handle: MessageHandle, text: &str) -> Result<()>;
}

#[cfg(test)]
pub mod testing {
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::error::RelayError;

    /// In-memory notifier that records every call.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<String>>,
        pub updates: Mutex<Vec<(MessageHandle, String)>>,
        pub fail_send: AtomicBool,
        pub fail_update: AtomicBool,
        pub latency: Option<Duration>,
        next_id: AtomicI64,
    }

    impl RecordingNotifier {
        pub fn with_latency(latency: Duration) -> Self {
            Self {
                latency: Some(latency),
                ..Self::default()
            }
        }

        pub fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        pub fn updates(&self) -> Vec<(MessageHandle, String)> {
            self.updates.lock().unwrap().clone()
        }

        async fn wait(&self) {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str) -> Result<MessageHandle> {
            self.wait().await;
            if self.fail_send.load(Ordering::SeqCst) {
                return Err(RelayError::SendFailed("chat unavailable".to_string()));
            }
            self.sent.lock().unwrap().push(text.to_string());
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 100;
            Ok(MessageHandle::new(id))
        }

        async fn update(&self, handle: MessageHandle, text: &str) -> Result<()> {
            self.wait().await;
            if self.fail_update.load(Ordering::SeqCst) {
                return Err(RelayError::UpdateFailed("chat unavailable".to_string()));
            }
            self.updates.lock().unwrap().push((handle, text.to_string()));
            Ok(())
        }
    }
}
