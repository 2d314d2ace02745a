//! Push-notification collaborator boundary.
//!
//! The engine fires [`Notifier::notify_library_changed`] at most once per
//! reconciliation cycle, and only after every mutation of that cycle has been
//! applied through the catalog. Wiring the signal to connected clients (e.g.
//! a WebSocket channel) is the embedder's responsibility.

use async_trait::async_trait;

/// Receives the "library updated" signal.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_library_changed(&self);
}

/// Default [`Notifier`] that only logs the signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_library_changed(&self) {
        log::info!("library changed; clients should refresh");
    }
}
