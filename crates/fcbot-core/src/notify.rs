//! Outbound notification seam.

/// Sends announcements on behalf of the bot. Delivery is
/// fire-and-forget: failures are logged by callers, never surfaced to
/// the command layer.
///
/// Use `&self` for all methods — implementations should use interior
/// mutability for any mutable state.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Send to the announcement stream.
    async fn send_broadcast(&self, content: &str) -> anyhow::Result<()>;

    /// Send a private message to one recipient.
    async fn send_private(&self, recipient: &str, content: &str) -> anyhow::Result<()>;
}
