use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;

use crate::types::ChatMessage;

/// Lazy, ordered, finite sequence of reply fragments
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Content producer - supplies the reply text for a run
#[async_trait]
pub trait ContentProducer: Send + Sync + 'static {
    /// Stream the reply for `history` fragment by fragment.
    ///
    /// Nothing happens until the returned stream is polled; dropping it
    /// releases whatever upstream resources it holds.
    fn produce(&self, history: &[ChatMessage]) -> FragmentStream;

    /// Producer name
    fn name(&self) -> &str;

    /// Check that the producer can serve requests (upstream reachable etc.)
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
