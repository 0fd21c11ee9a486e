use futures::stream;

use super::{ContentProducer, FragmentStream, ResponderRegistry};
use crate::types::{last_user_message, ChatMessage};

/// Default fragment length (characters)
pub const DEFAULT_CHUNK_SIZE: usize = 3;

/// Static responder - keyword-matched replies, no API key required
pub struct StaticResponder {
    registry: ResponderRegistry,
    chunk_size: usize,
}

impl StaticResponder {
    pub fn new(registry: ResponderRegistry, chunk_size: usize) -> Self {
        Self {
            registry,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Full reply for a conversation
    pub fn reply(&self, history: &[ChatMessage]) -> &'static str {
        self.registry
            .resolve(last_user_message(history).unwrap_or_default())
    }
}

impl Default for StaticResponder {
    fn default() -> Self {
        Self::new(ResponderRegistry::builtin(), DEFAULT_CHUNK_SIZE)
    }
}

impl ContentProducer for StaticResponder {
    fn name(&self) -> &str {
        "static"
    }

    fn produce(&self, history: &[ChatMessage]) -> FragmentStream {
        let reply = self.reply(history);
        tracing::debug!(chars = reply.chars().count(), "static reply resolved");
        let fragments = chunk_text(reply, self.chunk_size);
        Box::pin(stream::iter(fragments.into_iter().map(Ok)))
    }
}

/// Split text into fragments of `size` characters, keeping order and never
/// splitting a character.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    text.chars()
        .collect::<Vec<_>>()
        .chunks(size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}
