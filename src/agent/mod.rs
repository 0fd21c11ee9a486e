mod completion;
mod paced;
mod registry;
mod responder;
mod traits;

pub use completion::{
    degrade_errors, error_fragment, CompletionAdapter, CompletionConfig, PERSONA_PROMPT,
};
pub use paced::Paced;
pub use registry::{ResponderRegistry, Topic, DEFAULT_REPLY};
pub use responder::{chunk_text, StaticResponder, DEFAULT_CHUNK_SIZE};
pub use traits::{ContentProducer, FragmentStream};

use std::sync::Arc;

use anyhow::Result;

use crate::config::{AppConfig, ProducerKind};

/// Build the content producer selected by the startup configuration
pub fn create_producer(
    config: &AppConfig,
    context: Arc<str>,
) -> Result<Arc<dyn ContentProducer>> {
    match (config.producer_kind(), &config.completion) {
        (ProducerKind::Completion, Some(completion)) => {
            tracing::info!(model = %completion.model, "using streaming completion producer");
            Ok(Arc::new(CompletionAdapter::new(completion.clone(), context)?))
        }
        _ => {
            tracing::info!(
                chunk_size = config.chunk_size,
                typing_delay_ms = config.typing_delay.as_millis() as u64,
                "using static responder"
            );
            let responder = StaticResponder::new(ResponderRegistry::builtin(), config.chunk_size);
            Ok(Arc::new(Paced::new(responder, config.typing_delay)))
        }
    }
}
