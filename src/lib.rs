pub mod agent;
pub mod api;
pub mod config;
pub mod context;
pub mod run;
pub mod types;

pub use agent::{
    create_producer, CompletionAdapter, ContentProducer, ResponderRegistry, StaticResponder,
};
pub use api::{create_router, ApiError, AppState};
pub use config::{AppConfig, ProducerKind};
pub use context::{load_context, ContextBundle};
pub use run::{RunEvent, RunGenerator, RunProfile};
pub use types::*;
