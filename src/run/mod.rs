mod events;
mod generator;

pub use events::{RunEvent, STEP_REASONING, STEP_RESPONSE, STEP_SEARCH};
pub use generator::{RunGenerator, RunProfile, RunStream};
