use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_stream::try_stream;
use futures::{Stream, StreamExt};
use tracing::{info, trace, warn};
use uuid::Uuid;

use super::events::{RunEvent, STEP_REASONING, STEP_RESPONSE, STEP_SEARCH};
use crate::agent::ContentProducer;
use crate::types::RunAgentInput;

/// Ordered event stream of one run
pub type RunStream = Pin<Box<dyn Stream<Item = Result<RunEvent>> + Send>>;

/// Step layout of a run
#[derive(Debug, Clone)]
pub struct RunProfile {
    /// Emit the synthetic `reasoning` and `tool:mock_search` steps before
    /// the response step
    pub include_synthetic_steps: bool,
    /// Pause inside each synthetic step (UI pacing only)
    pub step_pause: Duration,
}

impl Default for RunProfile {
    fn default() -> Self {
        Self {
            include_synthetic_steps: true,
            step_pause: Duration::from_millis(400),
        }
    }
}

impl RunProfile {
    /// Response step only
    pub fn minimal() -> Self {
        Self {
            include_synthetic_steps: false,
            step_pause: Duration::ZERO,
        }
    }
}

/// Run event generator.
///
/// Drives the configured content producer and wraps its fragments in the
/// run lifecycle:
///
/// ```text
/// RUN_STARTED
///   (STEP_STARTED STEP_FINISHED)*          synthetic steps
///   STEP_STARTED response
///     TEXT_MESSAGE_START TEXT_MESSAGE_CONTENT* TEXT_MESSAGE_END
///   STEP_FINISHED response
/// RUN_FINISHED
/// ```
#[derive(Clone)]
pub struct RunGenerator {
    producer: Arc<dyn ContentProducer>,
    profile: RunProfile,
}

impl RunGenerator {
    pub fn new(producer: Arc<dyn ContentProducer>, profile: RunProfile) -> Self {
        Self { producer, profile }
    }

    pub fn producer(&self) -> &Arc<dyn ContentProducer> {
        &self.producer
    }

    pub fn profile(&self) -> &RunProfile {
        &self.profile
    }

    /// Start a run. Nothing is emitted until the stream is polled; dropping
    /// the stream cancels the run and the producer's upstream call with it.
    pub fn start(&self, input: RunAgentInput) -> RunStream {
        let producer = self.producer.clone();
        let profile = self.profile.clone();
        let thread_id = input
            .thread_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(new_id);
        let run_id = new_id();
        let messages = input.messages;

        Box::pin(try_stream! {
            let mut guard = RunGuard::new(&run_id);
            info!(
                thread_id = %thread_id,
                run_id = %run_id,
                producer = producer.name(),
                messages = messages.len(),
                "run started"
            );
            yield RunEvent::run_started(&thread_id, &run_id);

            if profile.include_synthetic_steps {
                for step_name in [STEP_REASONING, STEP_SEARCH] {
                    let step_id = new_id();
                    yield RunEvent::step_started(&step_id, step_name);
                    if !profile.step_pause.is_zero() {
                        tokio::time::sleep(profile.step_pause).await;
                    }
                    yield RunEvent::step_finished(&step_id, step_name);
                }
            }

            let step_id = new_id();
            yield RunEvent::step_started(&step_id, STEP_RESPONSE);

            let message_id = new_id();
            yield RunEvent::text_message_start(&message_id);

            let mut fragments = producer.produce(&messages);
            let mut count = 0usize;
            while let Some(fragment) = fragments.next().await {
                let fragment = fragment?;
                if fragment.is_empty() {
                    continue;
                }
                count += 1;
                trace!(message_id = %message_id, fragment = %fragment, "content fragment");
                yield RunEvent::text_message_content(&message_id, fragment);
            }

            yield RunEvent::text_message_end(&message_id);
            yield RunEvent::step_finished(&step_id, STEP_RESPONSE);
            yield RunEvent::run_finished(&thread_id, &run_id);
            guard.finish();
            info!(
                thread_id = %thread_id,
                run_id = %run_id,
                message_id = %message_id,
                fragments = count,
                "run finished"
            );
        })
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Logs runs whose stream was dropped (client gone) or failed before
/// `RUN_FINISHED`.
struct RunGuard {
    run_id: String,
    finished: bool,
}

impl RunGuard {
    fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            finished: false,
        }
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!(run_id = %self.run_id, "run ended before RUN_FINISHED");
        }
    }
}
