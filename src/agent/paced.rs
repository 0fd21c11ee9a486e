use std::time::Duration;

use anyhow::Result;
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;

use super::{ContentProducer, FragmentStream};
use crate::types::ChatMessage;

/// Typing simulation: delays every fragment after the first by a fixed
/// interval. Wraps any producer.
pub struct Paced<P> {
    inner: P,
    delay: Duration,
}

impl<P: ContentProducer> Paced<P> {
    pub fn new(inner: P, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<P: ContentProducer> ContentProducer for Paced<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn health_check(&self) -> Result<()> {
        self.inner.health_check().await
    }

    fn produce(&self, history: &[ChatMessage]) -> FragmentStream {
        let mut fragments = self.inner.produce(history);
        let delay = self.delay;
        if delay.is_zero() {
            return fragments;
        }
        Box::pin(stream! {
            let mut first = true;
            while let Some(fragment) = fragments.next().await {
                if !first {
                    tokio::time::sleep(delay).await;
                }
                first = false;
                yield fragment;
            }
        })
    }
}
