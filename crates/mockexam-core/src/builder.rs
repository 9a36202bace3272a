//! Assembles the ordered item list from the generation service.
//!
//! One request per area, up to `parallelism` in flight. Batches are placed by
//! area index, so numbering never depends on which response lands first. The
//! build is atomic: any failed area fails the whole set.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::error::{ExamError, ProviderError};
use crate::model::{ContentArea, GeneratedItem, Item, ITEMS_PER_AREA};
use crate::traits::ItemSource;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Retries on transient provider errors (never on malformed batches).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
        }
    }
}

pub struct QuestionSetBuilder {
    source: Arc<dyn ItemSource>,
    parallelism: usize,
    retry: RetryPolicy,
}

impl QuestionSetBuilder {
    pub fn new(source: Arc<dyn ItemSource>) -> Self {
        Self {
            source,
            parallelism: 1,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch every area and number the items `1..=areas.len() * ITEMS_PER_AREA`.
    pub async fn build(&self, areas: &[ContentArea], session_seed: &str) -> Result<Vec<Item>, ExamError> {
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut futures = FuturesUnordered::new();

        for (index, area) in areas.iter().copied().enumerate() {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let retry = self.retry.clone();
            let seed = format!("{session_seed}-{index}-{area}");

            futures.push(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => fetch_batch(source.as_ref(), area, &seed, &retry).await,
                    Err(_) => Err(anyhow::anyhow!("semaphore closed")),
                };
                (index, area, result)
            });
        }

        let mut batches: Vec<Option<Vec<GeneratedItem>>> = vec![None; areas.len()];
        while let Some((index, area, result)) = futures.next().await {
            match result {
                Ok(batch) => {
                    tracing::debug!(%area, index, "area batch received");
                    batches[index] = Some(batch);
                }
                Err(source) => {
                    tracing::error!(%area, "item generation failed: {source:#}");
                    // Dropping the remaining futures abandons any other in-flight areas.
                    return Err(ExamError::Generation { area, source });
                }
            }
        }

        let mut items = Vec::with_capacity(areas.len() * ITEMS_PER_AREA);
        for (area, batch) in areas.iter().copied().zip(batches) {
            let batch = batch.ok_or_else(|| ExamError::Generation {
                area,
                source: anyhow::anyhow!("no batch received"),
            })?;
            for generated in batch {
                let number = items.len() as u32 + 1;
                items.push(generated.into_item(number, area));
            }
        }

        tracing::info!(items = items.len(), areas = areas.len(), "question set assembled");
        Ok(items)
    }
}

async fn fetch_batch(
    source: &dyn ItemSource,
    area: ContentArea,
    seed: &str,
    retry: &RetryPolicy,
) -> anyhow::Result<Vec<GeneratedItem>> {
    let mut delay = retry.initial_delay;
    let mut attempt = 0u32;

    loop {
        match source.generate(area, ITEMS_PER_AREA, seed).await {
            Ok(batch) => return check_batch(batch),
            Err(e) => {
                let provider_error = e.downcast_ref::<ProviderError>();
                if provider_error.is_some_and(ProviderError::is_permanent)
                    || attempt >= retry.max_retries
                {
                    return Err(e);
                }
                if let Some(ms) = provider_error.and_then(ProviderError::retry_after_ms) {
                    delay = Duration::from_millis(ms);
                }
                attempt += 1;
                tracing::warn!(%area, attempt, "generation failed, retrying in {delay:?}: {e:#}");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
            }
        }
    }
}

fn check_batch(batch: Vec<GeneratedItem>) -> anyhow::Result<Vec<GeneratedItem>> {
    anyhow::ensure!(
        batch.len() == ITEMS_PER_AREA,
        "expected {ITEMS_PER_AREA} items, got {}",
        batch.len()
    );
    for (i, item) in batch.iter().enumerate() {
        item.validate()
            .map_err(|e| anyhow::anyhow!("item {} of batch is invalid: {e}", i + 1))?;
    }
    Ok(batch)
}
