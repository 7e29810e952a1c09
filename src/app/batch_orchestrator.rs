use crate::app::extract_details_use_case::ExtractDetailsUseCase;
use crate::app::ports::{BatchProgress, BrowserLauncher, CheckpointPort};
use crate::config::DetailsConfig;
use crate::error::Result;
use crate::metrics::{BATCHES_FAILED, DUPLICATES_SKIPPED, EXTRACTION_FAILURES, RECORDS_EXTRACTED};
use crate::pipeline::{batch_count, partition, DelayRange};
use crate::types::EventRecord;
use crate::validation::SeenEvents;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSettings {
    pub batch_size: usize,
    /// Pause between two links of the same batch.
    pub request_delay: DelayRange,
    /// Pause between batches.
    pub batch_break: DelayRange,
    pub scroll_probability: f64,
    /// Links between long breaks; 0 never takes one.
    pub links_per_session: usize,
    pub session_break: DelayRange,
}

impl BatchSettings {
    pub fn from_config(details: &DetailsConfig) -> Self {
        Self {
            batch_size: details.batch_size.max(1),
            request_delay: DelayRange::from_secs(details.min_delay_secs, details.max_delay_secs),
            batch_break: DelayRange::from_secs(
                details.min_batch_break_secs,
                details.max_batch_break_secs,
            ),
            scroll_probability: details.scroll_probability.clamp(0.0, 1.0),
            links_per_session: details.links_per_session,
            session_break: DelayRange::from_secs(
                details.min_session_break_mins * 60.0,
                details.max_session_break_mins * 60.0,
            ),
        }
    }

    pub fn takes_long_break(&self, links_since_break: usize) -> bool {
        self.links_per_session > 0 && links_since_break >= self.links_per_session
    }
}

/// Totals for one detail run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub total_links: usize,
    pub processed: usize,
    pub extracted: usize,
    pub failed: usize,
    pub duplicates: usize,
    pub failed_batches: usize,
    pub elapsed: Duration,
}

/// Drives the detail phase batch by batch, one browser session per batch.
pub struct BatchOrchestrator {
    launcher: Arc<dyn BrowserLauncher>,
    extractor: ExtractDetailsUseCase,
    settings: BatchSettings,
}

impl BatchOrchestrator {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        extractor: ExtractDetailsUseCase,
        settings: BatchSettings,
    ) -> Self {
        Self { launcher, extractor, settings }
    }

    /// Processes the links at `indices` of `links`, in that order. Batch
    /// failures are counted and checkpointed, never returned.
    pub async fn run(
        &self,
        links: &[String],
        indices: &[usize],
        seen: &mut SeenEvents,
        checkpoint: &mut dyn CheckpointPort,
        rng: &mut StdRng,
    ) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary { total_links: indices.len(), ..RunSummary::default() };
        let batches = batch_count(indices.len(), self.settings.batch_size);
        info!(
            "🚀 Processing {} links in {} batches of up to {}",
            indices.len(),
            batches,
            self.settings.batch_size
        );

        let mut since_break = 0;
        for (i, batch) in partition(indices, self.settings.batch_size).enumerate() {
            let span = info_span!("batch", batch = i + 1, of = batches, session = %Uuid::new_v4());

            let (records, failed) = match self
                .run_batch(links, batch, seen, rng, &mut summary)
                .instrument(span.clone())
                .await
            {
                Ok(records) => (records, false),
                Err(e) => {
                    error!(parent: &span, "❌ Batch {}/{} failed: {}", i + 1, batches, e);
                    summary.failed_batches += 1;
                    metrics::counter!(BATCHES_FAILED).increment(1);
                    (Vec::new(), true)
                }
            };

            let progress = BatchProgress { indices: batch.to_vec(), failed };
            if let Err(e) = checkpoint.checkpoint(&records, &progress).await {
                error!(parent: &span, "❌ Checkpoint after batch {} failed: {}", i + 1, e);
            }

            since_break += batch.len();
            if i + 1 < batches {
                self.rest_after_batch(i + 1, batches, &mut since_break, rng).await;
            }
        }

        summary.elapsed = started.elapsed();
        info!(
            "🏁 Run finished: {} extracted, {} failed, {} duplicates, {} failed batches in {:.1}s",
            summary.extracted,
            summary.failed,
            summary.duplicates,
            summary.failed_batches,
            summary.elapsed.as_secs_f64()
        );
        summary
    }

    /// Short break between batches, or a long one every `links_per_session`
    /// links.
    async fn rest_after_batch(
        &self,
        done: usize,
        batches: usize,
        since_break: &mut usize,
        rng: &mut StdRng,
    ) {
        let pause = if self.settings.takes_long_break(*since_break) {
            let pause = self.settings.session_break.sample(rng);
            info!(
                "😴 {} links since the last long break, pausing {:.1} minutes",
                since_break,
                pause.as_secs_f64() / 60.0
            );
            *since_break = 0;
            pause
        } else {
            let pause = self.settings.batch_break.sample(rng);
            info!("☕ Batch {}/{} done, resting {:.0}s", done, batches, pause.as_secs_f64());
            pause
        };
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    async fn run_batch(
        &self,
        links: &[String],
        batch: &[usize],
        seen: &mut SeenEvents,
        rng: &mut StdRng,
        summary: &mut RunSummary,
    ) -> Result<Vec<EventRecord>> {
        let mut session = self.launcher.open_session().await?;
        let mut records = Vec::new();

        for (j, link) in batch.iter().filter_map(|&i| links.get(i)).enumerate() {
            if seen.has_link(link) {
                info!("🔁 Skipping duplicate {}", link);
                summary.duplicates += 1;
                metrics::counter!(DUPLICATES_SKIPPED).increment(1);
                continue;
            }

            summary.processed += 1;
            let outcome = self
                .extractor
                .extract(session.as_mut(), link)
                .instrument(info_span!("link", url = %link))
                .await;
            match outcome {
                Ok(record) if seen.insert(&record.event_link, &record.title) => {
                    summary.extracted += 1;
                    metrics::counter!(RECORDS_EXTRACTED).increment(1);
                    records.push(record);
                }
                Ok(record) => {
                    info!("🔁 '{}' was already collected, dropping {}", record.title, link);
                    summary.duplicates += 1;
                    metrics::counter!(DUPLICATES_SKIPPED).increment(1);
                }
                Err(failure) => {
                    summary.failed += 1;
                    metrics::counter!(EXTRACTION_FAILURES, "reason" => failure.reason()).increment(1);
                }
            }

            if rng.gen_bool(self.settings.scroll_probability) {
                if let Err(e) = session.scroll().await {
                    debug!("Scroll failed: {}", e);
                }
            }
            if j + 1 < batch.len() {
                self.settings.request_delay.pause(rng).await;
            }
        }

        if let Err(e) = session.close().await {
            debug!("Closing browser session failed: {}", e);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_clamp_size_and_probability() {
        let details = DetailsConfig {
            batch_size: 0,
            scroll_probability: 1.5,
            ..DetailsConfig::default()
        };
        let settings = BatchSettings::from_config(&details);
        assert_eq!(settings.batch_size, 1);
        assert_eq!(settings.scroll_probability, 1.0);
        assert_eq!(settings.request_delay, DelayRange::from_secs(3.0, 7.0));
        assert_eq!(settings.session_break, DelayRange::from_secs(1800.0, 3600.0));
        assert_eq!(settings.links_per_session, 50);
    }

    #[test]
    fn long_break_every_links_per_session() {
        let details = DetailsConfig { links_per_session: 4, ..DetailsConfig::default() };
        let settings = BatchSettings::from_config(&details);
        assert!(!settings.takes_long_break(3));
        assert!(settings.takes_long_break(4));
        assert!(settings.takes_long_break(6));

        let never = BatchSettings { links_per_session: 0, ..settings };
        assert!(!never.takes_long_break(1_000));
    }
}
