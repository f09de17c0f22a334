//! The chunk-oriented stage runner.

use std::future::Future;

use futures::FutureExt;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{PipelineConfig, StageKind};
use crate::error::{EngineError, EngineResult};

use super::policy::FaultPolicy;
use super::stats::{FailureRecord, StageExecution, StageStats};
use super::traits::{ItemProcessor, ItemReader, ItemWriter, StageContext};

/// Throughput settings of a stage run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSettings {
    /// Items per commit.
    pub chunk_size: usize,
    /// Items processed concurrently within a chunk.
    pub worker_concurrency: usize,
    /// Capacity of the reader channel.
    pub channel_capacity: usize,
    /// Failures kept in [`StageStats::failures`].
    pub max_reported_failures: usize,
}

impl StageSettings {
    /// Settings of `stage` taken from `config`.
    pub fn from_config(stage: StageKind, config: &PipelineConfig) -> Self {
        Self {
            chunk_size: config.stage(stage).chunk_size.max(1),
            worker_concurrency: config.worker_concurrency.max(1),
            channel_capacity: config.channel_capacity.max(1),
            max_reported_failures: config.max_reported_failures,
        }
    }
}

/// A reader, processor and writer run under a fault policy.
///
/// Items are read on a separate task, grouped into chunks, processed
/// concurrently within a chunk and written one chunk per commit. Retry and
/// skip accounting is applied in item order once a chunk has been
/// processed. Cancellation is checked between chunks.
pub struct Stage<R, P, W> {
    kind: StageKind,
    reader: R,
    processor: P,
    writer: W,
    policy: FaultPolicy,
    settings: StageSettings,
}

struct Attempted<T> {
    attempts: u32,
    result: EngineResult<T>,
}

async fn attempt<T, F, Fut>(policy: &FaultPolicy, mut operation: F) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match operation().await {
            Ok(value) => {
                return Attempted {
                    attempts,
                    result: Ok(value),
                };
            }
            Err(e) if policy.should_retry(&e, attempts) => {
                if !policy.backoff.is_zero() {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
            Err(e) => {
                return Attempted {
                    attempts,
                    result: Err(e),
                };
            }
        }
    }
}

impl<R, P, W> Stage<R, P, W>
where
    R: ItemReader,
    P: ItemProcessor<Input = R::Item>,
    W: ItemWriter<Item = P::Output>,
{
    /// Assembles a stage.
    pub fn new(
        kind: StageKind,
        reader: R,
        processor: P,
        writer: W,
        policy: FaultPolicy,
        settings: StageSettings,
    ) -> Self {
        Self {
            kind,
            reader,
            processor,
            writer,
            policy,
            settings,
        }
    }

    /// Runs the stage to completion, failure or cancellation.
    pub async fn run(self, ctx: &StageContext, cancel: &CancellationToken) -> StageExecution {
        let kind = self.kind;
        let mut execution = StageExecution::start(kind);
        info!(
            job_id = %ctx.job_id,
            tenant_id = %ctx.tenant_id,
            stage = %kind,
            chunk_size = self.settings.chunk_size,
            "Stage started"
        );

        let result = self.execute(ctx, cancel, &mut execution.stats).await;
        if let Err(e) = &result {
            if !matches!(e, EngineError::Cancelled) {
                error!(job_id = %ctx.job_id, stage = %kind, error = %e, "Stage failed");
            }
        }
        execution.finish(result);

        let stats = &execution.stats;
        info!(
            job_id = %ctx.job_id,
            stage = %kind,
            status = ?execution.status,
            read = stats.read_count,
            written = stats.write_count,
            skipped = stats.skip_count,
            filtered = stats.filter_count,
            retries = stats.retry_count,
            "Stage finished"
        );
        execution
    }

    async fn execute(
        self,
        ctx: &StageContext,
        cancel: &CancellationToken,
        stats: &mut StageStats,
    ) -> EngineResult<()> {
        let Stage {
            kind,
            mut reader,
            processor,
            writer,
            policy,
            settings,
        } = self;

        reader.open(ctx).await?;

        let (tx, mut rx) = mpsc::channel(settings.channel_capacity);
        let reader_task = tokio::spawn(async move {
            loop {
                match reader.read().await {
                    Ok(Some(item)) => {
                        if tx.send(Ok(item)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                }
            }
        });

        let runner = ChunkRunner {
            kind,
            processor: &processor,
            writer: &writer,
            policy: &policy,
            settings,
        };

        let result = async {
            let mut exhausted = false;
            while !exhausted {
                if cancel.is_cancelled() {
                    info!(job_id = %ctx.job_id, stage = %kind, "Stage cancelled");
                    return Err(EngineError::Cancelled);
                }

                let first_item = stats.read_count + 1;
                let mut chunk = Vec::with_capacity(settings.chunk_size);
                while chunk.len() < settings.chunk_size {
                    match rx.recv().await {
                        Some(Ok(item)) => {
                            stats.read_count += 1;
                            chunk.push(item);
                        }
                        Some(Err(e)) => return Err(e),
                        None => {
                            exhausted = true;
                            break;
                        }
                    }
                }
                if chunk.is_empty() {
                    break;
                }
                runner.run_chunk(&chunk, first_item, stats).await?;
            }
            Ok::<(), EngineError>(())
        }
        .await;

        reader_task.abort();
        result
    }
}

struct ChunkRunner<'a, P, W> {
    kind: StageKind,
    processor: &'a P,
    writer: &'a W,
    policy: &'a FaultPolicy,
    settings: StageSettings,
}

impl<P, W> ChunkRunner<'_, P, W>
where
    P: ItemProcessor,
    W: ItemWriter<Item = P::Output>,
{
    async fn run_chunk(
        &self,
        chunk: &[P::Input],
        first_item: usize,
        stats: &mut StageStats,
    ) -> EngineResult<()> {
        let processor = self.processor;
        let policy = self.policy;
        // Boxed so the chunk future stays `Send` inside `tokio::spawn`.
        let outcomes: Vec<Attempted<Option<P::Output>>> = stream::iter(chunk)
            .map(|item| attempt(policy, move || processor.process(item)))
            .buffered(self.settings.worker_concurrency)
            .collect::<Vec<_>>()
            .boxed()
            .await;

        let mut outputs = Vec::with_capacity(outcomes.len());
        for (offset, outcome) in outcomes.into_iter().enumerate() {
            let item = first_item + offset;
            stats.retry_count += (outcome.attempts - 1) as usize;
            match outcome.result {
                Ok(Some(output)) => outputs.push(output),
                Ok(None) => stats.filter_count += 1,
                Err(e) => self.skip_or_fail(e, Some(item), 1, outcome.attempts, stats)?,
            }
        }

        if outputs.is_empty() {
            debug!(stage = %self.kind, first_item, "Chunk produced nothing to write");
            return Ok(());
        }

        let writer = self.writer;
        let outputs = &outputs;
        let written = attempt(policy, move || writer.write(outputs)).await;
        stats.retry_count += (written.attempts - 1) as usize;
        match written.result {
            Ok(report) => {
                stats.write_count += report.written;
                stats.new_count += report.new;
                stats.existing_count += report.existing;
                stats.commit_count += 1;
                debug!(
                    stage = %self.kind,
                    first_item,
                    written = report.written,
                    new = report.new,
                    existing = report.existing,
                    "Chunk committed"
                );
                Ok(())
            }
            Err(e) => self.skip_or_fail(e, None, outputs.len(), written.attempts, stats),
        }
    }

    fn skip_or_fail(
        &self,
        error: EngineError,
        item: Option<usize>,
        count: usize,
        attempts: u32,
        stats: &mut StageStats,
    ) -> EngineResult<()> {
        let skipped = self.policy.can_skip_many(&error, stats.skip_count, count);
        stats.record_failure(
            FailureRecord {
                item,
                class: error.class(),
                message: error.to_string(),
                attempts,
                skipped,
            },
            self.settings.max_reported_failures,
        );

        if !skipped {
            return Err(error);
        }
        stats.skip_count += count;
        warn!(
            stage = %self.kind,
            item = ?item,
            skipped = count,
            skip_count = stats.skip_count,
            attempts,
            error = %error,
            "Skipping failed items"
        );
        Ok(())
    }
}
