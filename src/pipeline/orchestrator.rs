// file: src/pipeline/orchestrator.rs
// description: wires reader, parser, validator, tracker and writer into one cancellable run
// reference: orchestrates the asynchronous ingestion workflow

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result, RunFailure};
use crate::parser::RecordParser;
use crate::pipeline::{ProgressObserver, ProgressTracker, RunSummary};
use crate::sink::{BatchWriter, Sink};
use crate::source::{ChunkReader, Source};
use crate::validator::EvidenceValidator;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

/// One ingestion run over one source.
///
/// Stages run cooperatively on a single task: a record is validated, tracked
/// and handed to the writer before the next one is parsed, so a slow sink
/// stalls reading instead of growing buffers.
pub struct Pipeline {
    run_id: Uuid,
    parser: RecordParser,
    validator: EvidenceValidator,
    tracker: ProgressTracker,
    writer: BatchWriter,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn Source>,
        sink: Arc<dyn Sink>,
        config: &PipelineConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        config.validate()?;

        let reader = ChunkReader::new(source, config.chunk_size);
        let parser = RecordParser::new(
            reader,
            config.line_delimiter_byte(),
            config.field_delimiter,
        );
        let writer = BatchWriter::from_config(sink, config, cancel.clone());

        Ok(Self {
            run_id: Uuid::new_v4(),
            parser,
            validator: EvidenceValidator::new(),
            tracker: ProgressTracker::new(config.progress_interval),
            writer,
            cancel,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.tracker.register(observer);
        self
    }

    /// Use a caller-chosen id, e.g. one already stamped onto the sink's rows.
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Drive the run to completion, failure or cancellation.
    ///
    /// On failure the returned [`RunFailure`] carries the counters at the
    /// time of the abort; batches committed before it stay committed.
    pub async fn run(self) -> std::result::Result<RunSummary, RunFailure> {
        let span = info_span!(
            "pipeline",
            run_id = %self.run_id,
            input = %self.parser.describe()
        );
        self.execute().instrument(span).await
    }

    async fn execute(mut self) -> std::result::Result<RunSummary, RunFailure> {
        let start_time = Instant::now();
        info!(
            "Starting ingestion from {} into {} sink",
            self.parser.describe(),
            self.writer.sink_name()
        );

        let outcome = self.drive().await;
        if outcome.is_err() {
            self.writer.abandon();
        }
        self.parser.close().await;

        let summary = self.writer.stats().summary(start_time.elapsed());
        self.tracker.complete(&summary);

        match outcome {
            Ok(()) => {
                self.log_final_stats(&summary);
                Ok(summary)
            }
            Err(PipelineError::Cancelled) => {
                warn!(
                    "Run cancelled after {} records ({} committed)",
                    summary.total_processed,
                    summary.total_committed + summary.total_invalid
                );
                Err(RunFailure::new(PipelineError::Cancelled, summary))
            }
            Err(e) => {
                error!("Run aborted ({} tier): {}", e.tier(), e);
                Err(RunFailure::new(e, summary))
            }
        }
    }

    async fn drive(&mut self) -> Result<()> {
        let cancel = self.cancel.clone();

        loop {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                record = self.parser.next_record() => record?,
            };
            let Some(record) = next else {
                break;
            };

            let evidence = self.validator.validate(&record);
            let evidence = self.tracker.track(evidence);
            self.writer.push(evidence).await?;
        }

        self.writer.flush().await
    }

    fn log_final_stats(&self, summary: &RunSummary) {
        info!("=== Pipeline Execution Summary ===");
        info!("Input: {}", self.parser.describe());
        info!("Duration: {:.2} seconds", summary.duration.as_secs_f64());
        info!("Bytes read: {}", self.parser.bytes_read());
        info!("Records processed: {}", summary.total_processed);
        info!("Committed (valid): {}", summary.total_committed);
        info!("Committed (invalid): {}", summary.total_invalid);
        info!("Batches committed: {}", summary.batches_committed);
        info!("Commit retries: {}", summary.retries);
        info!(
            "Processing speed: {:.2} records/sec",
            summary.records_per_second()
        );
        info!("=================================");
    }
}
