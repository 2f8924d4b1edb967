// file: src/database/sink.rs
// description: LanceDB-backed sink upserting evidence batches by fingerprint
// reference: https://docs.rs/lancedb

use crate::database::client::LanceDbClient;
use crate::database::schema::SchemaManager;
use crate::error::{PipelineError, Result};
use crate::models::ValidatedEvidence;
use crate::sink::{CommitResult, Sink};
use arrow_array::{
    BooleanArray, RecordBatch, RecordBatchIterator, StringArray, TimestampMicrosecondArray,
    UInt64Array,
};
use arrow_schema::Schema;
use async_trait::async_trait;
use lancedb::Table;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct LanceDbSink {
    table: Table,
    schema: Arc<Schema>,
    run_id: String,
}

impl LanceDbSink {
    /// Open (creating if needed) the configured evidence table.
    pub async fn open(client: &LanceDbClient, run_id: impl Into<String>) -> Result<Self> {
        SchemaManager::new(client).initialize().await?;
        let table = client.get_table(client.table_name()).await?;

        info!("LanceDB sink ready on table '{}'", client.table_name());
        Ok(Self {
            table,
            schema: SchemaManager::evidence_schema(),
            run_id: run_id.into(),
        })
    }

    async fn upsert(&self, batch: RecordBatch) -> std::result::Result<(), lancedb::Error> {
        let reader = RecordBatchIterator::new(vec![Ok(batch)], self.schema.clone());

        let mut merge = self.table.merge_insert(&["fingerprint"]);
        merge
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        merge.execute(Box::new(reader)).await?;
        Ok(())
    }
}

#[async_trait]
impl Sink for LanceDbSink {
    async fn commit_batch(&self, records: &[ValidatedEvidence]) -> CommitResult {
        let batch = match create_record_batch(self.schema.clone(), records, &self.run_id) {
            Ok(batch) => batch,
            Err(e) => return CommitResult::fatal(e.to_string()),
        };

        let rows = batch.num_rows();
        match self.upsert(batch).await {
            Ok(()) => {
                debug!("Upserted {} evidence rows", rows);
                CommitResult::Success
            }
            Err(e) => CommitResult::retryable(format!("LanceDB merge insert failed: {}", e)),
        }
    }

    fn name(&self) -> &str {
        "lancedb"
    }
}

/// Build one Arrow batch from evidence.
///
/// A fingerprint repeated within the batch keeps only its last occurrence,
/// since a merge cannot match one target row against two source rows.
pub(crate) fn create_record_batch(
    schema: Arc<Schema>,
    records: &[ValidatedEvidence],
    run_id: &str,
) -> Result<RecordBatch> {
    let mut last_seen: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        last_seen.insert(record.fingerprint(), index);
    }
    let rows: Vec<&ValidatedEvidence> = records
        .iter()
        .enumerate()
        .filter(|(index, record)| last_seen.get(record.fingerprint()) == Some(index))
        .map(|(_, record)| record)
        .collect();

    let fingerprints: StringArray = rows.iter().map(|r| Some(r.fingerprint())).collect();
    let control_ids: StringArray = rows.iter().map(|r| Some(r.control_id())).collect();
    let resource_ids: StringArray = rows.iter().map(|r| Some(r.resource_id())).collect();

    let collected_at = TimestampMicrosecondArray::from(
        rows.iter()
            .map(|r| r.collected_at().timestamp_micros())
            .collect::<Vec<i64>>(),
    )
    .with_timezone("UTC");

    let collected_at_raw: StringArray = rows.iter().map(|r| Some(r.collected_at_raw())).collect();

    let payloads = rows
        .iter()
        .map(|r| serde_json::to_string(r.payload()).map(Some))
        .collect::<std::result::Result<StringArray, _>>()
        .map_err(|e| PipelineError::Serialization(format!("payload: {}", e)))?;

    let valid: BooleanArray = rows.iter().map(|r| Some(r.is_valid())).collect();

    let errors = rows
        .iter()
        .map(|r| serde_json::to_string(r.errors()).map(Some))
        .collect::<std::result::Result<StringArray, _>>()
        .map_err(|e| PipelineError::Serialization(format!("errors: {}", e)))?;

    let line_numbers: UInt64Array = rows.iter().map(|r| Some(r.line_number())).collect();
    let run_ids: StringArray = rows.iter().map(|_| Some(run_id)).collect();

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(fingerprints),
            Arc::new(control_ids),
            Arc::new(resource_ids),
            Arc::new(collected_at),
            Arc::new(collected_at_raw),
            Arc::new(payloads),
            Arc::new(valid),
            Arc::new(errors),
            Arc::new(line_numbers),
            Arc::new(run_ids),
        ],
    )
    .map_err(|e| PipelineError::Database(format!("Failed to create record batch: {}", e)))
}
