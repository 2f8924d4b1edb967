// file: src/database/schema.rs
// description: LanceDB schema management for evidence storage
// reference: https://docs.rs/lancedb

use crate::database::client::LanceDbClient;
use crate::error::{PipelineError, Result};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;
use tracing::{info, warn};

pub struct SchemaManager<'a> {
    client: &'a LanceDbClient,
}

impl<'a> SchemaManager<'a> {
    pub fn new(client: &'a LanceDbClient) -> Self {
        Self { client }
    }

    /// Create the evidence table if it does not exist yet.
    pub async fn initialize(&self) -> Result<()> {
        let table_name = self.client.table_name();

        if self.client.table_exists(table_name).await? {
            info!("Evidence table '{}' already exists", table_name);
            return Ok(());
        }

        info!("Creating evidence table '{}'", table_name);
        self.client
            .get_connection()
            .create_empty_table(table_name, Self::evidence_schema())
            .execute()
            .await
            .map_err(|e| {
                PipelineError::Database(format!("Failed to create table {}: {}", table_name, e))
            })?;
        Ok(())
    }

    /// True when the table exists and carries every evidence column.
    pub async fn verify_schema(&self) -> Result<bool> {
        let table_name = self.client.table_name();

        if !self.client.table_exists(table_name).await? {
            warn!("Table '{}' does not exist", table_name);
            return Ok(false);
        }

        let table = self.client.get_table(table_name).await?;
        let actual = table.schema().await.map_err(|e| {
            PipelineError::Database(format!("Failed to read schema of {}: {}", table_name, e))
        })?;

        let missing: Vec<String> = Self::evidence_schema()
            .fields()
            .iter()
            .filter(|expected| {
                actual
                    .field_with_name(expected.name())
                    .map(|field| field.data_type() != expected.data_type())
                    .unwrap_or(true)
            })
            .map(|field| field.name().clone())
            .collect();

        if !missing.is_empty() {
            warn!(
                "Table '{}' is missing or mistypes columns: {}",
                table_name,
                missing.join(", ")
            );
            return Ok(false);
        }

        info!("Table '{}' matches the evidence schema", table_name);
        Ok(true)
    }

    pub fn evidence_schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("fingerprint", DataType::Utf8, false),
            Field::new("control_id", DataType::Utf8, false),
            Field::new("resource_id", DataType::Utf8, false),
            Field::new(
                "collected_at",
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
                false,
            ),
            Field::new("collected_at_raw", DataType::Utf8, false),
            // JSON object text
            Field::new("payload", DataType::Utf8, false),
            Field::new("valid", DataType::Boolean, false),
            // JSON array of messages
            Field::new("errors", DataType::Utf8, false),
            Field::new("line_number", DataType::UInt64, false),
            Field::new("run_id", DataType::Utf8, false),
        ]))
    }

    pub async fn drop_all_tables(&self) -> Result<()> {
        warn!("Dropping evidence table from LanceDB");

        let table_name = self.client.table_name();

        if self.client.table_exists(table_name).await? {
            self.client
                .get_connection()
                .drop_table(table_name)
                .await
                .map_err(|e| {
                    PipelineError::Database(format!("Failed to drop table {}: {}", table_name, e))
                })?;
            info!("Dropped table: {}", table_name);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use tempfile::TempDir;

    #[test]
    fn test_schema_generation() {
        let schema = SchemaManager::evidence_schema();
        assert_eq!(schema.fields().len(), 10);

        let collected_at = schema.field_with_name("collected_at").unwrap();
        assert!(matches!(
            collected_at.data_type(),
            DataType::Timestamp(TimeUnit::Microsecond, Some(tz)) if tz.as_ref() == "UTC"
        ));
        assert!(schema.field_with_name("fingerprint").is_ok());
    }

    #[tokio::test]
    async fn test_initialize_verify_and_drop() {
        let dir = TempDir::new().unwrap();
        let client = LanceDbClient::new(DatabaseConfig {
            uri: dir.path().to_string_lossy().to_string(),
            table_name: "evidence".to_string(),
        })
        .await
        .unwrap();
        let manager = SchemaManager::new(&client);

        assert!(!manager.verify_schema().await.unwrap());
        manager.initialize().await.unwrap();
        manager.initialize().await.unwrap();
        assert!(manager.verify_schema().await.unwrap());

        manager.drop_all_tables().await.unwrap();
        assert!(!client.table_exists("evidence").await.unwrap());
    }
}
