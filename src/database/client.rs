// file: src/database/client.rs
// description: LanceDB client wrapper with connection management
// reference: https://docs.rs/lancedb

use crate::config::DatabaseConfig;
use crate::error::{PipelineError, Result};
use lancedb::{Connection, Table, connect};
use tracing::{debug, info};

#[derive(Clone)]
pub struct LanceDbClient {
    connection: Connection,
    config: DatabaseConfig,
}

impl LanceDbClient {
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        info!("Connecting to LanceDB at {}", config.uri);

        let connection = connect(&config.uri)
            .execute()
            .await
            .map_err(|e| PipelineError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        Ok(Self { connection, config })
    }

    pub fn get_connection(&self) -> &Connection {
        &self.connection
    }

    pub async fn ping(&self) -> Result<bool> {
        debug!("Checking LanceDB connection");

        // Listing tables is the cheapest round trip the store offers
        match self.connection.table_names().execute().await {
            Ok(_) => {
                info!("LanceDB connection successful");
                Ok(true)
            }
            Err(e) => Err(PipelineError::Database(format!(
                "LanceDB connection failed: {}",
                e
            ))),
        }
    }

    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| PipelineError::Database(format!("Failed to list tables: {}", e)))?;

        Ok(table_names.iter().any(|name| name == table_name))
    }

    pub async fn get_table(&self, table_name: &str) -> Result<Table> {
        self.connection
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| {
                PipelineError::Database(format!("Failed to open table {}: {}", table_name, e))
            })
    }

    /// Rows in the evidence table, or 0 when it has not been created yet.
    pub async fn evidence_count(&self) -> Result<u64> {
        if !self.table_exists(&self.config.table_name).await? {
            return Ok(0);
        }

        let table = self.get_table(&self.config.table_name).await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| PipelineError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Rows in the evidence table that failed validation.
    pub async fn invalid_count(&self) -> Result<u64> {
        if !self.table_exists(&self.config.table_name).await? {
            return Ok(0);
        }

        let table = self.get_table(&self.config.table_name).await?;
        let count = table
            .count_rows(Some("valid = false".to_string()))
            .await
            .map_err(|e| PipelineError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    pub fn uri(&self) -> &str {
        &self.config.uri
    }

    pub fn table_name(&self) -> &str {
        &self.config.table_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> DatabaseConfig {
        DatabaseConfig {
            uri: dir.path().join("lancedb").to_string_lossy().to_string(),
            table_name: "evidence_test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fresh_database_has_no_evidence() {
        let dir = TempDir::new().unwrap();
        let client = LanceDbClient::new(config(&dir)).await.unwrap();

        assert!(client.ping().await.unwrap());
        assert!(!client.table_exists("evidence_test").await.unwrap());
        assert_eq!(client.evidence_count().await.unwrap(), 0);
        assert_eq!(client.invalid_count().await.unwrap(), 0);
        assert_eq!(client.table_name(), "evidence_test");
    }
}
