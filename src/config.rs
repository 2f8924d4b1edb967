// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{PipelineError, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Run options for a single pipeline instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_base_retry_delay_ms")]
    pub base_retry_delay_ms: u64,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
    #[serde(default = "default_line_delimiter")]
    pub line_delimiter: char,
    #[serde(default = "default_field_delimiter")]
    pub field_delimiter: char,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub commit_timeout_ms: Option<u64>,
    #[serde(default = "default_parallel_workers")]
    pub parallel_workers: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

fn default_batch_size() -> usize {
    100
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_base_retry_delay_ms() -> u64 {
    1000
}

fn default_progress_interval() -> u64 {
    1000
}

fn default_line_delimiter() -> char {
    '\n'
}

fn default_field_delimiter() -> char {
    ','
}

fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_parallel_workers() -> usize {
    4
}

fn default_uri() -> String {
    "data/lancedb".to_string()
}

fn default_table_name() -> String {
    "evidence".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_retry_attempts: default_max_retry_attempts(),
            base_retry_delay_ms: default_base_retry_delay_ms(),
            progress_interval: default_progress_interval(),
            line_delimiter: default_line_delimiter(),
            field_delimiter: default_field_delimiter(),
            chunk_size: default_chunk_size(),
            commit_timeout_ms: None,
            parallel_workers: default_parallel_workers(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            table_name: default_table_name(),
        }
    }
}

impl PipelineConfig {
    pub fn base_retry_delay(&self) -> Duration {
        Duration::from_millis(self.base_retry_delay_ms)
    }

    pub fn commit_timeout(&self) -> Option<Duration> {
        self.commit_timeout_ms.map(Duration::from_millis)
    }

    /// Delimiters are matched as single bytes, so both must be ASCII.
    pub fn line_delimiter_byte(&self) -> u8 {
        self.line_delimiter as u8
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(PipelineError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.chunk_size == 0 {
            return Err(PipelineError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.progress_interval == 0 {
            return Err(PipelineError::Config(
                "progress_interval must be greater than 0".to_string(),
            ));
        }

        if self.parallel_workers == 0 {
            return Err(PipelineError::Config(
                "parallel_workers must be greater than 0".to_string(),
            ));
        }

        if !self.line_delimiter.is_ascii() || !self.field_delimiter.is_ascii() {
            return Err(PipelineError::Config(
                "line_delimiter and field_delimiter must be ASCII characters".to_string(),
            ));
        }

        if self.line_delimiter == self.field_delimiter {
            return Err(PipelineError::Config(format!(
                "line_delimiter and field_delimiter must differ (both {:?})",
                self.line_delimiter
            )));
        }

        Ok(())
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(
                config::File::from(Path::new("config/default.toml")).required(false),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix("EVIDENCE_INGEST")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            database: DatabaseConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;

        if self.database.table_name.trim().is_empty() {
            return Err(PipelineError::Config(
                "table_name must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
