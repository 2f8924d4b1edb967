// file: src/database/mod.rs
// description: database operations module exports
// reference: internal module structure

pub mod client;
pub mod schema;
pub mod sink;

pub use client::LanceDbClient;
pub use schema::SchemaManager;
pub use sink::LanceDbSink;
