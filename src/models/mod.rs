// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod chunk;
pub mod evidence;
pub mod record;

pub use chunk::RawChunk;
pub use evidence::ValidatedEvidence;
pub use record::{Header, RawRecord};
