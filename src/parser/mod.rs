// file: src/parser/mod.rs
// description: line reassembly and record parsing module exports
// reference: internal module structure

pub mod lines;
pub mod records;

pub use lines::LineSplitter;
pub use records::RecordParser;
