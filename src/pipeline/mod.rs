// Grant pipeline: ingestion, processing, and storage

pub mod ingestion;
pub mod pipeline;
pub mod processing;
pub mod storage;
