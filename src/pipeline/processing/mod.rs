// Pipeline processing: header mapping, value normalization, scoring, dedup and ordering

pub mod dedup;
pub mod filter;
pub mod mapper;
pub mod normalize;
pub mod program;
pub mod scoring;
