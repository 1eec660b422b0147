//! Grant opportunity wrangling: map heterogeneous exports onto one canonical
//! schema, normalize money and dates, score, deduplicate and order.

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod types;

pub use config::PipelineConfig;
pub use error::{Result, WranglerError};
pub use pipeline::pipeline::{OutputTargets, Pipeline, PipelineResult};
pub use types::{CanonicalField, CanonicalRecord, MappedRow};
