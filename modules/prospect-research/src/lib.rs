pub mod case_studies;
pub mod dates;
pub mod export;
pub mod extract;
pub mod generator;
pub mod matcher;
pub mod names;
pub mod pipeline;
pub mod research;
pub mod store;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use pipeline::{Pipeline, PipelineError, PipelineSettings};
pub use store::ResultStore;
