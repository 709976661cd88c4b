pub mod config;
pub mod error;
pub mod types;

pub use config::{results_dir_from_env, Config, WikiConfig};
pub use error::ProspectError;
pub use types::*;
