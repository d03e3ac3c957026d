pub mod algorithm;
pub mod config;

pub use algorithm::{form_batches, group_captures, CaptureBatch};
pub use config::BatchingConfig;
