mod batches;
mod day;
pub mod error;
mod handle;
mod runner;
mod single;
pub mod summary;

pub use error::ReprocessError;
pub use single::ReprocessReceiver;
pub use summary::{BatchRun, ReprocessSummary};
