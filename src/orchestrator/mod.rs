pub mod controller;
mod dispatch;
pub mod events;
pub mod ticker;

pub use controller::{BatchOrchestrator, OrchestratorConfig, OrchestratorHandle, PassReport};
pub use events::BatchStatusChanged;
pub use ticker::Ticker;
