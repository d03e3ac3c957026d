pub mod batch;
pub mod capture;
pub mod observation;
pub mod timeline_card;

pub use batch::{BatchRecord, BatchStatus};
pub use capture::Capture;
pub use observation::Observation;
pub use timeline_card::TimelineCard;
