pub mod record;

pub use record::{DetectionRecord, Location};
