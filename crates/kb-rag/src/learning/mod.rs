//! Learning data collection and the offline fine-tuning trigger

pub mod collector;
pub mod fine_tune;

pub use collector::LearningDataCollector;
pub use fine_tune::{FineTuneJob, FineTuneOutcome};
