pub mod anonymizer;
pub mod chairman;
pub mod events;
pub mod pipeline;
pub mod ranking;
pub mod review;
pub mod types;

pub use events::{NoProgress, ProgressNotifier};
pub use pipeline::{Pipeline, RunFailure};
pub use ranking::AggregateRank;
pub use types::{CouncilRun, Response, Stage};
