pub mod cache;
pub mod history;
pub mod options;
pub mod ranking;
pub mod sessions;
pub mod stats;

pub use cache::SuggestionCache;
pub use history::{FieldScores, HistoryAggregator};
pub use options::OptionSource;
pub use ranking::RankingEngine;
pub use sessions::SessionClock;
