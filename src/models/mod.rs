pub mod search;
pub mod track;

pub use search::SearchParams;
pub use track::{SearchResponse, TrackResult, UNKNOWN_ARTIST};
