pub mod events;
pub mod preprocess;

pub use events::{process_match_data, GameInfo};
pub use preprocess::{preprocess_events, ClubDirectory};
