pub mod config;
pub mod search;

pub use config::Config;
pub use search::{SearchQuery, SearchReport, SearchService};
