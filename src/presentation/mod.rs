pub mod display;

pub use display::{format_duration, print_results, SearchSummary, TableOptions};
