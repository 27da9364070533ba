pub mod aggregate;
pub mod error;
pub mod file_walker;
pub mod matcher;
pub mod scanner;

pub use aggregate::{aggregate, DisplayRow, MatchRecord, ResultSet};
pub use error::SearchError;
pub use file_walker::{is_markdown_file, FileFilter, TreeWalker, WalkReport, WalkStats};
pub use matcher::{count_occurrences, find_start, matches, LiteralMatcher};
pub use scanner::{scan_file, scan_reader, ScanOutcome};
