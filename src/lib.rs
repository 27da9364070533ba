// 三层架构模块
pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

// 重新导出主要类型
pub use domain::{aggregate, LiteralMatcher, MatchRecord, ResultSet, SearchError};
pub use application::{Config, SearchQuery, SearchReport, SearchService};
pub use infrastructure::{EditorLauncher, ErrorLogger, ErrorType, Logger, LoggerTrait};
pub use presentation::{print_results, SearchSummary, TableOptions};
