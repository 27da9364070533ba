use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::domain::{FileFilter, LiteralMatcher, ResultSet, SearchError, TreeWalker, WalkStats};
use crate::infrastructure::{ErrorLogger, LoggerTrait};

/// 一次搜索请求，创建时完成校验
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    root_directory: PathBuf,
    search_text: String,
}

impl SearchQuery {
    /// 输入会去除首尾空白，空的目录或搜索文本直接报错，不访问文件系统
    pub fn new(root_directory: &str, search_text: &str) -> Result<Self, SearchError> {
        let root_directory = root_directory.trim();
        let search_text = Self::check_text(search_text)?;

        if root_directory.is_empty() {
            return Err(SearchError::MissingDirectory);
        }

        Ok(Self {
            root_directory: PathBuf::from(root_directory),
            search_text: search_text.to_string(),
        })
    }

    /// 只校验搜索文本，返回去除空白后的文本
    pub fn check_text(search_text: &str) -> Result<&str, SearchError> {
        let search_text = search_text.trim();
        if search_text.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        Ok(search_text)
    }

    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }
}

/// 搜索结果与统计
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub results: ResultSet,
    pub stats: WalkStats,
    pub elapsed: Duration,
    /// 本次搜索使用的匹配器，供高亮和编辑器定位复用
    pub matcher: LiteralMatcher,
}

/// 搜索服务：校验、构建匹配器、遍历目录
pub struct SearchService<'a> {
    filter: FileFilter,
    respect_gitignore: bool,
    show_progress: bool,
    logger: &'a dyn LoggerTrait,
    errors: &'a ErrorLogger,
}

impl<'a> SearchService<'a> {
    pub fn new(logger: &'a dyn LoggerTrait, errors: &'a ErrorLogger) -> Self {
        Self {
            filter: FileFilter::default(),
            respect_gitignore: false,
            show_progress: false,
            logger,
            errors,
        }
    }

    pub fn filter(mut self, filter: FileFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn respect_gitignore(mut self, yes: bool) -> Self {
        self.respect_gitignore = yes;
        self
    }

    pub fn show_progress(mut self, yes: bool) -> Self {
        self.show_progress = yes;
        self
    }

    /// 执行一次完整搜索，每次调用返回全新的结果集
    pub fn search(&self, query: &SearchQuery) -> Result<SearchReport, SearchError> {
        let matcher = LiteralMatcher::new(query.search_text())?;

        if self.logger.is_enabled() {
            let _ = self.logger.log_message(&format!("搜索文本: {}", query.search_text()));
            let _ = self
                .logger
                .log_message(&format!("目标目录: {}", query.root_directory().display()));
            let _ = self
                .logger
                .log_message(&format!("遵循 .gitignore 规则: {}", self.respect_gitignore));
        }

        let mut walker = TreeWalker::new(self.logger, self.errors)
            .filter(self.filter.clone())
            .respect_gitignore(self.respect_gitignore);
        if self.show_progress {
            walker = walker.with_spinner();
        }

        let start_time = Instant::now();
        let report = walker.walk(query.root_directory(), &matcher)?;
        let elapsed = start_time.elapsed();

        if self.logger.is_enabled() {
            let _ = self.logger.finalize(
                report.stats.files_scanned,
                report.results.matched_files() as u64,
                report.results.len() as u64,
                elapsed,
            );
        }

        Ok(SearchReport {
            results: report.results,
            stats: report.stats,
            elapsed,
            matcher,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MatchRecord;
    use crate::infrastructure::Logger;
    use std::fs;
    use tempfile::tempdir;

    fn search(root: &Path, text: &str) -> Result<SearchReport, SearchError> {
        let logger = Logger::disabled();
        let errors = ErrorLogger::disabled();
        let query = SearchQuery::new(&root.to_string_lossy(), text)?;
        SearchService::new(&logger, &errors).search(&query)
    }

    fn path_of(root: &Path, name: &str) -> String {
        std::path::absolute(root.join(name))
            .unwrap()
            .to_string_lossy()
            .to_string()
    }

    #[test]
    fn test_query_trims_input() {
        let query = SearchQuery::new("  /notes  ", "  hello  ").unwrap();
        assert_eq!(query.root_directory(), Path::new("/notes"));
        assert_eq!(query.search_text(), "hello");
    }

    #[test]
    fn test_single_match() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "# Title\nhello WORLD\nbye\n").unwrap();

        let report = search(dir.path(), "world").unwrap();
        assert_eq!(
            report.results.records(),
            &[MatchRecord::new(path_of(dir.path(), "a.md"), 2, "hello WORLD")]
        );
    }

    #[test]
    fn test_results_ordered_across_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.md"), "find me\nfind me again\n").unwrap();
        fs::write(dir.path().join("a.md"), "find me too\n").unwrap();

        let report = search(dir.path(), "find me").unwrap();
        let a = path_of(dir.path(), "a.md");
        let b = path_of(dir.path(), "b.md");
        assert_eq!(
            report.results.records(),
            &[
                MatchRecord::new(a, 1, "find me too"),
                MatchRecord::new(b.clone(), 1, "find me"),
                MatchRecord::new(b, 2, "find me again"),
            ]
        );
        assert_eq!(report.results.matched_files(), 2);
        assert_eq!(report.stats.files_scanned, 2);
    }

    #[test]
    fn test_missing_root_is_distinct_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let err = search(&missing, "anything").unwrap_err();
        assert!(matches!(err, SearchError::RootNotFound(_)));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_empty_text_fails_before_filesystem_access() {
        // 目录不存在也应先报告校验错误
        let err = SearchQuery::new("/definitely/not/here", "   ").unwrap_err();
        assert!(matches!(err, SearchError::EmptyQuery));
        assert!(err.is_validation());

        let err = SearchQuery::new("", "text").unwrap_err();
        assert!(matches!(err, SearchError::MissingDirectory));
    }

    #[test]
    fn test_check_text_without_directory() {
        assert!(matches!(SearchQuery::check_text(" \t "), Err(SearchError::EmptyQuery)));
        assert_eq!(SearchQuery::check_text("  todo ").unwrap(), "todo");
    }

    #[test]
    fn test_no_markdown_files_yields_empty_result() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("readme.txt"), "needle\n").unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();

        let report = search(dir.path(), "needle").unwrap();
        assert!(report.results.is_empty());
    }

    #[test]
    fn test_each_search_returns_fresh_results() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "alpha\nbeta\n").unwrap();

        let first = search(dir.path(), "alpha").unwrap();
        let second = search(dir.path(), "beta").unwrap();

        assert_eq!(first.results.len(), 1);
        assert_eq!(first.results.get(0).unwrap().line_text, "alpha");
        assert_eq!(second.results.len(), 1);
        assert_eq!(second.results.get(0).unwrap().line_text, "beta");
        assert_eq!(second.matcher.query(), "beta");
    }

    #[test]
    fn test_search_logs_when_enabled() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "needle\n").unwrap();
        let log_path = dir.path().join("debug.log");

        let logger = Logger::with_path(log_path.clone()).unwrap();
        let errors = ErrorLogger::disabled();
        let query = SearchQuery::new(&dir.path().to_string_lossy(), "needle").unwrap();
        let report = SearchService::new(&logger, &errors).search(&query).unwrap();
        assert_eq!(report.results.len(), 1);

        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("搜索文本: needle"));
        assert!(content.contains("# 匹配行总数: 1"));
    }
}
