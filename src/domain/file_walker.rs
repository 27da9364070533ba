use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use ignore::{DirEntry, WalkBuilder};
use indicatif::{ProgressBar, ProgressStyle};

use super::aggregate::{aggregate, ResultSet};
use super::error::SearchError;
use super::matcher::LiteralMatcher;
use super::scanner::scan_file;
use crate::infrastructure::{ErrorLogger, ErrorType, LoggerTrait};

/// 文件筛选条件
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub excluded_dirs: HashSet<String>,
    pub excluded_paths: HashSet<String>,
}

impl FileFilter {
    /// 创建新的文件过滤器
    pub fn new(
        min_size: Option<u64>,
        max_size: Option<u64>,
        excluded_dirs: Vec<String>,
        excluded_paths: Vec<String>,
    ) -> Self {
        Self {
            min_size,
            max_size,
            excluded_dirs: excluded_dirs.into_iter().collect(),
            excluded_paths: excluded_paths.into_iter().collect(),
        }
    }

    /// 检查文件是否符合大小要求
    pub fn matches_size(&self, size: u64) -> bool {
        let min_ok = self.min_size.map_or(true, |min| size >= min);
        let max_ok = self.max_size.map_or(true, |max| size <= max);
        min_ok && max_ok
    }

    /// 检查路径是否被排除
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        let normalized = path.to_string_lossy().replace('\\', "/");
        let normalized_path = Path::new(&normalized);

        // 按完整的路径组件比较，notes.md 不会排除 mynotes.md
        for excluded_path in &self.excluded_paths {
            let normalized_excluded = excluded_path.replace('\\', "/");
            if normalized_path.ends_with(Path::new(&normalized_excluded)) {
                return true;
            }
        }

        path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .map_or(false, |name| self.excluded_dirs.contains(name))
        })
    }
}

/// 文件名是否以 `.md` 结尾（不区分大小写）
pub fn is_markdown_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase().ends_with(".md"))
        .unwrap_or(false)
}

/// 一次遍历的统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// 扫描过的 Markdown 文件数
    pub files_scanned: u64,
    /// 读取中途失败的文件数
    pub files_failed: u64,
    /// 被过滤条件跳过的 Markdown 文件数
    pub files_filtered: u64,
    /// 无法进入的目录或条目数
    pub entries_skipped: u64,
}

/// 遍历结果
#[derive(Debug, Clone, Default)]
pub struct WalkReport {
    pub results: ResultSet,
    pub stats: WalkStats,
}

/// 目录树遍历器
///
/// 单线程、同步执行，每个文件打开、读完、关闭之后才访问下一个。
pub struct TreeWalker<'a> {
    filter: FileFilter,
    respect_gitignore: bool,
    logger: &'a dyn LoggerTrait,
    errors: &'a ErrorLogger,
    progress: ProgressBar,
}

impl<'a> TreeWalker<'a> {
    pub fn new(logger: &'a dyn LoggerTrait, errors: &'a ErrorLogger) -> Self {
        Self {
            filter: FileFilter::default(),
            respect_gitignore: false,
            logger,
            errors,
            progress: ProgressBar::hidden(),
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

    /// 在终端显示进度
    pub fn with_spinner(mut self) -> Self {
        let progress = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            progress.set_style(style);
        }
        progress.enable_steady_tick(Duration::from_millis(100));
        progress.set_message("已处理 0 文件");
        self.progress = progress;
        self
    }

    /// 递归搜索根目录下的所有 Markdown 文件
    pub fn walk(&self, root: &Path, matcher: &LiteralMatcher) -> Result<WalkReport, SearchError> {
        if !root.is_dir() {
            return Err(SearchError::RootNotFound(root.to_path_buf()));
        }

        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());

        if self.logger.is_enabled() {
            let _ = self.logger.log_message(&format!("开始扫描目录: {}", root.display()));
        }

        let mut builder = WalkBuilder::new(&root);
        builder
            .hidden(false)
            .ignore(false)
            .parents(self.respect_gitignore)
            .follow_links(false)
            .git_global(self.respect_gitignore)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore);

        let mut records = Vec::new();
        let mut stats = WalkStats::default();

        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    stats.entries_skipped += 1;
                    self.report_skipped(&err);
                    continue;
                }
            };

            let file_type = match entry.file_type() {
                Some(file_type) => file_type,
                None => continue,
            };
            if !(file_type.is_file() || file_type.is_symlink()) {
                continue;
            }

            if !is_markdown_file(entry.path()) {
                continue;
            }

            let size = if file_type.is_symlink() {
                // 只读取指向普通文件的链接，目录链接不展开
                match std::fs::metadata(entry.path()) {
                    Ok(meta) if meta.is_file() => meta.len(),
                    Ok(_) => continue,
                    // 失效的链接交给 scan_file 记录读取错误
                    Err(_) => 0,
                }
            } else {
                entry.metadata().map(|m| m.len()).unwrap_or(0)
            };

            // 排除规则只作用于根目录以下的部分
            let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            if !self.should_process(&entry, relative, size) {
                stats.files_filtered += 1;
                continue;
            }

            let errors_before = self.errors.count_of(ErrorType::FileRead);
            let mut file_records = scan_file(entry.path(), matcher, self.errors);
            let failed = self.errors.count_of(ErrorType::FileRead) > errors_before;

            stats.files_scanned += 1;
            if failed {
                stats.files_failed += 1;
            }

            if self.logger.is_enabled() {
                let status = if failed {
                    format!("读取中断, {} 处匹配", file_records.len())
                } else {
                    format!("{} 处匹配", file_records.len())
                };
                let _ = self.logger.log_file(entry.path(), size, &status);
            }

            records.append(&mut file_records);

            self.progress
                .set_message(format!("已处理 {} 文件", stats.files_scanned));
            self.progress.tick();
        }

        self.progress.finish_and_clear();

        Ok(WalkReport {
            results: aggregate(records),
            stats,
        })
    }

    fn should_process(&self, entry: &DirEntry, relative: &Path, size: u64) -> bool {
        if self.filter.is_path_excluded(relative) {
            if self.logger.is_enabled() {
                let _ = self.logger.log_file(entry.path(), size, "已跳过(路径排除)");
            }
            return false;
        }

        if !self.filter.matches_size(size) {
            if self.logger.is_enabled() {
                let _ = self.logger.log_file(entry.path(), size, "已跳过(大小过滤)");
            }
            return false;
        }

        true
    }

    fn report_skipped(&self, err: &ignore::Error) {
        let path = ignored_error_path(err);

        let _ = self.errors.log_error(
            ErrorType::DirectoryAccess,
            path,
            "无法访问目录，已跳过",
            Some(&err.to_string()),
        );

        if self.logger.is_enabled() {
            let _ = self.logger.log_message(&format!("遍历错误: {}", err));
        }
    }
}

/// 从遍历错误中取出出错的路径
fn ignored_error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            ignored_error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::Logger;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn walk(root: &Path, query: &str) -> Result<WalkReport, SearchError> {
        let logger = Logger::disabled();
        let errors = ErrorLogger::disabled();
        let matcher = LiteralMatcher::new(query).unwrap();
        TreeWalker::new(&logger, &errors).walk(root, &matcher)
    }

    #[test]
    fn test_file_filter_creation() {
        let filter = FileFilter::new(
            Some(1024),
            Some(1048576),
            vec!["drafts".to_string()],
            vec!["README.md".to_string()],
        );

        assert_eq!(filter.min_size, Some(1024));
        assert_eq!(filter.max_size, Some(1048576));
        assert!(filter.excluded_dirs.contains("drafts"));
        assert!(filter.excluded_paths.contains("README.md"));
    }

    #[test]
    fn test_size_filtering() {
        let filter = FileFilter::new(Some(100), Some(1000), vec![], vec![]);

        assert!(!filter.matches_size(50));
        assert!(filter.matches_size(500));
        assert!(!filter.matches_size(2000));
    }

    #[test]
    fn test_path_exclusion() {
        let filter = FileFilter::new(
            None,
            None,
            vec!["archive".to_string()],
            vec!["CHANGELOG.md".to_string()],
        );

        assert!(filter.is_path_excluded(&PathBuf::from("notes/archive/old.md")));
        assert!(filter.is_path_excluded(&PathBuf::from("docs/CHANGELOG.md")));
        assert!(!filter.is_path_excluded(&PathBuf::from("notes/today.md")));
    }

    #[test]
    fn test_path_exclusion_matches_whole_components() {
        let filter = FileFilter::new(
            None,
            None,
            vec![],
            vec!["notes.md".to_string(), "daily/todo.md".to_string()],
        );

        assert!(filter.is_path_excluded(&PathBuf::from("notes.md")));
        assert!(filter.is_path_excluded(&PathBuf::from("sub/notes.md")));
        assert!(filter.is_path_excluded(&PathBuf::from("2024/daily/todo.md")));
        assert!(!filter.is_path_excluded(&PathBuf::from("mynotes.md")));
        assert!(!filter.is_path_excluded(&PathBuf::from("sub/todo-notes.md")));
        assert!(!filter.is_path_excluded(&PathBuf::from("weekly/todo.md")));
        assert!(!filter.is_path_excluded(&PathBuf::from("mydaily/todo.md")));
    }

    #[test]
    fn test_markdown_extension_is_case_insensitive() {
        assert!(is_markdown_file(Path::new("/n/a.md")));
        assert!(is_markdown_file(Path::new("/n/README.MD")));
        assert!(is_markdown_file(Path::new("/n/Notes.Md")));
        assert!(!is_markdown_file(Path::new("/n/a.markdown")));
        assert!(!is_markdown_file(Path::new("/n/a.md.txt")));
        assert!(!is_markdown_file(Path::new("/n/amd")));
    }

    #[test]
    fn test_walk_recurses_and_filters_extension() {
        let dir = tempdir().unwrap();
        write(dir.path(), "top.md", "rust here\n");
        write(dir.path(), "deep/er/nested.MD", "more Rust\n");
        write(dir.path(), "plain.txt", "rust ignored\n");
        write(dir.path(), ".hidden/secret.md", "rust hidden\n");

        let report = walk(dir.path(), "rust").unwrap();
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.stats.files_scanned, 3);
        assert!(report
            .results
            .iter()
            .all(|r| Path::new(&r.file_path).is_absolute()));
        assert!(!report.results.iter().any(|r| r.file_path.ends_with("plain.txt")));
    }

    #[test]
    fn test_walk_without_markdown_files_is_empty() {
        let dir = tempdir().unwrap();
        write(dir.path(), "notes.txt", "needle\n");

        let report = walk(dir.path(), "needle").unwrap();
        assert!(report.results.is_empty());
        assert_eq!(report.stats, WalkStats::default());
    }

    #[test]
    fn test_walk_rejects_missing_root() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");

        assert!(matches!(
            walk(&missing, "x"),
            Err(SearchError::RootNotFound(p)) if p == missing
        ));
    }

    #[test]
    fn test_walk_rejects_file_as_root() {
        let dir = tempdir().unwrap();
        let file = write(dir.path(), "a.md", "x\n");

        assert!(matches!(walk(&file, "x"), Err(SearchError::RootNotFound(_))));
    }

    #[test]
    fn test_walk_applies_filter() {
        let dir = tempdir().unwrap();
        write(dir.path(), "keep.md", "needle\n");
        write(dir.path(), "archive/old.md", "needle\n");

        let logger = Logger::disabled();
        let errors = ErrorLogger::disabled();
        let matcher = LiteralMatcher::new("needle").unwrap();
        let filter = FileFilter::new(None, None, vec!["archive".to_string()], vec![]);

        let report = TreeWalker::new(&logger, &errors)
            .filter(filter)
            .walk(dir.path(), &matcher)
            .unwrap();

        assert_eq!(report.results.len(), 1);
        assert!(report.results.get(0).unwrap().file_path.ends_with("keep.md"));
        assert_eq!(report.stats.files_filtered, 1);
    }

    #[test]
    fn test_walk_continues_after_unreadable_file() {
        let dir = tempdir().unwrap();
        write(dir.path(), "good.md", "needle ok\n");
        let bad = dir.path().join("bad.md");
        fs::write(&bad, [b'n', b'e', b'e', b'd', b'l', b'e', b'\n', 0xff, b'\n', b'n', b'e', b'e', b'd', b'l', b'e', b'\n']).unwrap();

        let logger = Logger::disabled();
        let errors = ErrorLogger::disabled();
        let matcher = LiteralMatcher::new("needle").unwrap();
        let report = TreeWalker::new(&logger, &errors)
            .walk(dir.path(), &matcher)
            .unwrap();

        // bad.md 只保留第一行的匹配
        let keys: Vec<(bool, u64)> = report
            .results
            .iter()
            .map(|r| (r.file_path.ends_with("bad.md"), r.line_number))
            .collect();
        assert_eq!(keys, vec![(true, 1), (false, 1)]);
        assert_eq!(report.stats.files_failed, 1);
        assert_eq!(errors.count_of(ErrorType::FileRead), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_reads_symlinked_markdown_file() {
        use std::os::unix::fs::symlink;

        let outside = tempdir().unwrap();
        let target = write(outside.path(), "real.txt", "intro\nneedle via link\n");
        write(outside.path(), "sub/inner.md", "needle inside linked dir\n");

        let dir = tempdir().unwrap();
        write(dir.path(), "plain.md", "needle\n");
        symlink(&target, dir.path().join("link.md")).unwrap();
        symlink(outside.path().join("sub"), dir.path().join("linked-dir.md")).unwrap();

        let report = walk(dir.path(), "needle").unwrap();

        let hits: Vec<(String, u64)> = report
            .results
            .iter()
            .map(|r| (file_label(&r.file_path), r.line_number))
            .collect();
        assert_eq!(
            hits,
            vec![("link.md".to_string(), 2), ("plain.md".to_string(), 1)]
        );
        assert_eq!(report.stats.files_scanned, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_keeps_other_results_after_io_error() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        write(dir.path(), "a.md", "needle one\n");
        write(dir.path(), "z.md", "needle two\n");
        symlink(dir.path().join("gone.txt"), dir.path().join("m.md")).unwrap();

        let logger = Logger::disabled();
        let errors = ErrorLogger::disabled();
        let matcher = LiteralMatcher::new("needle").unwrap();
        let report = TreeWalker::new(&logger, &errors)
            .walk(dir.path(), &matcher)
            .unwrap();

        let names: Vec<String> = report.results.iter().map(|r| file_label(&r.file_path)).collect();
        assert_eq!(names, vec!["a.md", "z.md"]);
        assert_eq!(report.stats.files_scanned, 3);
        assert_eq!(report.stats.files_failed, 1);
        assert_eq!(errors.count_of(ErrorType::FileRead), 1);
    }

    fn file_label(file_path: &str) -> String {
        Path::new(file_path)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_skips_unreadable_directory() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        write(dir.path(), "open.md", "needle\n");
        write(dir.path(), "locked/inner.md", "needle\n");
        let locked = dir.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root 用户可以读取任何目录，此时测试没有意义
        let readable_anyway = fs::read_dir(&locked).is_ok();

        let logger = Logger::disabled();
        let errors = ErrorLogger::disabled();
        let matcher = LiteralMatcher::new("needle").unwrap();
        let report = TreeWalker::new(&logger, &errors).walk(dir.path(), &matcher);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let report = report.unwrap();
        if readable_anyway {
            assert_eq!(report.results.len(), 2);
        } else {
            assert_eq!(report.results.len(), 1);
            assert_eq!(report.stats.entries_skipped, 1);
            assert_eq!(errors.count_of(ErrorType::DirectoryAccess), 1);
        }
    }
}
