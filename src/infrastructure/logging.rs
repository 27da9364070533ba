use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use humansize::{format_size, BINARY};

/// 日志记录器trait
pub trait LoggerTrait: Send + Sync {
    fn is_enabled(&self) -> bool;
    fn log_message(&self, message: &str) -> Result<()>;
    fn log_file(&self, path: &Path, size: u64, status: &str) -> Result<()>;
    fn finalize(&self, total_files: u64, matched_files: u64, total_matches: u64, duration: Duration) -> Result<()>;
}

/// 调试日志记录器（搜索参数、扫描过的文件和搜索摘要）
pub struct Logger {
    log_file: Arc<Mutex<Option<File>>>,
    log_path: PathBuf,
    enabled: bool,
}

impl Logger {
    /// 创建新的日志记录器，启用时在当前目录生成带时间戳的日志文件
    pub fn new(enabled: bool) -> Result<Self> {
        if !enabled {
            return Ok(Self::disabled());
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        Self::with_path(PathBuf::from(format!("debug_{}.log", timestamp)))
    }

    pub fn disabled() -> Self {
        Self {
            log_file: Arc::new(Mutex::new(None)),
            log_path: PathBuf::new(),
            enabled: false,
        }
    }

    /// 写入指定路径的调试日志
    pub fn with_path(log_path: PathBuf) -> Result<Self> {
        let now = Local::now();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        // 写入UTF-8 BOM以确保文件被正确识别为UTF-8
        file.write_all(&[0xEF, 0xBB, 0xBF])?;

        writeln!(file, "# md-searcher 调试日志")?;
        writeln!(file, "# 开始时间: {}", now.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(file, "# --------------------------------------------")?;

        Ok(Self {
            log_file: Arc::new(Mutex::new(Some(file))),
            log_path,
            enabled: true,
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    fn write_line(&self, line: std::fmt::Arguments<'_>) -> Result<()> {
        if let Ok(mut file_guard) = self.log_file.lock() {
            if let Some(ref mut file) = *file_guard {
                file.write_fmt(line)?;
                writeln!(file)?;
                file.flush()?;
            }
        }
        Ok(())
    }
}

impl LoggerTrait for Logger {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn log_message(&self, message: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        self.write_line(format_args!("[{}] {}", timestamp, message))
    }

    fn log_file(&self, path: &Path, size: u64, status: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        self.write_line(format_args!(
            "[{}] 文件: {} | 大小: {} | 状态: {}",
            timestamp,
            path.display(),
            format_size(size, BINARY),
            status
        ))
    }

    fn finalize(&self, total_files: u64, matched_files: u64, total_matches: u64, duration: Duration) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let now = Local::now();
        self.write_line(format_args!("# --------------------------------------------"))?;
        self.write_line(format_args!("# 搜索完成时间: {}", now.format("%Y-%m-%d %H:%M:%S")))?;
        self.write_line(format_args!("# 总用时: {:.3}秒", duration.as_secs_f64()))?;
        self.write_line(format_args!("# 扫描文件数: {}", total_files))?;
        self.write_line(format_args!("# 匹配文件数: {}", matched_files))?;
        self.write_line(format_args!("# 匹配行总数: {}", total_matches))?;
        self.write_line(format_args!("# ============================================"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_disabled_logger_is_silent() {
        let logger = Logger::disabled();
        assert!(!logger.is_enabled());
        assert!(logger.log_message("ignored").is_ok());
        assert!(logger.log_file(Path::new("/a.md"), 10, "已扫描").is_ok());
    }

    #[test]
    fn test_logger_writes_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("debug.log");
        let logger = Logger::with_path(path.clone()).unwrap();
        let logger_trait: &dyn LoggerTrait = &logger;

        assert!(logger_trait.is_enabled());
        logger_trait.log_message("搜索文本: rust").unwrap();
        logger_trait.log_file(Path::new("/notes/a.md"), 2048, "已扫描").unwrap();
        logger_trait
            .finalize(3, 1, 2, Duration::from_millis(1500))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("搜索文本: rust"));
        assert!(content.contains("/notes/a.md"));
        assert!(content.contains("2 KiB"));
        assert!(content.contains("# 扫描文件数: 3"));
        assert_eq!(logger.log_path(), path.as_path());
    }
}
