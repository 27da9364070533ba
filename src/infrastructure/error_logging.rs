use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Local;

/// 错误类型分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorType {
    /// 文件读取错误
    FileRead,
    /// 目录无法访问
    DirectoryAccess,
    /// 编辑器启动失败
    EditorLaunch,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::FileRead => "文件读取",
            ErrorType::DirectoryAccess => "目录访问",
            ErrorType::EditorLaunch => "编辑器启动",
        }
    }
}

/// 错误日志记录器
///
/// 无论是否写入文件，错误计数都会保留，便于命令行打印摘要。
pub struct ErrorLogger {
    error_file: Arc<Mutex<Option<File>>>,
    error_path: PathBuf,
    error_counts: Arc<Mutex<HashMap<ErrorType, usize>>>,
}

impl ErrorLogger {
    /// 创建新的错误日志记录器，启用时在当前目录生成带时间戳的日志文件
    pub fn new(enabled: bool) -> Result<Self> {
        if !enabled {
            return Ok(Self::disabled());
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        Self::with_path(PathBuf::from(format!("error_{}.log", timestamp)))
    }

    /// 只计数、不写文件的记录器
    pub fn disabled() -> Self {
        Self {
            error_file: Arc::new(Mutex::new(None)),
            error_path: PathBuf::new(),
            error_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 写入指定路径的错误日志
    pub fn with_path(error_path: PathBuf) -> Result<Self> {
        let now = Local::now();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&error_path)?;

        // 写入UTF-8 BOM以确保文件被正确识别为UTF-8
        file.write_all(&[0xEF, 0xBB, 0xBF])?;

        writeln!(file, "# md-searcher 错误日志")?;
        writeln!(file, "# 开始时间: {}", now.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(file, "# ============================================")?;
        writeln!(file)?;

        Ok(Self {
            error_file: Arc::new(Mutex::new(Some(file))),
            error_path,
            error_counts: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.error_file.lock().map_or(false, |guard| guard.is_some())
    }

    pub fn error_path(&self) -> &Path {
        &self.error_path
    }

    /// 记录错误
    pub fn log_error(
        &self,
        error_type: ErrorType,
        file_path: Option<&Path>,
        message: &str,
        details: Option<&str>,
    ) -> Result<()> {
        if let Ok(mut counts) = self.error_counts.lock() {
            *counts.entry(error_type).or_insert(0) += 1;
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");

        if let Ok(mut file_guard) = self.error_file.lock() {
            if let Some(ref mut file) = *file_guard {
                writeln!(file, "[{}] {} - {}", timestamp, error_type.as_str(), message)?;

                if let Some(path) = file_path {
                    writeln!(file, "  文件路径: {}", path.display())?;
                }

                if let Some(detail) = details {
                    writeln!(file, "  详细信息: {}", detail)?;
                }

                writeln!(file)?;
                file.flush()?;
            }
        }

        Ok(())
    }

    /// 获取错误统计信息
    pub fn get_error_summary(&self) -> HashMap<ErrorType, usize> {
        self.error_counts
            .lock()
            .map(|counts| counts.clone())
            .unwrap_or_default()
    }

    /// 某类错误的次数
    pub fn count_of(&self, error_type: ErrorType) -> usize {
        self.error_counts
            .lock()
            .ok()
            .and_then(|counts| counts.get(&error_type).copied())
            .unwrap_or(0)
    }

    /// 获取总错误数
    pub fn get_total_errors(&self) -> usize {
        self.error_counts
            .lock()
            .map(|counts| counts.values().sum())
            .unwrap_or(0)
    }

    pub fn has_errors(&self) -> bool {
        self.get_total_errors() > 0
    }

    fn sorted_summary(&self) -> Vec<(ErrorType, usize)> {
        let mut summary: Vec<_> = self.get_error_summary().into_iter().collect();
        summary.sort();
        summary
    }

    /// 完成错误日志记录
    pub fn finalize(&self) -> Result<()> {
        let summary = self.sorted_summary();
        let total = self.get_total_errors();

        if let Ok(mut file_guard) = self.error_file.lock() {
            if let Some(ref mut file) = *file_guard {
                writeln!(file, "# ============================================")?;
                writeln!(file, "# 结束时间: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;

                if summary.is_empty() {
                    writeln!(file, "# 无错误记录")?;
                } else {
                    writeln!(file, "# 错误统计:")?;
                    for (error_type, count) in &summary {
                        writeln!(file, "#   {}: {} 次", error_type.as_str(), count)?;
                    }
                    writeln!(file, "#   总计: {} 个错误", total)?;
                }

                file.flush()?;
            }
        }

        Ok(())
    }

    /// 打印错误摘要到控制台
    pub fn print_error_summary(&self) {
        if !self.has_errors() {
            return;
        }

        println!("\n⚠️  搜索过程中发现错误:");
        println!("----------------------------");

        for (error_type, count) in self.sorted_summary() {
            println!("  {}: {} 次", error_type.as_str(), count);
        }

        println!("  总计: {} 个错误", self.get_total_errors());
        if self.is_enabled() {
            println!("  详细错误信息请查看: {}", self.error_path.display());
        } else {
            println!("  使用 --log 记录详细错误信息");
        }
    }
}
