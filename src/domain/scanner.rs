use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use super::aggregate::MatchRecord;
use super::matcher::LiteralMatcher;
use crate::infrastructure::{ErrorLogger, ErrorType};

/// 单个文件的扫描结果
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// 中断之前已产生的匹配记录
    pub records: Vec<MatchRecord>,
    /// 导致扫描中断的错误
    pub error: Option<io::Error>,
}

impl ScanOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// 逐行扫描任意输入，按 UTF-8 解码
///
/// 每个匹配行只产生一条记录。读取或解码失败时立即停止，
/// 已产生的记录保留在结果中。
pub fn scan_reader<R: BufRead>(file_path: &str, reader: R, matcher: &LiteralMatcher) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                outcome.error = Some(err);
                break;
            }
        };

        if matcher.matches(&line) {
            outcome
                .records
                .push(MatchRecord::new(file_path, (idx + 1) as u64, &line));
        }
    }

    outcome
}

/// 在单个文件中搜索，失败记录到错误日志后返回已找到的部分结果
pub fn scan_file(path: &Path, matcher: &LiteralMatcher, errors: &ErrorLogger) -> Vec<MatchRecord> {
    let file_path = path.to_string_lossy().to_string();

    let outcome = match File::open(path) {
        Ok(file) => scan_reader(&file_path, BufReader::new(file), matcher),
        Err(err) => ScanOutcome {
            records: Vec::new(),
            error: Some(err),
        },
    };

    if let Some(err) = &outcome.error {
        let _ = errors.log_error(
            ErrorType::FileRead,
            Some(path),
            "读取文件错误",
            Some(&err.to_string()),
        );
    }

    outcome.records
}
