use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use crate::domain::{DisplayRow, LiteralMatcher, ResultSet, WalkStats};

const HIGHLIGHT_START: &str = "\x1b[1;31m";
const COLOR_END: &str = "\x1b[0m";

/// 格式化持续时间
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}.{:03}s", secs, duration.subsec_millis())
    }
}

/// 结果表格的显示选项
#[derive(Debug, Clone, Copy)]
pub struct TableOptions {
    pub show_full_path: bool,
    pub highlight: bool,
    pub max_line_length: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            show_full_path: false,
            highlight: true,
            max_line_length: 200,
        }
    }
}

/// 文件列显示的文字：文件名或完整路径
pub fn file_label(file_path: &str, show_full_path: bool) -> String {
    if show_full_path {
        return file_path.to_string();
    }
    Path::new(file_path)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.to_string())
}

/// 截断过长的内容（按字符计）
fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (text[..idx].to_string(), true),
        None => (text.to_string(), false),
    }
}

/// 内容列：截断并高亮第一处匹配
pub fn format_line_text(line: &str, matcher: &LiteralMatcher, options: &TableOptions) -> String {
    let (visible, truncated) = truncate_chars(line, options.max_line_length);
    let ellipsis = if truncated { "…" } else { "" };

    if !options.highlight {
        return format!("{}{}", visible, ellipsis);
    }

    let start = match matcher.find_start(&visible) {
        Some(start) => start,
        None => return format!("{}{}", visible, ellipsis),
    };
    let len = matcher.query().chars().count();

    let before: String = visible.chars().take(start).collect();
    let matched: String = visible.chars().skip(start).take(len).collect();
    let after: String = visible.chars().skip(start + len).collect();

    format!(
        "{}{}{}{}{}{}",
        before, HIGHLIGHT_START, matched, COLOR_END, after, ellipsis
    )
}

/// 一行表格（不含换行）
pub fn format_row(
    row: &DisplayRow<'_>,
    index: usize,
    file_width: usize,
    matcher: &LiteralMatcher,
    options: &TableOptions,
) -> String {
    let label = row
        .file_path
        .map(|path| file_label(path, options.show_full_path))
        .unwrap_or_default();

    format!(
        "{:>4}  {:<width$}  {:>6}  {}",
        index,
        label,
        row.record.line_number,
        format_line_text(&row.record.line_text, matcher, options),
        width = file_width
    )
}

/// 输出结果表格，行号从 1 开始，可用于 --open
pub fn print_results(results: &ResultSet, matcher: &LiteralMatcher, options: &TableOptions) -> Result<()> {
    let mut stdout = io::stdout().lock();

    if results.is_empty() {
        writeln!(stdout, "未找到匹配内容")?;
        return Ok(());
    }

    let file_width = results
        .display_rows()
        .filter_map(|row| row.file_path)
        .map(|path| file_label(path, options.show_full_path).chars().count())
        .max()
        .unwrap_or(0)
        .max(4);

    writeln!(
        stdout,
        "{:>4}  {:<width$}  {:>6}  {}",
        "#",
        "文件",
        "行号",
        "内容",
        width = file_width
    )?;

    for (idx, row) in results.display_rows().enumerate() {
        writeln!(stdout, "{}", format_row(&row, idx + 1, file_width, matcher, options))?;
    }

    Ok(())
}

/// 搜索摘要
pub struct SearchSummary {
    pub duration: Duration,
    pub stats: WalkStats,
    pub matched_files: usize,
    pub total_matches: usize,
}

impl SearchSummary {
    pub fn new(results: &ResultSet, stats: WalkStats, duration: Duration) -> Self {
        Self {
            duration,
            stats,
            matched_files: results.matched_files(),
            total_matches: results.len(),
        }
    }

    pub fn print(&self) -> Result<()> {
        let mut stdout = io::stdout().lock();

        writeln!(stdout, "\n搜索摘要:")?;
        writeln!(stdout, "----------------------------")?;
        writeln!(stdout, "总用时: {}", format_duration(self.duration))?;
        writeln!(stdout, "扫描文件: {}", self.stats.files_scanned)?;
        writeln!(stdout, "匹配文件: {}", self.matched_files)?;
        writeln!(stdout, "匹配行数: {}", self.total_matches)?;
        if self.stats.files_filtered > 0 {
            writeln!(stdout, "过滤文件: {}", self.stats.files_filtered)?;
        }
        if self.stats.files_failed > 0 {
            writeln!(stdout, "读取失败: {}", self.stats.files_failed)?;
        }
        if self.stats.entries_skipped > 0 {
            writeln!(stdout, "跳过目录: {}", self.stats.entries_skipped)?;
        }

        Ok(())
    }
}
