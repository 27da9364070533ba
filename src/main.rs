use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use md_searcher::application::{Config, SearchQuery, SearchService};
use md_searcher::infrastructure::{
    EditorLauncher, ErrorLogger, ErrorType, JumpTarget, LaunchOutcome, Logger, LoggerTrait,
};
use md_searcher::presentation::{print_results, SearchSummary, TableOptions};
use md_searcher::SearchReport;

/// 在 Markdown 文件中搜索文本的命令行工具
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// 要搜索的文本（按字面匹配，不区分大小写）
    #[clap(required = true)]
    pattern: String,

    /// 要搜索的目录，省略时使用上次搜索的目录
    path: Option<String>,

    /// 配置文件路径，默认为程序同级目录下的 config.toml
    #[clap(long)]
    config: Option<PathBuf>,

    /// 启用详细日志记录，日志文件将保存到当前目录
    #[clap(long)]
    log: bool,

    /// 显示完整路径而不是文件名
    #[clap(long)]
    full_path: bool,

    /// 不高亮匹配内容
    #[clap(long)]
    no_highlight: bool,

    /// 遵循 .gitignore 规则，默认情况下会搜索所有文件
    #[clap(long)]
    respect_gitignore: bool,

    /// 搜索完成后在编辑器中打开第 N 条结果
    #[clap(long, value_name = "ROW")]
    open: Option<usize>,

    /// 不记住本次搜索的目录
    #[clap(long)]
    no_remember: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 先校验输入，再读取或创建配置文件
    let explicit_query = args
        .path
        .as_deref()
        .map(|path| SearchQuery::new(path, &args.pattern))
        .transpose()?;
    if explicit_query.is_none() {
        SearchQuery::check_text(&args.pattern)?;
    }

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let mut config = Config::load_or_create(&config_path)?;
    config.validate().context("配置文件无效")?;

    let logger = Logger::new(args.log)?;
    let errors = ErrorLogger::new(args.log)?;

    let query = match explicit_query {
        Some(query) => query,
        None => SearchQuery::new(config.fallback_folder(), &args.pattern)?,
    };

    if logger.is_enabled() {
        logger.log_message(&format!("配置文件: {}", config_path.display()))?;
    }

    println!("在 {} 中搜索: {}", query.root_directory().display(), query.search_text());
    println!();

    let report = SearchService::new(&logger, &errors)
        .filter(config.file_filter())
        .respect_gitignore(args.respect_gitignore || config.search.respect_gitignore)
        .show_progress(true)
        .search(&query)?;

    if args.path.is_some() && !args.no_remember {
        remember_folder(&mut config, &config_path, query.root_directory());
    }

    let options = TableOptions {
        show_full_path: args.full_path || config.display.show_full_path,
        highlight: !args.no_highlight && config.display.highlight_matches,
        max_line_length: config.display.max_line_length,
    };
    print_results(&report.results, &report.matcher, &options)?;
    SearchSummary::new(&report.results, report.stats, report.elapsed).print()?;

    if let Some(row) = args.open {
        open_row(&report, row, config.editor.preferred.as_deref(), &errors);
    }

    errors.print_error_summary();
    errors.finalize()?;

    if logger.is_enabled() {
        println!("完整日志已保存到: {}", logger.log_path().display());
    }

    Ok(())
}

/// 保存本次搜索的目录，失败只提示不中断
fn remember_folder(config: &mut Config, config_path: &Path, folder: &Path) {
    let folder = std::path::absolute(folder).unwrap_or_else(|_| folder.to_path_buf());

    if config.remember_folder(&folder.to_string_lossy()) {
        if let Err(err) = config.save_to_file(config_path) {
            eprintln!("保存配置失败: {:#}", err);
        }
    }
}

/// 在外部编辑器中打开第 row 条结果（从 1 开始）
fn open_row(report: &SearchReport, row: usize, preferred: Option<&str>, errors: &ErrorLogger) {
    let record = match row.checked_sub(1).and_then(|idx| report.results.get(idx)) {
        Some(record) => record,
        None => {
            eprintln!("没有第 {} 条结果（共 {} 条）", row, report.results.len());
            return;
        }
    };

    let file_path = Path::new(&record.file_path);
    let target = JumpTarget {
        file_path,
        line_number: record.line_number,
        matcher: &report.matcher,
    };

    match EditorLauncher::standard(preferred).open(&target) {
        Ok((outcome, failures)) => {
            for (strategy, err) in &failures {
                let _ = errors.log_error(
                    ErrorType::EditorLaunch,
                    Some(file_path),
                    &format!("{}打开失败", strategy),
                    Some(&err.to_string()),
                );
            }

            match outcome {
                LaunchOutcome::Jumped { editor } => {
                    println!("\n已在 {} 中打开 {}:{}", editor, record.file_path, record.line_number);
                }
                LaunchOutcome::OpenedWithoutJump { occurrences_before } => {
                    println!("\n已用默认程序打开 {}", record.file_path);
                    println!(
                        "无法直接跳转到第 {} 行：请在编辑器中查找 \"{}\"，再按 {} 次“查找下一个”",
                        record.line_number,
                        report.matcher.query(),
                        occurrences_before
                    );
                }
                LaunchOutcome::NotLaunched => {
                    println!("\n未找到可用的编辑器: {}", record.file_path);
                }
            }
        }
        Err(err) => {
            let _ = errors.log_error(
                ErrorType::EditorLaunch,
                Some(file_path),
                "无法打开文件",
                Some(&err.to_string()),
            );
            eprintln!("无法打开文件: {}", err);
        }
    }
}
