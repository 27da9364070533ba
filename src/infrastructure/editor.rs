use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use grep_searcher::{Searcher, SearcherBuilder, Sink, SinkMatch};
use thiserror::Error;

use crate::domain::LiteralMatcher;

/// 编辑器启动错误
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("文件不存在: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("无法启动 {editor}: {source}")]
    Spawn {
        editor: String,
        #[source]
        source: io::Error,
    },

    #[error("无法用默认程序打开 {}: {source}", .path.display())]
    DefaultHandler {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 跳转目标：某个文件的某一行
#[derive(Debug, Clone, Copy)]
pub struct JumpTarget<'a> {
    pub file_path: &'a Path,
    pub line_number: u64,
    pub matcher: &'a LiteralMatcher,
}

/// 启动结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// 编辑器已打开并定位到目标行
    Jumped { editor: String },
    /// 用系统默认程序打开，无法定位；目标行之前共有多少处匹配
    OpenedWithoutJump { occurrences_before: u64 },
    /// 该策略没有做任何事
    NotLaunched,
}

/// 一种打开文件的方式
pub trait LaunchStrategy {
    fn name(&self) -> &str;
    fn launch(&self, target: &JumpTarget<'_>) -> Result<LaunchOutcome, LaunchError>;
}

/// 编辑器的行号参数格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineJumpSyntax {
    /// `-n{line} {file}`
    DashN,
    /// `--goto {file}:{line}`
    Goto,
    /// `{file}:{line}`
    Colon,
    /// `+{line} {file}`
    Plus,
    /// 只传文件路径
    FileOnly,
}

impl LineJumpSyntax {
    /// 根据可执行文件名推断参数格式
    pub fn for_executable(executable: &str) -> Self {
        let stem = Path::new(executable)
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match stem.as_str() {
            "notepad++" => LineJumpSyntax::DashN,
            "code" | "code-insiders" | "codium" => LineJumpSyntax::Goto,
            "subl" | "sublime_text" | "atom" | "zed" => LineJumpSyntax::Colon,
            "vim" | "nvim" | "vi" | "gvim" | "emacs" | "nano" | "micro" => LineJumpSyntax::Plus,
            _ => LineJumpSyntax::FileOnly,
        }
    }

    pub fn args(&self, file: &Path, line: u64) -> Vec<OsString> {
        let file_at_line = || {
            let mut arg = file.as_os_str().to_os_string();
            arg.push(format!(":{}", line));
            arg
        };

        match self {
            LineJumpSyntax::DashN => vec![format!("-n{}", line).into(), file.into()],
            LineJumpSyntax::Goto => vec!["--goto".into(), file_at_line()],
            LineJumpSyntax::Colon => vec![file_at_line()],
            LineJumpSyntax::Plus => vec![format!("+{}", line).into(), file.into()],
            LineJumpSyntax::FileOnly => vec![file.into()],
        }
    }
}

/// 已知的外部编辑器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownEditor {
    pub name: String,
    pub executable: String,
    pub syntax: LineJumpSyntax,
    /// 终端编辑器需要占用当前终端，等待其退出
    pub terminal: bool,
}

impl KnownEditor {
    pub fn new(name: &str, executable: &str, syntax: LineJumpSyntax, terminal: bool) -> Self {
        Self {
            name: name.to_string(),
            executable: executable.to_string(),
            syntax,
            terminal,
        }
    }

    /// 按可执行文件名构造，用于配置中指定的编辑器
    pub fn from_executable(executable: &str) -> Self {
        let syntax = LineJumpSyntax::for_executable(executable);
        let terminal = matches!(
            Path::new(executable)
                .file_stem()
                .map(|s| s.to_string_lossy().to_lowercase())
                .as_deref(),
            Some("vim" | "nvim" | "vi" | "nano" | "micro")
        );
        Self::new(executable, executable, syntax, terminal)
    }

    /// 默认按顺序尝试的编辑器
    pub fn defaults() -> Vec<KnownEditor> {
        vec![
            KnownEditor::new("Notepad++", "notepad++", LineJumpSyntax::DashN, false),
            KnownEditor::new("VS Code", "code", LineJumpSyntax::Goto, false),
            KnownEditor::new("Sublime Text", "sublime_text", LineJumpSyntax::Colon, false),
            KnownEditor::new("Sublime Text", "subl", LineJumpSyntax::Colon, false),
            KnownEditor::new("Atom", "atom", LineJumpSyntax::Colon, false),
            KnownEditor::new("Vim", "vim", LineJumpSyntax::Plus, true),
            KnownEditor::new("Emacs", "emacs", LineJumpSyntax::Plus, false),
        ]
    }
}

/// 在 PATH 中查找已知编辑器，用行号参数启动
pub struct CommandLineLaunch {
    editors: Vec<KnownEditor>,
    search_dirs: Vec<PathBuf>,
}

impl CommandLineLaunch {
    /// 使用默认编辑器列表和当前 PATH
    pub fn from_env() -> Self {
        let search_dirs: Vec<PathBuf> = std::env::var_os("PATH")
            .map(|path| std::env::split_paths(&path).collect())
            .unwrap_or_default();
        Self::new(KnownEditor::defaults(), search_dirs)
    }

    pub fn new(editors: Vec<KnownEditor>, search_dirs: Vec<PathBuf>) -> Self {
        Self {
            editors,
            search_dirs,
        }
    }

    /// 把指定的编辑器放到最前面
    pub fn with_preferred(mut self, executable: &str) -> Self {
        let position = self
            .editors
            .iter()
            .position(|editor| editor.executable.eq_ignore_ascii_case(executable));

        let preferred = match position {
            Some(idx) => self.editors.remove(idx),
            None => KnownEditor::from_executable(executable),
        };
        self.editors.insert(0, preferred);
        self
    }

    pub fn editors(&self) -> &[KnownEditor] {
        &self.editors
    }

    /// 找到第一个已安装的编辑器及其完整路径
    pub fn resolve(&self) -> Option<(&KnownEditor, PathBuf)> {
        self.editors.iter().find_map(|editor| {
            self.find_executable(&editor.executable)
                .map(|path| (editor, path))
        })
    }

    fn find_executable(&self, executable: &str) -> Option<PathBuf> {
        let candidates: Vec<String> = if cfg!(windows) {
            vec![
                format!("{}.exe", executable),
                format!("{}.cmd", executable),
                executable.to_string(),
            ]
        } else {
            vec![executable.to_string()]
        };

        self.search_dirs.iter().find_map(|dir| {
            candidates
                .iter()
                .map(|name| dir.join(name))
                .find(|path| is_executable(path))
        })
    }
}

impl LaunchStrategy for CommandLineLaunch {
    fn name(&self) -> &str {
        "命令行参数"
    }

    fn launch(&self, target: &JumpTarget<'_>) -> Result<LaunchOutcome, LaunchError> {
        let (editor, executable) = match self.resolve() {
            Some(found) => found,
            None => return Ok(LaunchOutcome::NotLaunched),
        };

        let mut command = Command::new(&executable);
        command.args(editor.syntax.args(target.file_path, target.line_number));

        let result = if editor.terminal {
            command.status().map(|_| ())
        } else {
            command.spawn().map(|_| ())
        };

        result.map_err(|source| LaunchError::Spawn {
            editor: editor.name.clone(),
            source,
        })?;

        Ok(LaunchOutcome::Jumped {
            editor: editor.name.clone(),
        })
    }
}

/// 用系统默认程序打开文件，不模拟任何按键
pub struct DefaultHandlerLaunch;

impl LaunchStrategy for DefaultHandlerLaunch {
    fn name(&self) -> &str {
        "系统默认程序"
    }

    fn launch(&self, target: &JumpTarget<'_>) -> Result<LaunchOutcome, LaunchError> {
        // 统计失败时仍然打开文件，只是无法给出定位提示
        let occurrences_before =
            occurrences_before_line(target.file_path, target.line_number, target.matcher)
                .unwrap_or(0);

        open::that(target.file_path).map_err(|source| LaunchError::DefaultHandler {
            path: target.file_path.to_path_buf(),
            source,
        })?;

        Ok(LaunchOutcome::OpenedWithoutJump { occurrences_before })
    }
}

/// 什么都不做
pub struct NoOpFallback;

impl LaunchStrategy for NoOpFallback {
    fn name(&self) -> &str {
        "不打开"
    }

    fn launch(&self, _target: &JumpTarget<'_>) -> Result<LaunchOutcome, LaunchError> {
        Ok(LaunchOutcome::NotLaunched)
    }
}

/// 依次尝试各个策略，第一个成功打开文件的策略生效
pub struct EditorLauncher {
    strategies: Vec<Box<dyn LaunchStrategy>>,
}

impl EditorLauncher {
    pub fn new(strategies: Vec<Box<dyn LaunchStrategy>>) -> Self {
        Self { strategies }
    }

    /// 命令行编辑器优先，找不到时用系统默认程序打开
    pub fn standard(preferred: Option<&str>) -> Self {
        let mut command_line = CommandLineLaunch::from_env();
        if let Some(preferred) = preferred {
            command_line = command_line.with_preferred(preferred);
        }

        Self::new(vec![
            Box::new(command_line),
            Box::new(DefaultHandlerLaunch),
            Box::new(NoOpFallback),
        ])
    }

    /// 打开文件，返回生效的结果以及途中失败的策略（策略名, 错误）
    pub fn open(
        &self,
        target: &JumpTarget<'_>,
    ) -> Result<(LaunchOutcome, Vec<(String, LaunchError)>), LaunchError> {
        if !target.file_path.is_file() {
            return Err(LaunchError::MissingFile(target.file_path.to_path_buf()));
        }

        let mut failures = Vec::new();
        for strategy in &self.strategies {
            match strategy.launch(target) {
                Ok(LaunchOutcome::NotLaunched) => continue,
                Ok(outcome) => return Ok((outcome, failures)),
                Err(err) => failures.push((strategy.name().to_string(), err)),
            }
        }

        // 没有策略打开文件时，报告最后一次失败
        match failures.pop() {
            Some((_, last)) => Err(last),
            None => Ok((LaunchOutcome::NotLaunched, failures)),
        }
    }
}

struct OccurrenceCounter<'m> {
    matcher: &'m LiteralMatcher,
    target_line: u64,
    count: u64,
}

impl Sink for OccurrenceCounter<'_> {
    type Error = io::Error;

    fn matched(&mut self, _searcher: &Searcher, mat: &SinkMatch<'_>) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        if line_number >= self.target_line {
            return Ok(false);
        }

        self.count += self.matcher.count_in_bytes(mat.bytes()) as u64;
        Ok(true)
    }
}

/// 统计目标行之前（不含目标行）的全部匹配次数
pub fn occurrences_before_line(path: &Path, line_number: u64, matcher: &LiteralMatcher) -> io::Result<u64> {
    let mut counter = OccurrenceCounter {
        matcher,
        target_line: line_number,
        count: 0,
    };

    let mut searcher = SearcherBuilder::new().line_number(true).build();
    searcher.search_path(matcher.as_grep_matcher(), path, &mut counter)?;

    Ok(counter.count)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
