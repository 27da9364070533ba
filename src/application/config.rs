use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::FileFilter;

/// 应用程序配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 搜索相关配置
    pub search: SearchConfig,
    /// 排除规则配置
    pub exclude: ExcludeConfig,
    /// 显示相关配置
    pub display: DisplayConfig,
    /// 外部编辑器配置
    pub editor: EditorConfig,
    /// 运行时保存的状态
    pub state: StateConfig,
}

/// 搜索配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// 未指定目录且没有记住的目录时使用
    pub default_search_path: String,
    /// 是否遵循 .gitignore 规则
    pub respect_gitignore: bool,
}

/// 排除规则配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeConfig {
    /// 排除的目录名
    pub default_dirs: Vec<String>,
    /// 排除的文件
    pub default_files: Vec<String>,
    /// 最小文件大小（字节）
    pub min_size: Option<u64>,
    /// 最大文件大小（字节）
    pub max_size: Option<u64>,
}

/// 显示配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// 内容列最大字符数
    pub max_line_length: usize,
    /// 是否高亮匹配内容
    pub highlight_matches: bool,
    /// 显示完整路径而不是文件名
    pub show_full_path: bool,
}

/// 编辑器配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// 优先尝试的编辑器可执行文件名，例如 "code"
    pub preferred: Option<String>,
}

/// 状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// 上次搜索的文件夹
    pub last_folder: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_search_path: ".".to_string(),
            respect_gitignore: false,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_line_length: 200,
            highlight_matches: true,
            show_full_path: false,
        }
    }
}

impl Config {
    /// 从配置文件加载配置，如果文件不存在则创建默认配置文件
    pub fn load_or_create(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            let config = Self::default();
            config.save_to_file(config_path)?;
            println!("已创建默认配置文件: {}", config_path.display());
            Ok(config)
        }
    }

    /// 从文件加载配置
    pub fn load_from_file(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("无法读取配置文件: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", config_path.display()))?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("无法创建配置目录: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("无法序列化配置")?;

        fs::write(config_path, content)
            .with_context(|| format!("无法写入配置文件: {}", config_path.display()))?;

        Ok(())
    }

    /// 获取配置文件的默认路径（程序所在目录下的 config.toml）
    pub fn default_config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("无法获取程序路径")?;

        let exe_dir = exe_path.parent().context("无法获取程序目录")?;

        Ok(exe_dir.join("config.toml"))
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.display.max_line_length < 20 {
            anyhow::bail!("max_line_length 不能小于 20");
        }

        if let (Some(min), Some(max)) = (self.exclude.min_size, self.exclude.max_size) {
            if min > max {
                anyhow::bail!("min_size ({}) 不能大于 max_size ({})", min, max);
            }
        }

        if let Some(preferred) = &self.editor.preferred {
            if preferred.trim().is_empty() {
                anyhow::bail!("editor.preferred 不能为空字符串");
            }
        }

        Ok(())
    }

    /// 根据排除规则生成文件过滤器
    pub fn file_filter(&self) -> FileFilter {
        FileFilter::new(
            self.exclude.min_size,
            self.exclude.max_size,
            self.exclude.default_dirs.clone(),
            self.exclude.default_files.clone(),
        )
    }

    /// 记住新的文件夹，返回是否发生变化
    pub fn remember_folder(&mut self, folder: &str) -> bool {
        if self.state.last_folder == folder {
            return false;
        }
        self.state.last_folder = folder.to_string();
        true
    }

    /// 未指定目录时使用的搜索目录
    pub fn fallback_folder(&self) -> &str {
        if self.state.last_folder.trim().is_empty() {
            &self.search.default_search_path
        } else {
            &self.state.last_folder
        }
    }
}
