use std::path::PathBuf;

use thiserror::Error;

/// 搜索操作的硬失败
///
/// 单个文件读取失败或子目录无法访问不会出现在这里，
/// 它们在遍历过程中被记录到错误日志后跳过。
#[derive(Debug, Error)]
pub enum SearchError {
    /// 搜索文本为空
    #[error("搜索文本不能为空")]
    EmptyQuery,

    /// 未提供搜索目录
    #[error("请输入文件夹路径")]
    MissingDirectory,

    /// 根目录不存在或不是目录
    #[error("目录不存在或不是文件夹: {}", .0.display())]
    RootNotFound(PathBuf),

    /// 无法构建匹配器
    #[error("无法创建文本匹配器: {0}")]
    Matcher(String),
}

impl SearchError {
    /// 是否为输入校验错误（在访问文件系统之前报告）
    pub fn is_validation(&self) -> bool {
        matches!(self, SearchError::EmptyQuery | SearchError::MissingDirectory)
    }
}
