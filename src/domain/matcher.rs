use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};

use super::error::SearchError;

/// 字面量文本匹配器（忽略大小写）
///
/// 查询文本在构建时转义一次，之后在整次搜索的所有文件、所有行中复用。
/// 正则元字符一律按普通字符处理。
#[derive(Debug, Clone)]
pub struct LiteralMatcher {
    query: String,
    inner: RegexMatcher,
}

impl LiteralMatcher {
    /// 为查询文本创建匹配器，空查询会被拒绝
    pub fn new(query: &str) -> Result<Self, SearchError> {
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        // 转义正则表达式特殊字符
        let escaped = regex::escape(query);
        let inner = RegexMatcherBuilder::new()
            .case_insensitive(true)
            .build(&escaped)
            .map_err(|err| SearchError::Matcher(err.to_string()))?;

        Ok(Self {
            query: query.to_string(),
            inner,
        })
    }

    /// 原始查询文本
    pub fn query(&self) -> &str {
        &self.query
    }

    /// 底层的 grep 匹配器，供 grep-searcher 使用
    pub fn as_grep_matcher(&self) -> &RegexMatcher {
        &self.inner
    }

    /// 该行是否包含查询文本
    pub fn matches(&self, line: &str) -> bool {
        matches!(self.inner.is_match(line.as_bytes()), Ok(true))
    }

    /// 第一次出现位置的字符偏移（从 0 开始）
    pub fn find_start(&self, line: &str) -> Option<usize> {
        let m = match self.inner.find(line.as_bytes()) {
            Ok(Some(m)) => m,
            _ => return None,
        };

        // 字节偏移转换为字符偏移
        Some(
            line.get(..m.start())
                .map_or(m.start(), |prefix| prefix.chars().count()),
        )
    }

    /// 统计一行中不重叠的出现次数
    pub fn count_occurrences(&self, line: &str) -> usize {
        self.count_in_bytes(line.as_bytes())
    }

    pub(crate) fn count_in_bytes(&self, haystack: &[u8]) -> usize {
        let mut count = 0;
        let _ = self.inner.find_iter(haystack, |_| {
            count += 1;
            true
        });
        count
    }
}

/// 单次判断，空查询视为不匹配
pub fn matches(line: &str, query: &str) -> bool {
    LiteralMatcher::new(query).map_or(false, |m| m.matches(line))
}

/// 单次查找第一次出现的字符偏移
pub fn find_start(line: &str, query: &str) -> Option<usize> {
    LiteralMatcher::new(query).ok()?.find_start(line)
}

/// 单次统计不重叠出现次数
pub fn count_occurrences(line: &str, query: &str) -> usize {
    LiteralMatcher::new(query).map_or(0, |m| m.count_occurrences(line))
}
