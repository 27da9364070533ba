/// 一条匹配记录（每个匹配行一条）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// 文件的绝对路径
    pub file_path: String,
    /// 行号，从 1 开始
    pub line_number: u64,
    /// 去除首尾空白后的整行内容
    pub line_text: String,
}

impl MatchRecord {
    pub fn new(file_path: impl Into<String>, line_number: u64, line_text: &str) -> Self {
        debug_assert!(line_number >= 1);
        Self {
            file_path: file_path.into(),
            line_number,
            line_text: line_text.trim().to_string(),
        }
    }
}

/// 一次搜索的完整结果，按 (文件路径, 行号) 升序排列
///
/// 只能通过 [`aggregate`] 构建，因此任何 `ResultSet` 都是有序的。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    records: Vec<MatchRecord>,
}

/// 展示用的一行：同一文件的连续记录只在第一行带文件路径
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRow<'a> {
    pub file_path: Option<&'a str>,
    pub record: &'a MatchRecord,
}

/// 对所有匹配记录排序，生成结果集
pub fn aggregate(mut records: Vec<MatchRecord>) -> ResultSet {
    // 稳定排序
    records.sort_by(|a, b| {
        a.file_path
            .cmp(&b.file_path)
            .then(a.line_number.cmp(&b.line_number))
    });
    ResultSet { records }
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MatchRecord> {
        self.records.iter()
    }

    /// 按下标（从 0 开始）取记录
    pub fn get(&self, index: usize) -> Option<&MatchRecord> {
        self.records.get(index)
    }

    /// 匹配到的不同文件数
    pub fn matched_files(&self) -> usize {
        self.display_rows()
            .filter(|row| row.file_path.is_some())
            .count()
    }

    /// 折叠重复文件路径后的展示行
    pub fn display_rows(&self) -> impl Iterator<Item = DisplayRow<'_>> + '_ {
        let mut previous: Option<&str> = None;
        self.records.iter().map(move |record| {
            let current = record.file_path.as_str();
            let file_path = if previous == Some(current) {
                None
            } else {
                Some(current)
            };
            previous = Some(current);
            DisplayRow { file_path, record }
        })
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a MatchRecord;
    type IntoIter = std::slice::Iter<'a, MatchRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl From<ResultSet> for Vec<MatchRecord> {
    fn from(set: ResultSet) -> Self {
        set.records
    }
}
