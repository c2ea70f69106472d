//! 整书视图的拼接与拆分
//!
//! 拼接格式：每章先输出一行 `=== 标题 ===`，空一行，再输出章节标记，章节之间空一行。
//!
//! 拆分按位置对应：第N个分隔行的内容写回第N章，与分隔行里的标题文字无关。
//! 用户改名、删除或调换分隔行都会让内容和章节错位，这是有意保留的约定，
//! 由 [`DelimiterMapping`] 显式表示。

use once_cell::sync::Lazy;
use regex::Regex;

static DELIMITER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^=== (.+?) ===$").unwrap());

/// 生成章节分隔行
pub fn delimiter_line(title: &str) -> String {
    format!("=== {} ===", title)
}

/// 拼接整书缓冲区
///
/// # 参数
/// * `sections` - 按章节顺序排列的 (标题, 标记文本)
///
/// # 返回值
/// * `String` - 去掉末尾空白后的整书文本
pub fn join_sections<'a, I>(sections: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut buffer = String::new();
    for (title, markup) in sections {
        buffer.push_str(&delimiter_line(title));
        buffer.push_str("\n\n");
        buffer.push_str(markup);
        buffer.push_str("\n\n");
    }
    buffer.trim_end().to_string()
}

/// 拆分出的一个章节段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// 分隔行中的标题文字
    pub title: String,
    /// 到下一个分隔行为止的内容，已去掉首尾空白
    pub body: String,
}

/// 拆分结果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SplitBuffer {
    /// 第一个分隔行之前的内容，保存时被忽略
    pub preamble: String,
    pub sections: Vec<Section>,
}

/// 按行首的 `=== 标题 ===` 拆分整书缓冲区
pub fn split_sections(buffer: &str) -> SplitBuffer {
    let buffer = buffer.replace("\r\n", "\n");
    let mut split = SplitBuffer::default();
    let mut open: Option<(String, usize)> = None;

    for captures in DELIMITER.captures_iter(&buffer) {
        let (Some(whole), Some(title)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        match open.take() {
            Some((previous_title, body_start)) => split.sections.push(Section {
                title: previous_title,
                body: buffer[body_start..whole.start()].trim().to_string(),
            }),
            None => split.preamble = buffer[..whole.start()].trim().to_string(),
        }
        open = Some((title.as_str().to_string(), whole.end()));
    }

    match open {
        Some((title, body_start)) => split.sections.push(Section {
            title,
            body: buffer[body_start..].trim().to_string(),
        }),
        None => split.preamble = buffer.trim().to_string(),
    }

    split
}

/// 分隔行序号到章节序号的对应关系
///
/// 只按位置配对：第i个分隔行对应第i章。多出的分隔行被忽略，
/// 没有分隔行对应的章节保持不变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimiterMapping {
    pairs: Vec<(usize, usize)>,
    unmatched_chapters: Vec<usize>,
    ignored_delimiters: Vec<usize>,
}

impl DelimiterMapping {
    pub fn positional(delimiter_count: usize, chapter_count: usize) -> Self {
        let matched = delimiter_count.min(chapter_count);
        Self {
            pairs: (0..matched).map(|index| (index, index)).collect(),
            unmatched_chapters: (matched..chapter_count).collect(),
            ignored_delimiters: (matched..delimiter_count).collect(),
        }
    }

    /// (分隔行序号, 章节序号)
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn unmatched_chapters(&self) -> &[usize] {
        &self.unmatched_chapters
    }

    pub fn ignored_delimiters(&self) -> &[usize] {
        &self.ignored_delimiters
    }

    /// 分隔行数与章节数完全一致
    pub fn is_exact(&self) -> bool {
        self.unmatched_chapters.is_empty() && self.ignored_delimiters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_format() {
        let joined = join_sections([("A", "# A\n\nalpha"), ("B", "beta")]);
        assert_eq!(joined, "=== A ===\n\n# A\n\nalpha\n\n=== B ===\n\nbeta");
    }

    #[test]
    fn test_join_empty_book() {
        assert_eq!(join_sections(std::iter::empty::<(&str, &str)>()), "");
    }

    #[test]
    fn test_join_then_split_is_identity() {
        let chapters = [("第一章", "# 第一章\n\n内容一"), ("Chapter 2", ""), ("Three", "**x**\n\ny")];
        let split = split_sections(&join_sections(chapters));

        assert_eq!(split.preamble, "");
        assert_eq!(split.sections.len(), chapters.len());
        for (section, (title, markup)) in split.sections.iter().zip(chapters) {
            assert_eq!(section.title, title);
            assert_eq!(section.body, markup);
        }
    }

    #[test]
    fn test_split_ignores_preamble() {
        let split = split_sections("notes before\n=== X ===\nbody x\n=== Y ===\n\nbody y\n");
        assert_eq!(split.preamble, "notes before");
        assert_eq!(
            split.sections,
            vec![
                Section { title: "X".into(), body: "body x".into() },
                Section { title: "Y".into(), body: "body y".into() },
            ]
        );
    }

    #[test]
    fn test_delimiter_must_be_a_whole_line() {
        let split = split_sections("=== A ===\ntext === B === text\n  === C ===\n");
        assert_eq!(split.sections.len(), 1);
        assert_eq!(split.sections[0].body, "text === B === text\n  === C ===");
    }

    #[test]
    fn test_split_without_delimiters() {
        let split = split_sections("just text");
        assert!(split.sections.is_empty());
        assert_eq!(split.preamble, "just text");
    }

    #[test]
    fn test_split_crlf_buffer() {
        let split = split_sections("=== A ===\r\n\r\nbody\r\n");
        assert_eq!(split.sections[0].title, "A");
        assert_eq!(split.sections[0].body, "body");
    }

    #[test]
    fn test_positional_mapping_exact() {
        let mapping = DelimiterMapping::positional(2, 2);
        assert_eq!(mapping.pairs(), &[(0, 0), (1, 1)]);
        assert!(mapping.is_exact());
    }

    #[test]
    fn test_positional_mapping_fewer_delimiters() {
        let mapping = DelimiterMapping::positional(1, 3);
        assert_eq!(mapping.pairs(), &[(0, 0)]);
        assert_eq!(mapping.unmatched_chapters(), &[1, 2]);
        assert!(mapping.ignored_delimiters().is_empty());
        assert!(!mapping.is_exact());
    }

    #[test]
    fn test_positional_mapping_extra_delimiters() {
        let mapping = DelimiterMapping::positional(4, 2);
        assert_eq!(mapping.pairs(), &[(0, 0), (1, 1)]);
        assert_eq!(mapping.ignored_delimiters(), &[2, 3]);
        assert!(mapping.unmatched_chapters().is_empty());
    }
}
