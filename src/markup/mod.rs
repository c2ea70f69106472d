//! 简化标记语法与HTML之间的双向转换
//!
//! 支持的语法只有五种：
//!
//! | 标记 | HTML |
//! |---|---|
//! | `# 标题`（1-6级，回写只支持1-3级） | `<h1>`..`<h6>` |
//! | 空行分隔的文本块 | `<p>` |
//! | `**粗体**` | `<strong>` / `<b>` |
//! | `*斜体*` | `<em>` / `<i>` |
//! | `__下划线__` | `<u>` |
//!
//! 另外 [`delimiter`] 负责整书视图：用 `=== 章节标题 ===` 分隔行把全部章节
//! 拼成一个缓冲区，并在保存时重新拆分。

pub mod delimiter;
pub mod from_html;
pub mod to_html;

pub use delimiter::{DelimiterMapping, Section, SplitBuffer, delimiter_line, join_sections, split_sections};
pub use from_html::{document_to_markup, html_to_markup};
pub use to_html::markup_to_html;
