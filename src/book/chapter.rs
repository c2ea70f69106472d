//! 章节信息
//!
//! 章节只保存标题、纯文本预览和指向包内文档的清单ID；
//! 标记文本每次都从文档当前内容重新生成。

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

use crate::epub::ItemId;
use crate::markup::to_html::escape_text;

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

/// 书中的一个章节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    title: String,
    source: ItemId,
    plain_text: String,
}

impl Chapter {
    /// 从章节文档构造
    ///
    /// # 参数
    /// * `source` - 文档对应的清单ID
    /// * `html` - 文档内容
    /// * `fallback_title` - 文档没有 `<title>` 时使用的标题
    pub fn from_document(source: ItemId, html: &str, fallback_title: impl FnOnce() -> String) -> Self {
        let document = Html::parse_document(html);
        let title = extract_title(&document).unwrap_or_else(fallback_title);
        let plain_text = extract_plain_text(&document);
        Self {
            title,
            source,
            plain_text,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn source(&self) -> &ItemId {
        &self.source
    }

    pub fn plain_text(&self) -> &str {
        &self.plain_text
    }

    /// 纯文本的前 `max_chars` 个字符，被截断时以省略号结尾
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.plain_text.chars();
        let preview: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{}…", preview)
        } else {
            preview
        }
    }
}

/// 提取 `<title>` 的文字，空白压缩；没有或为空时返回 `None`
pub fn extract_title(document: &Html) -> Option<String> {
    let title = document.select(&TITLE).next()?;
    let text = title.text().collect::<String>();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// 提取 `<body>` 中的纯文本，空白压缩为单个空格
pub fn extract_plain_text(document: &Html) -> String {
    let mut text = String::new();
    match document.select(&BODY).next() {
        Some(body) => collect_text(body, &mut text),
        None => collect_text(document.root_element(), &mut text),
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef, result: &mut String) {
    let tag_name = element.value().name();

    // 跳过文档头部、脚本和媒体元素
    if matches!(
        tag_name,
        "head" | "script" | "style" | "title" | "noscript" | "img" | "svg" | "video" | "audio"
    ) {
        return;
    }

    for node in element.children() {
        match node.value() {
            Node::Text(text) => result.push_str(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(node) {
                    collect_text(child, result);
                }
            }
            _ => {}
        }
    }

    // 块级元素后补空格，避免相邻段落的文字粘连
    if matches!(
        tag_name,
        "div" | "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "br" | "td" | "th"
    ) {
        result.push(' ');
    }
}

/// 生成写回包内的章节文档
pub fn chapter_document(title: &str, body_html: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
<title>{}</title>
</head>
<body>
{}
</body>
</html>
"#,
        escape_text(title),
        body_html
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_document() {
        let chapter = Chapter::from_document(
            ItemId::new("c1"),
            "<html><head><title>\n  第一章  开端 </title></head><body><p>内容</p></body></html>",
            || "Chapter 1".to_string(),
        );
        assert_eq!(chapter.title(), "第一章 开端");
        assert_eq!(chapter.source().as_str(), "c1");
    }

    #[test]
    fn test_missing_or_empty_title_uses_fallback() {
        let missing = Chapter::from_document(ItemId::new("a"), "<p>x</p>", || "Chapter 3".to_string());
        assert_eq!(missing.title(), "Chapter 3");

        let empty = Chapter::from_document(
            ItemId::new("b"),
            "<html><head><title>  </title></head><body></body></html>",
            || "Chapter 4".to_string(),
        );
        assert_eq!(empty.title(), "Chapter 4");
    }

    #[test]
    fn test_plain_text_skips_head_and_separates_blocks() {
        let chapter = Chapter::from_document(
            ItemId::new("c"),
            "<html><head><title>T</title><style>p{}</style></head>\
             <body><h1>Heading</h1><p>One <b>bold</b></p><p>Two</p><img src=\"x.png\"/></body></html>",
            String::new,
        );
        assert_eq!(chapter.plain_text(), "Heading One bold Two");
    }

    #[test]
    fn test_preview_truncates_by_chars() {
        let chapter = Chapter::from_document(ItemId::new("c"), "<p>一二三四五</p>", || "t".to_string());
        assert_eq!(chapter.preview(3), "一二三…");
        assert_eq!(chapter.preview(10), "一二三四五");
    }

    #[test]
    fn test_chapter_document_skeleton() {
        let document = chapter_document("Tom & Jerry", "<p>body</p>");
        assert!(document.contains("<title>Tom &amp; Jerry</title>"));
        assert!(document.contains("<body>\n<p>body</p>\n</body>"));
        assert!(document.starts_with("<?xml"));

        let parsed = Html::parse_document(&document);
        assert_eq!(extract_title(&parsed).as_deref(), Some("Tom & Jerry"));
    }
}
