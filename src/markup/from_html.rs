//! HTML → 标记
//!
//! 递归遍历文档树：标题和段落作为块输出，块内的粗体、斜体、下划线就地转换成
//! 对应标记。不在任何块内的行内元素按原样单独输出（不附加空行）。
//! 其他元素只向下查找，块外的裸文本被丢弃。

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

/// 解析HTML字符串并转换为标记文本
pub fn html_to_markup(html: &str) -> String {
    let document = Html::parse_document(html);
    document_to_markup(&document)
}

/// 把已解析的HTML文档转换为标记文本
///
/// 只处理 `<body>` 内的内容，结果去掉首尾空白。
pub fn document_to_markup(document: &Html) -> String {
    let root = document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut markup = String::new();
    render_blocks(root, &mut markup);
    markup.trim().to_string()
}

/// 行内标记，`None` 表示不是受支持的行内元素
fn inline_marker(tag_name: &str) -> Option<&'static str> {
    match tag_name {
        "strong" | "b" => Some("**"),
        "em" | "i" => Some("*"),
        "u" => Some("__"),
        _ => None,
    }
}

fn heading_level(tag_name: &str) -> Option<usize> {
    match tag_name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn is_skipped(tag_name: &str) -> bool {
    matches!(tag_name, "head" | "title" | "script" | "style" | "template")
}

/// 块级遍历：只输出受支持的元素
fn render_blocks(element: ElementRef, markup: &mut String) {
    for child in element.children().filter_map(ElementRef::wrap) {
        let tag_name = child.value().name();

        if is_skipped(tag_name) {
            continue;
        }

        if let Some(level) = heading_level(tag_name) {
            let text = inline_text(child);
            if !text.is_empty() {
                markup.push_str(&"#".repeat(level));
                markup.push(' ');
                markup.push_str(&text);
                markup.push_str("\n\n");
            }
        } else if tag_name == "p" {
            let text = inline_text(child);
            if !text.is_empty() {
                markup.push_str(&text);
                markup.push_str("\n\n");
            }
        } else if let Some(marker) = inline_marker(tag_name) {
            push_marked(markup, marker, &inline_text(child));
        } else {
            render_blocks(child, markup);
        }
    }
}

/// 块内文本：行内元素转换为标记，空白压缩为单个空格
fn inline_text(element: ElementRef) -> String {
    let mut raw = String::new();
    render_inline(element, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_inline(element: ElementRef, raw: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => raw.push_str(text),
            Node::Element(_) => {
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };
                let tag_name = child_element.value().name();
                if is_skipped(tag_name) {
                    continue;
                }
                if let Some(marker) = inline_marker(tag_name) {
                    push_marked(raw, marker, &inline_text(child_element));
                } else if tag_name == "br" {
                    raw.push(' ');
                } else {
                    render_inline(child_element, raw);
                }
            }
            _ => {}
        }
    }
}

fn push_marked(out: &mut String, marker: &str, text: &str) {
    if text.is_empty() {
        return;
    }
    out.push_str(marker);
    out.push_str(text);
    out.push_str(marker);
}
