//! 标记 → HTML
//!
//! 先用正则替换1-3级标题，再逐行处理粗体、斜体、下划线，最后按空行分段。
//! 行内标记按分隔符栈配对，输出的标签总是正确嵌套；配不上对的标记原样保留。
//! 标题只支持1-3级，`####` 及以上保持原样作为段落文本。

use once_cell::sync::Lazy;
use regex::Regex;

static HEADING_1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#[ \t]+(\S.*?)[ \t]*$").unwrap());
static HEADING_2: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^##[ \t]+(\S.*?)[ \t]*$").unwrap());
static HEADING_3: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^###[ \t]+(\S.*?)[ \t]*$").unwrap());
static BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").unwrap());

/// 已转换的标题块以这些标签开头，不再包裹 `<p>`
const HEADING_TAGS: [&str; 3] = ["<h1>", "<h2>", "<h3>"];

/// 把标记文本转换为HTML片段
///
/// 对任意输入都不会失败：未配对的标记（如单独的 `**`）原样保留为文本。
/// 用户文本中的 `&`、`<`、`>` 会先被转义。
///
/// # 示例
///
/// ```rust
/// use epubedit::markup::markup_to_html;
///
/// let html = markup_to_html("# 标题\n\n**bold** and *italic*");
/// assert_eq!(html, "<h1>标题</h1>\n<p><strong>bold</strong> and <em>italic</em></p>");
/// ```
pub fn markup_to_html(markup: &str) -> String {
    let text = escape_text(&markup.replace("\r\n", "\n"));

    let text = HEADING_1.replace_all(&text, "<h1>${1}</h1>");
    let text = HEADING_2.replace_all(&text, "<h2>${1}</h2>");
    let text = HEADING_3.replace_all(&text, "<h3>${1}</h3>");

    // 行内标记不跨行
    let text = text.split('\n').map(render_inline).collect::<Vec<_>>().join("\n");

    BLANK_LINE
        .split(&text)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| {
            if HEADING_TAGS.iter().any(|tag| block.starts_with(tag)) {
                block.to_string()
            } else {
                format!("<p>{}</p>", block)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// 一段连续的 `*` 或 `_`
#[derive(Debug)]
struct DelimiterRun {
    marker: char,
    /// 尚未配对、按原样输出的字符数
    remaining: usize,
    can_open: bool,
    can_close: bool,
    /// 在这里开始的标签，先配对的在内层
    opens: Vec<&'static str>,
    /// 在这里结束的标签，先配对的在内层
    closes: Vec<&'static str>,
}

#[derive(Debug)]
enum Piece {
    Text(String),
    Run(DelimiterRun),
}

fn render_inline(line: &str) -> String {
    let mut pieces = split_delimiter_runs(line);
    pair_delimiters(&mut pieces);

    let mut html = String::with_capacity(line.len());
    for piece in &pieces {
        match piece {
            Piece::Text(text) => html.push_str(text),
            Piece::Run(run) => {
                for tag in &run.closes {
                    html.push_str(&format!("</{}>", tag));
                }
                html.extend(std::iter::repeat_n(run.marker, run.remaining));
                for tag in run.opens.iter().rev() {
                    html.push_str(&format!("<{}>", tag));
                }
            }
        }
    }
    html
}

/// 把一行切成文本和分隔符段
///
/// 分隔符后面紧跟非空白字符才能作为开始，前面紧挨非空白字符才能作为结束。
/// 单个 `_` 不是标记。
fn split_delimiter_runs(line: &str) -> Vec<Piece> {
    let chars: Vec<char> = line.chars().collect();
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if ch != '*' && ch != '_' {
            text.push(ch);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && chars[i] == ch {
            i += 1;
        }
        let len = i - start;
        if ch == '_' && len < 2 {
            text.push(ch);
            continue;
        }

        if !text.is_empty() {
            pieces.push(Piece::Text(std::mem::take(&mut text)));
        }
        let before = start.checked_sub(1).map(|j| chars[j]);
        let after = chars.get(i).copied();
        pieces.push(Piece::Run(DelimiterRun {
            marker: ch,
            remaining: len,
            can_open: after.is_some_and(|c| !c.is_whitespace()),
            can_close: before.is_some_and(|c| !c.is_whitespace()),
            opens: Vec::new(),
            closes: Vec::new(),
        }));
    }

    if !text.is_empty() {
        pieces.push(Piece::Text(text));
    }
    pieces
}

/// 从左到右为每个可结束的分隔符寻找最近的同类开始分隔符
///
/// 配对成功后，两者之间尚未配对的开始分隔符全部作废，
/// 因此生成的标签不会交叉。
fn pair_delimiters(pieces: &mut [Piece]) {
    for closer in 0..pieces.len() {
        loop {
            let (marker, closer_left) = match &pieces[closer] {
                Piece::Run(run) if run.can_close && run.remaining > 0 => (run.marker, run.remaining),
                _ => break,
            };

            let minimum = if marker == '_' { 2 } else { 1 };
            let opener = (0..closer).rev().find_map(|i| match &pieces[i] {
                Piece::Run(run) if run.marker == marker && run.can_open && run.remaining >= minimum => {
                    Some((i, run.remaining))
                }
                _ => None,
            });
            let Some((opener, opener_left)) = opener else {
                break;
            };
            let Some((width, tag)) = inline_tag(marker, opener_left, closer_left) else {
                break;
            };

            for piece in &mut pieces[opener + 1..closer] {
                if let Piece::Run(run) = piece {
                    run.can_open = false;
                }
            }
            if let Piece::Run(run) = &mut pieces[opener] {
                run.remaining -= width;
                run.opens.push(tag);
            }
            if let Piece::Run(run) = &mut pieces[closer] {
                run.remaining -= width;
                run.closes.push(tag);
            }
        }
    }
}

/// 根据两端剩余的分隔符数决定使用的标签和消耗的字符数
///
/// 两端都是 `***` 时先配斜体，`***x***` 读作粗体包着斜体。
fn inline_tag(marker: char, opener_left: usize, closer_left: usize) -> Option<(usize, &'static str)> {
    match marker {
        '_' if opener_left >= 2 && closer_left >= 2 => Some((2, "u")),
        '_' => None,
        _ if opener_left == 3 && closer_left == 3 => Some((1, "em")),
        _ if opener_left >= 2 && closer_left >= 2 => Some((2, "strong")),
        _ => Some((1, "em")),
    }
}

/// 转义HTML文本中的特殊字符
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
