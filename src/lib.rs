pub mod book;
pub mod config;
pub mod epub;
pub mod error;
pub mod markup;

// === 核心API重新导出 ===

/// 书籍与章节（主要接口）
pub use book::{Book, Chapter, FullBookCommit};

/// 错误处理
pub use error::{EditorError, Result};

/// 配置
pub use config::{EditorConfig, ViewMode};

// === 标记转换 ===

pub use markup::{html_to_markup, join_sections, markup_to_html, split_sections, DelimiterMapping};

// === 底层组件（高级用法） ===

/// EPUB包
pub use epub::{EpubError, ItemId, Package};

// === 库信息 ===

/// 版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库的描述
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

// === 便捷函数 ===

/// 快速打开EPUB文件
///
/// 这是 `Book::load` 的便捷包装函数。
///
/// # 示例
///
/// ```no_run
/// let book = epubedit::open("book.epub")?;
/// println!("书名: {}", book.title());
/// println!("{}", book.chapter_markup(0)?);
/// # Ok::<(), epubedit::EditorError>(())
/// ```
pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Book> {
    Book::load(path)
}
