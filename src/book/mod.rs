//! 书籍与章节模型
//!
//! [`Book`] 独占底层的 [`Package`]，章节通过清单ID引用包内文档。
//! 每次打开都整体重建，不与之前加载的书合并任何状态。

mod chapter;

pub use chapter::{Chapter, chapter_document, extract_plain_text, extract_title};

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::EditorConfig;
use crate::epub::{ItemId, Package};
use crate::error::{EditorError, Result};
use crate::markup::{DelimiterMapping, html_to_markup, join_sections, markup_to_html, split_sections};

const UNKNOWN_TITLE: &str = "Unknown Title";
const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// 整书提交的结果汇总
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullBookCommit {
    /// 实际写回的章节序号
    pub updated: Vec<usize>,
    /// 缓冲区中没有对应分隔行、保持不变的章节序号
    pub unmatched_chapters: Vec<usize>,
    /// 超出章节数而被忽略的分隔行序号
    pub ignored_delimiters: Vec<usize>,
    /// 分隔行标题与章节标题不一致的章节序号（内容仍按位置写回）
    pub renamed: Vec<usize>,
}

/// 一本打开的书
#[derive(Debug, Clone)]
pub struct Book {
    path: PathBuf,
    package: Package,
    chapters: Vec<Chapter>,
}

impl Book {
    /// 使用默认配置打开EPUB文件
    ///
    /// # 参数
    /// * `path` - EPUB文件路径
    ///
    /// # 返回值
    /// * `Result<Book>` - 文件无法读取或不是有效EPUB时返回 `EditorError::Load`
    ///
    /// # 示例
    ///
    /// ```no_run
    /// use epubedit::Book;
    ///
    /// let book = Book::load("book.epub")?;
    /// for chapter in book.chapters() {
    ///     println!("{}", chapter.title());
    /// }
    /// # Ok::<(), epubedit::EditorError>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Book> {
        Self::load_with_config(path, &EditorConfig::default())
    }

    pub fn load_with_config<P: AsRef<Path>>(path: P, config: &EditorConfig) -> Result<Book> {
        let path = path.as_ref();
        let package = Package::open(path).map_err(|source| EditorError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_package(path, package, config))
    }

    /// 从已打开的包建立章节列表
    ///
    /// 章节顺序即清单中正文文档的顺序；没有 `<title>` 的文档按它在正文文档
    /// 中的位置（从1开始）合成标题。
    pub fn from_package<P: Into<PathBuf>>(path: P, package: Package, config: &EditorConfig) -> Book {
        let mut chapters: Vec<Chapter> = Vec::new();

        for item in package.document_items() {
            let source = ItemId::new(item.id.clone());
            let html = match package.item_content(&source) {
                Ok(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                Err(err) => {
                    warn!(item = %item.id, "读取章节失败: {err}");
                    String::new()
                }
            };
            let position = chapters.len() + 1;
            let chapter = Chapter::from_document(source, &html, || config.synthesized_title(position));
            debug!(position, title = chapter.title(), item = %item.id, "加载章节");
            chapters.push(chapter);
        }

        let path = path.into();
        info!(path = %path.display(), chapters = chapters.len(), "书籍加载完成");
        Book {
            path,
            package,
            chapters,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn chapter(&self, index: usize) -> Result<&Chapter> {
        self.chapters.get(index).ok_or(EditorError::ChapterOutOfRange {
            index,
            count: self.chapters.len(),
        })
    }

    /// 把面向用户、从1开始的章节编号转换为章节索引
    pub fn chapter_index(&self, number: usize) -> Result<usize> {
        let count = self.chapters.len();
        match number.checked_sub(1) {
            Some(index) if index < count => Ok(index),
            _ => Err(EditorError::InvalidChapterNumber { number, count }),
        }
    }

    /// 书名（Dublin Core `title`）
    pub fn title(&self) -> &str {
        self.package.opf().metadata.title().unwrap_or(UNKNOWN_TITLE)
    }

    /// 第一作者（Dublin Core `creator`）
    pub fn author(&self) -> &str {
        self.package.opf().metadata.creator().unwrap_or(UNKNOWN_AUTHOR)
    }

    /// 单章视图的标记文本
    pub fn chapter_markup(&self, index: usize) -> Result<String> {
        let chapter = self.chapter(index)?;
        let bytes = self.package.item_content(chapter.source())?;
        let html = std::str::from_utf8(bytes).map_err(|e| EditorError::Conversion {
            chapter: chapter.title().to_string(),
            reason: format!("内容不是有效的UTF-8: {}", e),
        })?;
        Ok(html_to_markup(html))
    }

    /// 整书视图的标记文本
    pub fn full_book_markup(&self) -> Result<String> {
        let markups = (0..self.chapters.len())
            .map(|index| self.chapter_markup(index))
            .collect::<Result<Vec<_>>>()?;

        Ok(join_sections(
            self.chapters
                .iter()
                .zip(&markups)
                .map(|(chapter, markup)| (chapter.title(), markup.as_str())),
        ))
    }

    /// 把编辑后的标记写回单个章节，其他章节不受影响
    pub fn commit_chapter_edit(&mut self, index: usize, markup: &str) -> Result<()> {
        let chapter = self.chapter(index)?;
        let document = chapter_document(chapter.title(), &markup_to_html(markup));
        let source = chapter.source().clone();

        self.package.set_item_content(&source, document.into_bytes())?;
        info!(index, item = %source, "章节已更新");
        Ok(())
    }

    /// 拆分整书缓冲区并按位置写回各章节
    ///
    /// 第N个分隔行的内容写回第N章，不比较分隔行中的标题；
    /// 没有对应分隔行的章节保持不变，多出的分隔行被忽略。
    pub fn commit_full_book_edit(&mut self, buffer: &str) -> Result<FullBookCommit> {
        let split = split_sections(buffer);
        let mapping = DelimiterMapping::positional(split.sections.len(), self.chapters.len());

        if !mapping.is_exact() {
            warn!(
                delimiters = split.sections.len(),
                chapters = self.chapters.len(),
                unmatched = ?mapping.unmatched_chapters(),
                ignored = ?mapping.ignored_delimiters(),
                "分隔行数量与章节数量不一致"
            );
        }

        let mut updated = Vec::with_capacity(mapping.pairs().len());
        let mut renamed = Vec::new();
        for &(delimiter_index, chapter_index) in mapping.pairs() {
            let section = &split.sections[delimiter_index];
            let title = self.chapters[chapter_index].title();
            if section.title != title {
                warn!(
                    chapter = chapter_index,
                    expected = title,
                    found = %section.title,
                    "分隔行标题与章节标题不一致，仍按位置写回"
                );
                renamed.push(chapter_index);
            }
            self.commit_chapter_edit(chapter_index, &section.body)?;
            updated.push(chapter_index);
        }

        Ok(FullBookCommit {
            updated,
            unmatched_chapters: mapping.unmatched_chapters().to_vec(),
            ignored_delimiters: mapping.ignored_delimiters().to_vec(),
            renamed,
        })
    }

    /// 保存到指定路径
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.package.save(path).map_err(|source| EditorError::Save {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 保存回打开时的文件
    pub fn save_in_place(&self) -> Result<()> {
        self.save(&self.path)
    }
}
