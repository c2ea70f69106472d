use std::path::PathBuf;
use thiserror::Error;

use crate::epub::EpubError;

pub type Result<T> = std::result::Result<T, EditorError>;

/// 面向调用方（命令行或界面）的错误类型
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("无法打开 {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: EpubError,
    },

    #[error("无法保存到 {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: EpubError,
    },

    #[error("无法读取输入文件 {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("章节编号 {number} 无效，可用范围为 1-{count}")]
    InvalidChapterNumber { number: usize, count: usize },

    #[error("章节索引 {index}（从0开始）超出范围（共 {count} 章）")]
    ChapterOutOfRange { index: usize, count: usize },

    #[error("章节 \"{chapter}\" 无法转换: {reason}")]
    Conversion { chapter: String, reason: String },

    #[error("EPUB包错误: {0}")]
    Package(#[from] EpubError),

    #[error("配置文件错误: {0}")]
    Config(String),
}
