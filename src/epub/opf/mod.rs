//! OPF（Open Packaging Format）包文件解析模块
//!
//! 只解析编辑章节所需的部分：清单（manifest）和元数据（metadata）。

mod manifest;
mod metadata;
mod parser;

pub use manifest::ManifestItem;
pub use metadata::{Metadata, MetadataEntry, Namespace};
pub use parser::Opf;
