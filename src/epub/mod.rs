pub mod container;
pub mod error;
pub mod opf;
pub mod package;

// 重新导出错误处理
pub use error::{EpubError, Result};

// 重新导出容器相关
pub use container::{Container, RootFile};

// 重新导出EPUB包
pub use package::{ItemId, Package};

// 重新导出OPF相关
pub use opf::{ManifestItem, Metadata, MetadataEntry, Namespace, Opf};
