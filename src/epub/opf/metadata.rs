//! 元数据处理模块
//!
//! 按“命名空间 + 字段名”保存OPF `<metadata>` 中的条目，保持文档顺序。

use std::collections::HashMap;
use std::fmt;

/// 元数据条目所属的命名空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Dublin Core 元素，如 `<dc:title>`、`<dc:creator>`
    DublinCore,
    /// OPF 的 `<meta>` 标签（name/content 或 property 形式）
    Opf,
}

impl Namespace {
    /// 根据XML前缀判断命名空间，无法识别时返回 `None`
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "dc" => Some(Namespace::DublinCore),
            "opf" | "" => Some(Namespace::Opf),
            _ => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::DublinCore => write!(f, "DC"),
            Namespace::Opf => write!(f, "OPF"),
        }
    }
}

/// 一条元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub namespace: Namespace,
    /// 去掉前缀后的字段名，如 `title`、`cover`、`dcterms:modified`
    pub field: String,
    pub value: String,
    /// 元素上的其他属性（如 `id`、`opf:role`）
    pub attributes: HashMap<String, String>,
}

/// OPF文件中的元数据信息
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    entries: Vec<MetadataEntry>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条元数据，空值会被忽略
    pub fn push(
        &mut self,
        namespace: Namespace,
        field: impl Into<String>,
        value: impl Into<String>,
        attributes: HashMap<String, String>,
    ) {
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        self.entries.push(MetadataEntry {
            namespace,
            field: field.into(),
            value: value.trim().to_string(),
            attributes,
        });
    }

    /// 按命名空间和字段名查找全部取值
    ///
    /// # 参数
    /// * `namespace` - 命名空间
    /// * `field` - 字段名（不含前缀）
    ///
    /// # 返回值
    /// * `Vec<&str>` - 按文档顺序排列的取值，没有时为空
    pub fn get(&self, namespace: Namespace, field: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.namespace == namespace && entry.field == field)
            .map(|entry| entry.value.as_str())
            .collect()
    }

    /// 第一个匹配的取值
    pub fn first(&self, namespace: Namespace, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.namespace == namespace && entry.field == field)
            .map(|entry| entry.value.as_str())
    }

    pub fn title(&self) -> Option<&str> {
        self.first(Namespace::DublinCore, "title")
    }

    pub fn creator(&self) -> Option<&str> {
        self.first(Namespace::DublinCore, "creator")
    }

    pub fn entries(&self) -> &[MetadataEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
