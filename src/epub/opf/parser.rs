//! OPF解析器模块
//!
//! 提供OPF（Open Packaging Format）文件的XML解析功能。

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::{
    manifest::ManifestItem,
    metadata::{Metadata, Namespace},
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;

/// OPF文件解析结果
#[derive(Debug, Clone)]
pub struct Opf {
    /// EPUB版本
    pub version: String,
    /// 元数据
    pub metadata: Metadata,
    /// 清单项，保持在OPF中出现的顺序
    pub manifest: Vec<ManifestItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Metadata,
    Manifest,
}

/// 正在读取文本内容的元数据元素
struct PendingEntry {
    namespace: Namespace,
    field: String,
    attributes: HashMap<String, String>,
    text: String,
}

impl Opf {
    /// 解析OPF文件内容
    ///
    /// # 参数
    /// * `xml_content` - OPF文件的XML内容
    ///
    /// # 返回值
    /// * `Result<Opf>` - 解析后的OPF信息；缺少 `<package>` 根元素时返回 `OpfParseError`
    pub fn parse_xml(xml_content: &str) -> Result<Opf> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);

        let mut version = None;
        let mut metadata = Metadata::new();
        let mut manifest = Vec::new();

        let mut section = Section::None;
        let mut pending: Option<PendingEntry> = None;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => match e.local_name().as_ref() {
                    b"package" => version = Some(Self::attribute(e, b"version")?.unwrap_or_default()),
                    b"metadata" => section = Section::Metadata,
                    b"manifest" => section = Section::Manifest,
                    b"item" if section == Section::Manifest => {
                        Self::parse_manifest_item(e, &mut manifest)?;
                    }
                    _ if section == Section::Metadata => {
                        pending = Self::start_metadata_element(e, &mut metadata)?;
                    }
                    _ => {}
                },
                Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"item" if section == Section::Manifest => {
                        Self::parse_manifest_item(e, &mut manifest)?;
                    }
                    _ if section == Section::Metadata => {
                        Self::start_metadata_element(e, &mut metadata)?;
                    }
                    _ => {}
                },
                Event::Text(ref e) => {
                    if let Some(entry) = pending.as_mut() {
                        entry.text.push_str(&e.unescape()?);
                    }
                }
                Event::CData(ref e) => {
                    if let Some(entry) = pending.as_mut() {
                        entry.text.push_str(&String::from_utf8_lossy(e));
                    }
                }
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"metadata" | b"manifest" => section = Section::None,
                    _ => {
                        if let Some(entry) = pending.take() {
                            metadata.push(entry.namespace, entry.field, entry.text, entry.attributes);
                        }
                    }
                },
                Event::Eof => break,
                _ => {}
            }
        }

        let version = version
            .ok_or_else(|| EpubError::OpfParseError("缺少package根元素".to_string()))?;

        Ok(Opf {
            version,
            metadata,
            manifest,
        })
    }

    /// 按ID查找清单项
    pub fn manifest_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    /// 全部正文文档，按清单顺序
    pub fn document_items(&self) -> impl Iterator<Item = &ManifestItem> {
        self.manifest.iter().filter(|item| item.is_document())
    }

    /// 读取单个属性值（按本地名匹配）
    fn attribute(e: &BytesStart, name: &[u8]) -> Result<Option<String>> {
        for attr in e.attributes() {
            let attr = attr?;
            if attr.key.local_name().as_ref() == name {
                return Ok(Some(attr.unescape_value()?.into_owned()));
            }
        }
        Ok(None)
    }

    /// 处理metadata中的一个元素
    ///
    /// `<meta name=".." content=".."/>` 直接写入；其余元素返回待收集文本的条目。
    fn start_metadata_element(
        e: &BytesStart,
        metadata: &mut Metadata,
    ) -> Result<Option<PendingEntry>> {
        let qualified = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let (prefix, local) = match qualified.split_once(':') {
            Some((prefix, local)) => (prefix.to_string(), local.to_string()),
            None => (String::new(), qualified.clone()),
        };

        let mut attributes = HashMap::new();
        for attr in e.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            attributes.insert(key, attr.unescape_value()?.into_owned());
        }

        if local == "meta" {
            if let (Some(name), Some(content)) = (attributes.get("name"), attributes.get("content")) {
                metadata.push(Namespace::Opf, name.clone(), content.clone(), attributes.clone());
                return Ok(None);
            }
            return Ok(attributes.get("property").cloned().map(|property| PendingEntry {
                namespace: Namespace::Opf,
                field: property,
                attributes,
                text: String::new(),
            }));
        }

        // 未知前缀的扩展元素（如calibre自定义标签）不记录
        Ok(Namespace::from_prefix(&prefix).map(|namespace| PendingEntry {
            namespace,
            field: local,
            attributes,
            text: String::new(),
        }))
    }

    /// 解析清单项
    fn parse_manifest_item(e: &BytesStart, manifest: &mut Vec<ManifestItem>) -> Result<()> {
        let mut item = ManifestItem::new(String::new(), String::new(), String::new());

        for attr in e.attributes() {
            let attr = attr?;
            let value = attr.unescape_value()?.into_owned();
            match attr.key.local_name().as_ref() {
                b"id" => item.id = value,
                b"href" => item.href = value,
                b"media-type" => item.media_type = value,
                b"properties" => item.properties = Some(value),
                _ => {}
            }
        }

        if !item.id.is_empty() && !item.href.is_empty() && !item.media_type.is_empty() {
            manifest.push(item);
        }

        Ok(())
    }
}
