//! EPUB包的内存表示
//!
//! 打开时把压缩包中的全部文件读入内存，章节修改只替换对应条目的字节，
//! 保存时按原顺序重新打包（mimetype总是第一个且不压缩）。
//! OPF、NCX、导航文档等不会被重新生成。

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;

use percent_encoding::percent_decode_str;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::epub::container::{CONTAINER_PATH, Container};
use crate::epub::error::{EpubError, Result};
use crate::epub::opf::{ManifestItem, Namespace, Opf};

/// mimetype文件名及其必须的内容
const MIMETYPE_PATH: &str = "mimetype";
const EPUB_MIMETYPE: &str = "application/epub+zip";

/// 清单项的ID，作为章节指向包内文档的键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 压缩包中的一个文件
#[derive(Debug, Clone)]
struct Entry {
    name: String,
    data: Vec<u8>,
}

/// 已读入内存的EPUB包
#[derive(Debug, Clone)]
pub struct Package {
    entries: Vec<Entry>,
    opf_path: String,
    opf: Opf,
}

impl Package {
    /// 从文件路径打开EPUB包
    ///
    /// # 参数
    /// * `path` - epub文件的路径
    ///
    /// # 返回值
    /// * `Result<Package>` - 成功返回包实例；mimetype不正确、container.xml或OPF
    ///   无法解析、正文文档缺失时返回错误
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Package> {
        let path = path.as_ref();
        info!(path = %path.display(), "打开EPUB包");
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// 从任意可定位的读取器解析EPUB包
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Package> {
        let mut archive = ZipArchive::new(reader)?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            entries.push(Entry { name, data });
        }

        validate_mimetype(&entries)?;

        let container_xml = entry_text(&entries, CONTAINER_PATH)?
            .ok_or_else(|| EpubError::InvalidEpub(format!("缺少{}", CONTAINER_PATH)))?;
        let container = Container::parse_xml(&container_xml)?;
        let opf_path = container
            .opf_path()
            .map(str::to_string)
            .ok_or_else(|| {
                EpubError::ContainerParseError("container.xml中没有找到有效的rootfile".to_string())
            })?;

        let opf_xml = entry_text(&entries, &opf_path)?
            .ok_or_else(|| EpubError::OpfParseError(format!("找不到OPF文件: {}", opf_path)))?;
        let opf = Opf::parse_xml(&opf_xml).map_err(|e| match e {
            EpubError::XmlError(xml_err) => EpubError::OpfParseError(format!("XML解析错误: {}", xml_err)),
            other => other,
        })?;

        let package = Package {
            entries,
            opf_path,
            opf,
        };

        for item in package.document_items() {
            let path = package.item_path(item);
            if package.entry_index(&path).is_none() {
                return Err(EpubError::MissingItem {
                    id: item.id.clone(),
                    path,
                });
            }
        }

        debug!(
            entries = package.entries.len(),
            manifest = package.opf.manifest.len(),
            opf = %package.opf_path,
            "EPUB包解析完成"
        );
        Ok(package)
    }

    /// 解析后的OPF信息
    pub fn opf(&self) -> &Opf {
        &self.opf
    }

    /// OPF文件在压缩包中的路径
    pub fn opf_path(&self) -> &str {
        &self.opf_path
    }

    /// 全部正文文档，按清单顺序
    pub fn document_items(&self) -> impl Iterator<Item = &ManifestItem> {
        self.opf.document_items()
    }

    /// 按命名空间和字段名查找包级元数据
    pub fn metadata(&self, namespace: Namespace, field: &str) -> Vec<&str> {
        self.opf.metadata.get(namespace, field)
    }

    /// 压缩包中全部文件名，按原顺序
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// 读取清单项的原始字节
    pub fn item_content(&self, id: &ItemId) -> Result<&[u8]> {
        let index = self.item_entry_index(id)?;
        Ok(&self.entries[index].data)
    }

    /// 替换清单项的内容
    pub fn set_item_content(&mut self, id: &ItemId, content: Vec<u8>) -> Result<()> {
        let index = self.item_entry_index(id)?;
        debug!(item = %id, bytes = content.len(), "替换清单项内容");
        self.entries[index].data = content;
        Ok(())
    }

    /// 把整个包写入任意可定位的写入器
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file(MIMETYPE_PATH, stored)?;
        zip.write_all(EPUB_MIMETYPE.as_bytes())?;

        for entry in self.entries.iter().filter(|entry| entry.name != MIMETYPE_PATH) {
            zip.start_file(entry.name.as_str(), deflated)?;
            zip.write_all(&entry.data)?;
        }

        zip.finish()?;
        Ok(())
    }

    /// 保存到指定路径
    ///
    /// 先写入同目录下随机命名的临时文件，成功后再替换目标文件；
    /// 任何一步失败时临时文件都会被删除，目标文件保持原样。
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let parent_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut temp_file = tempfile::Builder::new()
            .prefix(".epubedit_")
            .suffix(".tmp")
            .tempfile_in(parent_dir)?;

        {
            let mut writer = BufWriter::new(temp_file.as_file_mut());
            self.write_to(&mut writer)?;
            writer.flush()?;
        }
        temp_file.as_file().sync_all()?;

        temp_file.persist(path).map_err(|e| e.error)?;
        info!(path = %path.display(), entries = self.entries.len(), "EPUB包已保存");
        Ok(())
    }

    /// 清单项在压缩包中的完整路径（相对于OPF目录解析，并做百分号解码）
    pub fn item_path(&self, item: &ManifestItem) -> String {
        let opf_dir = match self.opf_path.rfind('/') {
            Some(pos) => &self.opf_path[..pos],
            None => "",
        };
        let href = item.href.split('#').next().unwrap_or_default();
        let href = percent_decode_str(href).decode_utf8_lossy();
        resolve_path(opf_dir, &href)
    }

    fn item_entry_index(&self, id: &ItemId) -> Result<usize> {
        let item = self
            .opf
            .manifest_item(id.as_str())
            .ok_or_else(|| EpubError::UnknownItem(id.to_string()))?;
        let path = self.item_path(item);
        self.entry_index(&path)
            .ok_or(EpubError::MissingItem {
                id: id.to_string(),
                path,
            })
    }

    fn entry_index(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }
}

/// 检查mimetype文件是否存在且内容为 `application/epub+zip`
fn validate_mimetype(entries: &[Entry]) -> Result<()> {
    let content = entry_text(entries, MIMETYPE_PATH)?.ok_or(EpubError::MissingMimetype)?;
    let content = content.trim();
    if content != EPUB_MIMETYPE {
        return Err(EpubError::InvalidMimetype {
            expected: EPUB_MIMETYPE.to_string(),
            found: content.to_string(),
        });
    }
    Ok(())
}

/// 以UTF-8文本读取条目，不存在时返回 `None`
fn entry_text(entries: &[Entry], name: &str) -> Result<Option<String>> {
    match entries.iter().find(|entry| entry.name == name) {
        Some(entry) => String::from_utf8(entry.data.clone())
            .map(Some)
            .map_err(|_| EpubError::InvalidEpub(format!("{} 不是有效的UTF-8文本", name))),
        None => Ok(None),
    }
}

/// 把相对路径拼接到基准目录上，处理 `.` 和 `..`
fn resolve_path(base_dir: &str, href: &str) -> String {
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    const CONTAINER_XML: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles>
        <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
    </rootfiles>
</container>"#;

    /// 构造测试用EPUB：`chapters` 为 (清单ID, 文件名, XHTML内容)
    pub(crate) fn build_epub(mimetype: &str, chapters: &[(&str, &str, &str)]) -> Vec<u8> {
        let mut manifest = String::new();
        for (id, href, _) in chapters {
            manifest.push_str(&format!(
                "        <item id=\"{}\" href=\"text/{}\" media-type=\"application/xhtml+xml\"/>\n",
                id, href
            ));
        }
        manifest.push_str("        <item id=\"css\" href=\"styles/book.css\" media-type=\"text/css\"/>\n");

        let opf_xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package version="3.0" xmlns="http://www.idpf.org/2007/opf" unique-identifier="BookId">
    <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
        <dc:title>测试书籍</dc:title>
        <dc:creator>测试作者</dc:creator>
    </metadata>
    <manifest>
{}    </manifest>
    <spine></spine>
</package>"#,
            manifest
        );

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        zip.start_file("mimetype", options).unwrap();
        zip.write_all(mimetype.as_bytes()).unwrap();
        zip.start_file("META-INF/container.xml", options).unwrap();
        zip.write_all(CONTAINER_XML.as_bytes()).unwrap();
        zip.start_file("OEBPS/content.opf", options).unwrap();
        zip.write_all(opf_xml.as_bytes()).unwrap();
        zip.start_file("OEBPS/styles/book.css", options).unwrap();
        zip.write_all(b"p { margin: 0; }").unwrap();
        for (_, href, content) in chapters {
            let name = percent_decode_str(href).decode_utf8_lossy();
            zip.start_file(format!("OEBPS/text/{}", name), options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn sample_package() -> Package {
        let bytes = build_epub(
            "application/epub+zip",
            &[
                ("c1", "chapter1.xhtml", "<html><head><title>第一章</title></head><body><p>一</p></body></html>"),
                ("c2", "chapter%202.xhtml", "<html><body><p>二</p></body></html>"),
            ],
        );
        Package::from_reader(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn test_open_valid_package() {
        let package = sample_package();
        assert_eq!(package.opf_path(), "OEBPS/content.opf");
        let ids: Vec<&str> = package.document_items().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert_eq!(package.metadata(Namespace::DublinCore, "title"), vec!["测试书籍"]);
    }

    #[test]
    fn test_invalid_mimetype() {
        let bytes = build_epub("invalid/mimetype", &[]);
        let result = Package::from_reader(Cursor::new(bytes));

        if let Err(EpubError::InvalidMimetype { expected, found }) = result {
            assert_eq!(expected, "application/epub+zip");
            assert_eq!(found, "invalid/mimetype");
        } else {
            panic!("期望InvalidMimetype错误");
        }
    }

    #[test]
    fn test_missing_document_is_a_load_error() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        zip.start_file("mimetype", options).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();
        zip.start_file("META-INF/container.xml", options).unwrap();
        zip.write_all(CONTAINER_XML.as_bytes()).unwrap();
        zip.start_file("OEBPS/content.opf", options).unwrap();
        zip.write_all(
            br#"<package version="2.0"><manifest>
<item id="gone" href="gone.xhtml" media-type="application/xhtml+xml"/>
</manifest></package>"#,
        )
        .unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let result = Package::from_reader(Cursor::new(bytes));
        assert!(matches!(result, Err(EpubError::MissingItem { ref id, .. }) if id == "gone"));
    }

    #[test]
    fn test_percent_encoded_href() {
        let package = sample_package();
        let content = package.item_content(&ItemId::new("c2")).unwrap();
        assert!(String::from_utf8_lossy(content).contains("二"));
    }

    #[test]
    fn test_set_item_content_and_write_roundtrip() {
        let mut package = sample_package();
        package
            .set_item_content(&ItemId::new("c1"), b"<html><body><p>new</p></body></html>".to_vec())
            .unwrap();

        let mut buffer = Cursor::new(Vec::new());
        package.write_to(&mut buffer).unwrap();
        let bytes = buffer.into_inner();

        let mut archive = ZipArchive::new(Cursor::new(bytes.clone())).unwrap();
        let first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), CompressionMethod::Stored);
        drop(first);

        let reopened = Package::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(
            reopened.item_content(&ItemId::new("c1")).unwrap(),
            b"<html><body><p>new</p></body></html>"
        );
        // 未修改的条目原样保留
        let css = reopened
            .file_names()
            .find(|name| *name == "OEBPS/styles/book.css");
        assert!(css.is_some());
        assert_eq!(
            reopened.item_content(&ItemId::new("css")).unwrap(),
            b"p { margin: 0; }"
        );
    }

    #[test]
    fn test_unknown_item() {
        let package = sample_package();
        let result = package.item_content(&ItemId::new("missing"));
        assert!(matches!(result, Err(EpubError::UnknownItem(_))));
    }

    #[test]
    fn test_save_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.epub");
        let package = sample_package();
        package.save(&path).unwrap();

        assert!(path.exists());
        // 临时文件已被重命名为目标文件
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        let reopened = Package::open(&path).unwrap();
        assert_eq!(reopened.document_items().count(), 2);
    }

    #[test]
    fn test_failed_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // 目标路径是已存在的目录，替换必然失败
        let target = dir.path().join("out.epub");
        std::fs::create_dir(&target).unwrap();

        let package = sample_package();
        assert!(package.save(&target).is_err());

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("out.epub")]);
        assert!(target.is_dir());
    }

    #[test]
    fn test_save_does_not_touch_existing_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.epub");
        let user_file = dir.path().join("out.epub.tmp");
        std::fs::write(&user_file, b"keep me").unwrap();

        sample_package().save(&path).unwrap();

        assert_eq!(std::fs::read(&user_file).unwrap(), b"keep me");
        assert!(Package::open(&path).is_ok());
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("OEBPS", "text/c1.xhtml"), "OEBPS/text/c1.xhtml");
        assert_eq!(resolve_path("OEBPS/text", "../images/a.png"), "OEBPS/images/a.png");
        assert_eq!(resolve_path("", "./c1.xhtml"), "c1.xhtml");
    }
}
