/// XML 文档 IO 实现
///
/// 提供基于文件系统的默认读写实现。写入先落到同目录的临时文件，
/// 再重命名覆盖目标文件，中途失败不会留下写了一半的文件。
///
/// 读取时按 BOM 识别 UTF-8 / UTF-16LE / UTF-16BE，写回时沿用原编码。
use std::borrow::Cow;
use std::io::Write;
use std::path::Path;

use encoding_rs::{UTF_16BE, UTF_16LE};
use tempfile::NamedTempFile;
use tracing::debug;

use super::traits::{DocumentReader, DocumentWriter};
use crate::utils::{ContentError, Result};
use crate::xml::{Document, SourceEncoding};

/// 默认的文档读取器（基于 std::fs）
#[derive(Debug, Clone, Default)]
pub struct DefaultDocumentReader;

impl DocumentReader for DefaultDocumentReader {
    fn read(&self, path: &Path) -> Result<Document> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ContentError::NotFound(path.to_path_buf()),
            _ => ContentError::IoError(e),
        })?;

        let with_path = |message: String| ContentError::Parse(format!("{}: {}", path.display(), message));

        let (content, encoding) = decode(&bytes).map_err(with_path)?;
        let mut document = Document::parse(&content).map_err(|e| match e {
            ContentError::Parse(message) => with_path(message),
            other => other,
        })?;
        document.set_encoding(encoding);

        debug!("已加载文档: {} ({:?})", path.display(), encoding);
        Ok(document)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// 按 BOM 解码文件内容
///
/// UTF-8 BOM 留在字符串里，由 [`Document::parse`] 记录并在写回时保留。
fn decode(bytes: &[u8]) -> std::result::Result<(Cow<'_, str>, SourceEncoding), String> {
    let utf16 = match bytes {
        [0xFF, 0xFE, rest @ ..] => Some((UTF_16LE, SourceEncoding::Utf16Le, rest)),
        [0xFE, 0xFF, rest @ ..] => Some((UTF_16BE, SourceEncoding::Utf16Be, rest)),
        _ => None,
    };

    match utf16 {
        Some((codec, encoding, rest)) => {
            let (text, had_errors) = codec.decode_without_bom_handling(rest);
            if had_errors {
                return Err(format!("invalid {} content", codec.name()));
            }
            Ok((text, encoding))
        }
        None => std::str::from_utf8(bytes)
            .map(|text| (Cow::Borrowed(text), SourceEncoding::Utf8))
            .map_err(|e| format!("file is not valid UTF-8: {}", e)),
    }
}

/// 按文档原编码序列化（UTF-16 带 BOM）
fn encode(document: &Document) -> Vec<u8> {
    let text = document.to_xml_string();
    match document.encoding() {
        SourceEncoding::Utf8 => text.into_bytes(),
        SourceEncoding::Utf16Le => std::iter::once(0xFEFF)
            .chain(text.encode_utf16())
            .flat_map(u16::to_le_bytes)
            .collect(),
        SourceEncoding::Utf16Be => std::iter::once(0xFEFF)
            .chain(text.encode_utf16())
            .flat_map(u16::to_be_bytes)
            .collect(),
    }
}

/// 默认的文档写入器（临时文件 + 重命名）
#[derive(Debug, Clone, Default)]
pub struct DefaultDocumentWriter;

impl DocumentWriter for DefaultDocumentWriter {
    fn write(&self, document: &Document, path: &Path) -> Result<()> {
        // 确保父目录存在
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(&encode(document))?;
        temp.flush()?;

        // 覆盖已有文件时沿用其权限
        if let Ok(metadata) = std::fs::metadata(path) {
            temp.as_file().set_permissions(metadata.permissions())?;
        }

        temp.persist(path).map_err(|e| ContentError::IoError(e.error))?;

        debug!("已写入文档: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::Element;

    #[test]
    fn test_default_reader() {
        let temp_dir = tempfile::tempdir().unwrap();
        let test_file = temp_dir.path().join("App.csproj");
        std::fs::write(&test_file, "<Project Sdk=\"Microsoft.NET.Sdk\"></Project>").unwrap();

        let reader = DefaultDocumentReader;
        let document = reader.read(&test_file).unwrap();

        assert_eq!(document.root().name(), "Project");
        assert_eq!(document.root().attribute("Sdk").as_deref(), Some("Microsoft.NET.Sdk"));
    }

    #[test]
    fn test_reader_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing.props");

        let result = DefaultDocumentReader.read(&missing);
        assert!(matches!(result, Err(ContentError::NotFound(p)) if p == missing));
    }

    #[test]
    fn test_reader_malformed_file_mentions_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let test_file = temp_dir.path().join("broken.csproj");
        std::fs::write(&test_file, "<Project><ItemGroup></Project>").unwrap();

        match DefaultDocumentReader.read(&test_file) {
            Err(ContentError::Parse(message)) => assert!(message.contains("broken.csproj")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    fn utf16le_with_bom(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
        bytes
    }

    #[test]
    fn test_reader_utf16_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let test_file = temp_dir.path().join("Legacy.csproj");
        let original = "<?xml version=\"1.0\" encoding=\"utf-16\"?>\r\n<Project>\r\n</Project>";
        std::fs::write(&test_file, utf16le_with_bom(original)).unwrap();

        let mut document = DefaultDocumentReader.read(&test_file).unwrap();
        assert_eq!(document.root().name(), "Project");
        assert_eq!(document.encoding(), SourceEncoding::Utf16Le);

        document.append_to_root(Element::new("Import").with_attribute("Project", "a.props"));
        DefaultDocumentWriter.write(&document, &test_file).unwrap();

        let expected = "<?xml version=\"1.0\" encoding=\"utf-16\"?>\r\n<Project>\r\n  <Import Project=\"a.props\" />\r\n</Project>";
        assert_eq!(std::fs::read(&test_file).unwrap(), utf16le_with_bom(expected));
    }

    #[test]
    fn test_reader_utf16be_bom() {
        let temp_dir = tempfile::tempdir().unwrap();
        let test_file = temp_dir.path().join("a.props");
        let mut bytes = vec![0xFE, 0xFF];
        bytes.extend("<Project />".encode_utf16().flat_map(u16::to_be_bytes));
        std::fs::write(&test_file, bytes).unwrap();

        let document = DefaultDocumentReader.read(&test_file).unwrap();
        assert_eq!(document.encoding(), SourceEncoding::Utf16Be);
        assert_eq!(document.root().name(), "Project");
    }

    #[test]
    fn test_reader_invalid_bytes_is_parse_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let test_file = temp_dir.path().join("latin1.csproj");
        std::fs::write(&test_file, b"<Project><!-- caf\xE9 --></Project>").unwrap();

        match DefaultDocumentReader.read(&test_file) {
            Err(ContentError::Parse(message)) => assert!(message.contains("latin1.csproj")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_reader_keeps_utf8_bom() {
        let temp_dir = tempfile::tempdir().unwrap();
        let test_file = temp_dir.path().join("a.props");
        std::fs::write(&test_file, "\u{feff}<Project />").unwrap();

        let document = DefaultDocumentReader.read(&test_file).unwrap();
        assert_eq!(document.encoding(), SourceEncoding::Utf8);
        DefaultDocumentWriter.write(&document, &test_file).unwrap();

        assert_eq!(std::fs::read(&test_file).unwrap(), "\u{feff}<Project />".as_bytes());
    }

    #[test]
    fn test_default_writer_replaces_content() {
        let temp_dir = tempfile::tempdir().unwrap();
        let test_file = temp_dir.path().join("a.props");
        std::fs::write(&test_file, "old").unwrap();

        let document = Document::new(Element::new("Project"));
        DefaultDocumentWriter.write(&document, &test_file).unwrap();

        assert_eq!(std::fs::read_to_string(&test_file).unwrap(), "<Project />");
        // 临时文件不应残留
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_writer_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let test_file = temp_dir.path().join("build").join("props").join("a.props");

        let document = Document::new(Element::new("Project"));
        DefaultDocumentWriter.write(&document, &test_file).unwrap();

        assert!(test_file.exists());
    }
}
