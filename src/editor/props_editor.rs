/// props 文件编辑器
///
/// 新建只含一个内容条目的 `.props`，或向已有 `.props` 追加条目。
use std::path::Path;

use tracing::{debug, info};

use crate::io::{DefaultDocumentReader, DefaultDocumentWriter, DocumentReader, DocumentWriter};
use crate::msbuild::{ContentItem, LinkStyle, ITEM_GROUP, PROJECT};
use crate::utils::Result;
use crate::xml::{Document, Element};

/// `.props` 编辑器
pub struct PropsFileEditor<R = DefaultDocumentReader, W = DefaultDocumentWriter> {
    reader: R,
    writer: W,
}

impl PropsFileEditor {
    /// 使用文件系统读写
    pub fn new() -> Self {
        Self::with_io(DefaultDocumentReader, DefaultDocumentWriter)
    }
}

impl Default for PropsFileEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: DocumentReader, W: DocumentWriter> PropsFileEditor<R, W> {
    pub fn with_io(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// props 文件是否已存在（经由读取器判断）
    pub fn exists(&self, props: &Path) -> bool {
        self.reader.exists(props)
    }

    /// 新建 props 文件（总是覆盖）
    ///
    /// 生成带 `<?xml version="1.0" encoding="utf-8" standalone="yes"?>` 声明的文档，
    /// 根元素下一个 `ItemGroup`，内含一个内容条目。父目录不存在时自动创建。
    pub fn create_new(&self, props: &Path, include: &str) -> Result<()> {
        let document = new_props_document(include);
        self.writer.write(&document, props)?;

        info!("已创建 props 文件: {}", props.display());
        Ok(())
    }

    /// 向已有 props 文件追加内容条目
    ///
    /// 只检查根元素下的第一个 `ItemGroup`：Include 完全相同则不修改；
    /// 没有 `ItemGroup` 时新建一个。后面的 `ItemGroup` 不参与去重，
    /// 只出现在其中的 Include 仍会被追加到第一个组。
    ///
    /// # 返回
    /// 实际追加返回 `true`，已存在返回 `false`
    pub fn append_include(&self, props: &Path, include: &str) -> Result<bool> {
        let mut document = self.reader.read(props)?;
        let item = ContentItem::new(include);
        let indentation = document.indentation().clone();

        let root = document.root_mut();
        let namespace = root.namespace().map(str::to_string);
        let element = item.to_element(root, LinkStyle::Props);

        match root.first_element_mut(ITEM_GROUP, namespace.as_deref()) {
            Some(group) => {
                if item.exists_in(group) {
                    debug!("Include 已存在: {} ({})", include, props.display());
                    return Ok(false);
                }
                group.append_formatted(element, 1, &indentation);
            }
            None => {
                let group = Element::in_namespace_of(root, ITEM_GROUP).with_child(element);
                root.append_formatted(group, 0, &indentation);
            }
        }

        self.writer.write(&document, props)?;

        info!("已向 {} 追加 Include: {}", props.display(), include);
        Ok(true)
    }
}

/// 构造只含一个条目的新 props 文档
fn new_props_document(include: &str) -> Document {
    let project = Element::new(PROJECT);
    let item = ContentItem::new(include).to_element(&project, LinkStyle::Props);
    let mut document = Document::new(project).with_declaration("1.0", "utf-8", Some("yes"));

    let group = Element::new(ITEM_GROUP).with_child(item);
    document.append_to_root(group);
    document
}
