/// 项目文件编辑器
///
/// 修改 `.csproj`：追加内联内容条目，或幂等地添加 props 的 Import 引用。
use std::path::Path;

use tracing::{debug, info};

use crate::io::{DefaultDocumentReader, DefaultDocumentWriter, DocumentReader, DocumentWriter};
use crate::msbuild::{ContentItem, ImportReference, LinkStyle, ITEM_GROUP};
use crate::utils::Result;
use crate::xml::Element;

/// `.csproj` 编辑器
///
/// # 核心特性
/// - **无状态**: 每次调用独立加载、修改、保存
/// - **保留命名空间**: 新建元素沿用根元素的命名空间和前缀
/// - **可替换 IO**: 通过 [`DocumentReader`] / [`DocumentWriter`] 注入
pub struct ProjectFileEditor<R = DefaultDocumentReader, W = DefaultDocumentWriter> {
    reader: R,
    writer: W,
}

impl ProjectFileEditor {
    /// 使用文件系统读写
    pub fn new() -> Self {
        Self::with_io(DefaultDocumentReader, DefaultDocumentWriter)
    }
}

impl Default for ProjectFileEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: DocumentReader, W: DocumentWriter> ProjectFileEditor<R, W> {
    pub fn with_io(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// 追加一个内联内容条目
    ///
    /// 每次调用都会新建一个 `ItemGroup` 放在根元素末尾，不做去重：
    /// 同一模式调用两次会得到两个条目。
    ///
    /// # 参数
    /// * `project` - 已存在的 `.csproj` 路径
    /// * `include` - Include 模式（调用方已校验）
    pub fn add_inline_content(&self, project: &Path, include: &str) -> Result<()> {
        let mut document = self.reader.read(project)?;

        let root = document.root();
        let item = ContentItem::new(include).to_element(root, LinkStyle::ProjectData);
        let group = Element::in_namespace_of(root, ITEM_GROUP).with_child(item);

        document.append_to_root(group);
        self.writer.write(&document, project)?;

        info!("已向 {} 添加内联内容: {}", project.display(), include);
        Ok(())
    }

    /// 添加 `<Import Project="…" />`
    ///
    /// props 路径先转为相对项目目录、以 `/` 分隔的形式。根元素下已有
    /// 同一路径（忽略大小写）的 Import 时不做修改。
    ///
    /// # 返回
    /// 实际添加返回 `true`，已存在返回 `false`
    pub fn add_import(&self, project: &Path, props: &Path) -> Result<bool> {
        let mut document = self.reader.read(project)?;
        let reference = ImportReference::relative_to(project, props)?;

        if reference.exists_in(document.root()) {
            debug!("Import 已存在: {} -> {}", project.display(), reference.project);
            return Ok(false);
        }

        let import = reference.to_element(document.root());
        document.append_to_root(import);
        self.writer.write(&document, project)?;

        info!("已向 {} 添加 Import: {}", project.display(), reference.project);
        Ok(true)
    }
}
