use std::path::Path;

use crate::utils::{relative_forward_slash_path, to_forward_slashes, Result};
use crate::xml::Element;

pub const PROJECT: &str = "Project";
pub const ITEM_GROUP: &str = "ItemGroup";
pub const NONE_ITEM: &str = "None";
pub const IMPORT: &str = "Import";
pub const INCLUDE_ATTR: &str = "Include";
pub const PROJECT_ATTR: &str = "Project";
pub const COPY_TO_OUTPUT: &str = "CopyToOutputDirectory";
pub const LINK: &str = "Link";
pub const PRESERVE_NEWEST: &str = "PreserveNewest";

/// Link 元数据模板
///
/// 项目内联条目带 `data\` 前缀，props 条目不带。
/// 现有构建脚本依赖这一差异，不能统一。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    /// `.csproj` 内联条目
    ProjectData,
    /// `.props` 文件条目
    Props,
}

impl LinkStyle {
    pub const fn pattern(self) -> &'static str {
        match self {
            LinkStyle::ProjectData => "data\\%(RecursiveDir)%(Filename)%(Extension)",
            LinkStyle::Props => "%(RecursiveDir)%(Filename)%(Extension)",
        }
    }
}

/// 内容条目（`<None Include="…">`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub include: String,
}

impl ContentItem {
    pub fn new(include: impl Into<String>) -> Self {
        Self { include: include.into() }
    }

    /// 生成 `None` 元素，命名空间与 `parent` 保持一致
    pub fn to_element(&self, parent: &Element, link: LinkStyle) -> Element {
        Element::in_namespace_of(parent, NONE_ITEM)
            .with_attribute(INCLUDE_ATTR, &self.include)
            .with_child(Element::in_namespace_of(parent, COPY_TO_OUTPUT).with_text(PRESERVE_NEWEST))
            .with_child(Element::in_namespace_of(parent, LINK).with_text(link.pattern()))
    }

    /// `group` 中是否已有相同 Include 的条目（精确匹配）
    pub fn exists_in(&self, group: &Element) -> bool {
        group
            .elements_named(NONE_ITEM, group.namespace())
            .any(|item| item.attribute(INCLUDE_ATTR).as_deref() == Some(self.include.as_str()))
    }
}

/// `<Import Project="…" />` 引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReference {
    /// 相对项目目录、以 `/` 分隔的路径
    pub project: String,
}

impl ImportReference {
    /// 以项目文件所在目录为基准计算 props 的相对路径
    pub fn relative_to(project_file: &Path, props_file: &Path) -> Result<Self> {
        let project_dir = project_file
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let project = relative_forward_slash_path(project_dir, props_file)?;
        Ok(Self { project })
    }

    /// 与已有 `Project` 属性比较（忽略大小写，`\` 视同 `/`）
    pub fn matches(&self, existing: &str) -> bool {
        to_forward_slashes(existing).to_lowercase() == self.project.to_lowercase()
    }

    /// `root` 下是否已存在同一引用
    pub fn exists_in(&self, root: &Element) -> bool {
        root.elements_named(IMPORT, root.namespace())
            .filter_map(|import| import.attribute(PROJECT_ATTR))
            .any(|existing| self.matches(&existing))
    }

    pub fn to_element(&self, parent: &Element) -> Element {
        Element::in_namespace_of(parent, IMPORT).with_attribute(PROJECT_ATTR, &self.project)
    }
}
