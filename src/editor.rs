/// 编辑器层模块
///
/// 两个无状态编辑器，每次调用都是一次完整的“加载 - 内存修改 - 保存”。
/// 编辑器之间不共享状态，只通过调用方传入的路径组合使用。
///
/// # 架构设计
///
/// - **project_editor**: `.csproj` 编辑（内联内容条目、Import 引用）
/// - **props_editor**: `.props` 编辑（新建、追加内容条目）
///
/// # 使用示例
///
/// ```rust,ignore
/// use dotnet_add_content::{ProjectFileEditor, PropsFileEditor};
///
/// let props = PropsFileEditor::new();
/// props.create_new(Path::new("build/content.props"), "data/**/*.csv")?;
///
/// let project = ProjectFileEditor::new();
/// let added = project.add_import(Path::new("App.csproj"), Path::new("build/content.props"))?;
/// ```
pub mod project_editor;
pub mod props_editor;

// === 导出公共接口 ===
pub use project_editor::ProjectFileEditor;
pub use props_editor::PropsFileEditor;

#[cfg(test)]
pub(crate) mod memory {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    use crate::io::{DocumentReader, DocumentWriter};
    use crate::utils::{ContentError, Result};
    use crate::xml::Document;

    /// 内存文档存储（仅测试用）
    #[derive(Default)]
    pub struct MemoryDocuments {
        files: RefCell<HashMap<PathBuf, String>>,
        pub writes: RefCell<usize>,
    }

    impl MemoryDocuments {
        pub fn insert(&self, path: &Path, content: &str) {
            self.files.borrow_mut().insert(path.to_path_buf(), content.to_string());
        }

        pub fn get(&self, path: &Path) -> Option<String> {
            self.files.borrow().get(path).cloned()
        }
    }

    impl DocumentReader for MemoryDocuments {
        fn read(&self, path: &Path) -> Result<Document> {
            let files = self.files.borrow();
            let content = files
                .get(path)
                .ok_or_else(|| ContentError::NotFound(path.to_path_buf()))?;
            Document::parse(content)
        }

        fn exists(&self, path: &Path) -> bool {
            self.files.borrow().contains_key(path)
        }
    }

    impl DocumentWriter for MemoryDocuments {
        fn write(&self, document: &Document, path: &Path) -> Result<()> {
            *self.writes.borrow_mut() += 1;
            self.insert(path, &document.to_xml_string());
            Ok(())
        }
    }
}
