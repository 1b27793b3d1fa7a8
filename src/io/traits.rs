/// IO 抽象层 - trait 定义
///
/// 读取负责“文件 -> 文档树”，写入负责“文档树 -> 文件”，
/// 编辑逻辑不直接接触文件系统。

use std::path::Path;

use crate::utils::Result;
use crate::xml::Document;

/// XML 文档读取 trait
///
/// # 职责
/// - 读取文件并解析为 [`Document`]
/// - 文件不存在时返回 `ContentError::NotFound`，格式错误时返回 `ContentError::Parse`
pub trait DocumentReader {
    /// 读取并解析文档
    ///
    /// # 参数
    /// * `path` - 文件路径
    fn read(&self, path: &Path) -> Result<Document>;

    /// 目标文件是否存在
    fn exists(&self, path: &Path) -> bool;
}

/// XML 文档写入 trait
///
/// # 职责
/// - 序列化文档并写入目标路径
/// - 按需创建父目录
pub trait DocumentWriter {
    /// 写入文档
    ///
    /// # 参数
    /// * `document` - 要写入的文档
    /// * `path` - 目标文件路径
    fn write(&self, document: &Document, path: &Path) -> Result<()>;
}

impl<T: DocumentReader + ?Sized> DocumentReader for &T {
    fn read(&self, path: &Path) -> Result<Document> {
        (**self).read(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
}

impl<T: DocumentWriter + ?Sized> DocumentWriter for &T {
    fn write(&self, document: &Document, path: &Path) -> Result<()> {
        (**self).write(document, path)
    }
}
