/// IO 抽象层模块
///
/// 该模块提供了 XML 文档读写的抽象接口，编辑器只依赖 trait，
/// 测试时可替换为内存实现。
///
/// # 架构设计
///
/// - **traits**: 定义 DocumentReader/DocumentWriter trait 接口
/// - **xml_io**: 基于文件系统的默认实现（原子写入）
///
/// # 使用示例
///
/// ```rust,ignore
/// use dotnet_add_content::io::{DefaultDocumentReader, DocumentReader};
///
/// let reader = DefaultDocumentReader;
/// let doc = reader.read(Path::new("App.csproj"))?;
/// ```
pub mod traits;
pub mod xml_io;

// === 导出 trait 定义 ===
pub use traits::{DocumentReader, DocumentWriter};

// === 导出默认实现 ===
pub use xml_io::{DefaultDocumentReader, DefaultDocumentWriter};
