pub mod xml;
pub mod msbuild;
pub mod io;
pub mod editor;
pub mod commands;
pub mod utils;

// 重新导出主要结构
pub use editor::{ProjectFileEditor, PropsFileEditor};
pub use commands::{AddContentRequest, ContentRunner, ContentTargetRequest, Outcome};
pub use msbuild::{ContentItem, ImportReference, LinkStyle};
pub use xml::{Document, Element, Indentation, Node, SourceEncoding};
pub use utils::{ContentError, Result};

// 常量定义
pub const PROJECT_EXTENSION: &str = "csproj";
