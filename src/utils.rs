use thiserror::Error;
use std::path::{Component, Path, PathBuf};

/// 自定义错误类型
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("XML parse error: {0}")]
    Parse(String),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("{0}")]
    ProjectResolution(String),

    #[error("{0}")]
    Usage(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ContentError>;

/// include 校验规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeRules {
    /// add-content：额外禁止 `:`
    Strict,
    /// content-target：允许 `:`（绝对路径），仅禁止非法路径字符
    Lenient,
}

impl IncludeRules {
    const fn forbidden(self) -> &'static [char] {
        match self {
            IncludeRules::Strict => &['<', '>', ':', '"', '|'],
            IncludeRules::Lenient => &['<', '>', '"', '|'],
        }
    }
}

/// 检查 include 模式是否合法
///
/// 通配符 `*` 和 `?` 始终允许；控制字符一律拒绝。
pub fn is_valid_include_path(include: &str, rules: IncludeRules) -> bool {
    if include.trim().is_empty() {
        return false;
    }

    let forbidden = rules.forbidden();
    !include.chars().any(|c| c.is_control() || forbidden.contains(&c))
}

/// 转为绝对路径并做词法规整（去掉 `.`，折叠 `..`），不要求路径存在
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    Ok(normalize_lexically(&absolute))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // 根目录之上的 `..` 直接丢弃
                if !matches!(out.components().next_back(), None | Some(Component::RootDir) | Some(Component::Prefix(_))) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// 计算 `target` 相对于目录 `base` 的路径，分隔符统一为 `/`
///
/// 两者不在同一盘符（Windows）时返回 `target` 的绝对路径。
pub fn relative_forward_slash_path(base: &Path, target: &Path) -> Result<String> {
    let base = absolute_path(base)?;
    let target = absolute_path(target)?;

    let base_parts: Vec<Component> = base.components().collect();
    let target_parts: Vec<Component> = target.components().collect();

    let same_root = match (base_parts.first(), target_parts.first()) {
        (Some(a), Some(b)) => same_component(a, b),
        (a, b) => a == b,
    };
    if !same_root {
        return Ok(to_forward_slashes(&target.to_string_lossy()));
    }

    let common = base_parts
        .iter()
        .zip(target_parts.iter())
        .take_while(|(a, b)| same_component(a, b))
        .count();

    let mut segments: Vec<String> = Vec::new();
    segments.extend(std::iter::repeat("..".to_string()).take(base_parts.len() - common));
    segments.extend(
        target_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    if segments.is_empty() {
        return Ok(".".to_string());
    }

    Ok(segments.join("/"))
}

/// Windows 文件系统不区分大小写（按 ASCII 比较），其他平台逐字节比较
#[cfg(windows)]
fn same_component(a: &Component, b: &Component) -> bool {
    a.as_os_str()
        .to_string_lossy()
        .eq_ignore_ascii_case(&b.as_os_str().to_string_lossy())
}

#[cfg(not(windows))]
fn same_component(a: &Component, b: &Component) -> bool {
    a == b
}

/// 将 `\` 统一替换为 `/`
pub fn to_forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

/// 文件名（用于输出提示），取不到时退回完整路径
pub fn display_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
