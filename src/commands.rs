/// 命令层模块
///
/// 参数校验、项目路径解析和场景路由。与 clap 解耦，`main.rs` 只负责
/// 把命令行参数填进请求结构并打印返回的 [`Outcome`]。
///
/// # 场景
///
/// 1. `--project` + `--include`：向 `.csproj` 添加内联内容
/// 2. `--file` + `--include`：新建或追加 props 文件
/// 3. `--file` + `--project`：向 `.csproj` 添加 props 的 Import
/// 4. 三者都有：先处理 props，再添加 Import
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::editor::{ProjectFileEditor, PropsFileEditor};
use crate::io::{DocumentReader, DocumentWriter};
use crate::utils::{absolute_path, display_file_name, is_valid_include_path, ContentError, IncludeRules, Result};
use crate::PROJECT_EXTENSION;

/// 单步操作的结果，`Display` 即命令行输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    InlineContentAdded { project: PathBuf },
    PropsCreated { props: PathBuf },
    IncludeAppended { include: String },
    IncludeAlreadyPresent { include: String },
    ImportAdded { props: PathBuf, project: PathBuf },
    ImportAlreadyPresent { project: PathBuf },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::InlineContentAdded { project } => {
                write!(f, "✅ Added inline content to {}", display_file_name(project))
            }
            Outcome::PropsCreated { props } => write!(f, "✅ Created new props file at {}", props.display()),
            Outcome::IncludeAppended { include } => write!(f, "✅ Appended to props file: {}", include),
            Outcome::IncludeAlreadyPresent { include } => write!(f, "ℹ️ Include already present: {}", include),
            Outcome::ImportAdded { props, project } => write!(
                f,
                "✅ Imported {} into {}",
                display_file_name(props),
                display_file_name(project)
            ),
            Outcome::ImportAlreadyPresent { project } => {
                write!(f, "ℹ️ Import already exists in {}", display_file_name(project))
            }
        }
    }
}

/// `add-content` 子命令参数
#[derive(Debug, Clone, Default)]
pub struct AddContentRequest {
    /// `.csproj` 文件或包含唯一 `.csproj` 的目录
    pub project: Option<PathBuf>,
    /// props 文件路径
    pub file: Option<PathBuf>,
    pub include: Option<String>,
    pub overwrite: bool,
}

/// `content-target` 子命令参数
#[derive(Debug, Clone, Default)]
pub struct ContentTargetRequest {
    pub file: PathBuf,
    pub include: Option<String>,
    pub project: Option<PathBuf>,
    pub overwrite: bool,
}

/// 空白 include 视为未提供
fn non_blank(include: &Option<String>) -> Option<&str> {
    include.as_deref().filter(|value| !value.trim().is_empty())
}

impl AddContentRequest {
    /// 校验参数组合
    pub fn validate(&self) -> Result<()> {
        let include = non_blank(&self.include);

        if include.is_none() && self.file.is_none() {
            return Err(usage("You must specify at least --include or --file."));
        }

        if let Some(include) = include {
            if !is_valid_include_path(include, IncludeRules::Strict) {
                return Err(usage("Invalid include path. Must be a valid glob or file pattern."));
            }
        }

        if self.overwrite && self.file.is_none() {
            return Err(usage("--overwrite requires --file."));
        }

        if include.is_some() && self.project.is_none() && self.file.is_none() {
            return Err(usage("--include must be used with --project or --file."));
        }

        Ok(())
    }

    /// 校验并执行，返回每一步的结果
    pub fn execute(&self, runner: &ContentRunner<impl DocumentReader, impl DocumentWriter>) -> Result<Vec<Outcome>> {
        self.validate()?;

        let project = self.project.as_deref().map(resolve_project_path).transpose()?;
        let file = self.file.as_deref().map(absolute_path).transpose()?;
        let include = non_blank(&self.include);

        let mut outcomes = Vec::new();
        match (project, file, include) {
            (Some(project), None, Some(include)) => {
                debug!("场景 1：内联内容");
                outcomes.push(runner.add_inline_content(&project, include)?);
            }
            (None, Some(file), Some(include)) => {
                debug!("场景 2：仅 props 文件");
                outcomes.push(runner.write_props(&file, include, self.overwrite)?);
            }
            (Some(project), Some(file), None) => {
                debug!("场景 3：仅 Import");
                outcomes.push(runner.add_import(&project, &file)?);
            }
            (Some(project), Some(file), Some(include)) => {
                debug!("场景 4：props 文件 + Import");
                outcomes.push(runner.write_props(&file, include, self.overwrite)?);
                outcomes.push(runner.add_import(&project, &file)?);
            }
            // 只有 --file 时没有可做的事
            _ => debug!("没有匹配的场景"),
        }

        Ok(outcomes)
    }
}

impl ContentTargetRequest {
    pub fn validate(&self) -> Result<()> {
        let include = non_blank(&self.include);

        if include.is_none() && self.project.is_none() {
            return Err(usage("You must specify at least one of --include or --project."));
        }

        if let Some(include) = include {
            if !is_valid_include_path(include, IncludeRules::Lenient) {
                return Err(usage(
                    "Invalid include path. Must be a valid file path or glob pattern and not contain illegal characters.",
                ));
            }
        }

        Ok(())
    }

    pub fn execute(&self, runner: &ContentRunner<impl DocumentReader, impl DocumentWriter>) -> Result<Vec<Outcome>> {
        self.validate()?;

        let file = absolute_path(&self.file)?;
        let mut outcomes = Vec::new();

        if let Some(include) = non_blank(&self.include) {
            outcomes.push(runner.write_props(&file, include, self.overwrite)?);
        }

        if let Some(project) = &self.project {
            let project = resolve_project_path(project)?;
            outcomes.push(runner.add_import(&project, &file)?);
        }

        Ok(outcomes)
    }
}

/// 把两个编辑器组合成场景步骤
pub struct ContentRunner<R, W> {
    project: ProjectFileEditor<R, W>,
    props: PropsFileEditor<R, W>,
}

impl ContentRunner<crate::io::DefaultDocumentReader, crate::io::DefaultDocumentWriter> {
    /// 使用文件系统读写
    pub fn new() -> Self {
        Self {
            project: ProjectFileEditor::new(),
            props: PropsFileEditor::new(),
        }
    }
}

impl Default for ContentRunner<crate::io::DefaultDocumentReader, crate::io::DefaultDocumentWriter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: DocumentReader + Clone, W: DocumentWriter + Clone> ContentRunner<R, W> {
    pub fn with_io(reader: R, writer: W) -> Self {
        Self {
            project: ProjectFileEditor::with_io(reader.clone(), writer.clone()),
            props: PropsFileEditor::with_io(reader, writer),
        }
    }
}

impl<R: DocumentReader, W: DocumentWriter> ContentRunner<R, W> {
    fn add_inline_content(&self, project: &Path, include: &str) -> Result<Outcome> {
        self.project.add_inline_content(project, include)?;
        Ok(Outcome::InlineContentAdded { project: project.to_path_buf() })
    }

    /// 覆盖或文件不存在时新建，否则追加
    fn write_props(&self, props: &Path, include: &str, overwrite: bool) -> Result<Outcome> {
        if overwrite || !self.props.exists(props) {
            self.props.create_new(props, include)?;
            return Ok(Outcome::PropsCreated { props: props.to_path_buf() });
        }

        if self.props.append_include(props, include)? {
            Ok(Outcome::IncludeAppended { include: include.to_string() })
        } else {
            Ok(Outcome::IncludeAlreadyPresent { include: include.to_string() })
        }
    }

    fn add_import(&self, project: &Path, props: &Path) -> Result<Outcome> {
        if self.project.add_import(project, props)? {
            Ok(Outcome::ImportAdded { props: props.to_path_buf(), project: project.to_path_buf() })
        } else {
            Ok(Outcome::ImportAlreadyPresent { project: project.to_path_buf() })
        }
    }
}

/// 解析 `--project` 参数
///
/// - 已存在的 `.csproj` 文件：直接使用
/// - 目录：必须恰好包含一个 `.csproj`
/// - 其他情况报错
pub fn resolve_project_path(input: &Path) -> Result<PathBuf> {
    let path = absolute_path(input)?;

    if path.is_file() && path.extension().is_some_and(|ext| ext == PROJECT_EXTENSION) {
        return Ok(path);
    }

    if path.is_dir() {
        let mut matches = Vec::new();
        for entry in std::fs::read_dir(&path)? {
            let candidate = entry?.path();
            if candidate.is_file() && candidate.extension().is_some_and(|ext| ext == PROJECT_EXTENSION) {
                matches.push(candidate);
            }
        }

        if matches.len() == 1 {
            return Ok(matches.remove(0));
        }

        return Err(ContentError::ProjectResolution(format!(
            "Directory '{}' does not contain exactly one .csproj file.",
            path.display()
        )));
    }

    Err(ContentError::ProjectResolution(format!(
        "Could not resolve a .csproj file from: {}",
        input.display()
    )))
}

fn usage(message: &str) -> ContentError {
    ContentError::Usage(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::memory::MemoryDocuments;

    fn add_content(project: Option<&str>, file: Option<&str>, include: Option<&str>, overwrite: bool) -> AddContentRequest {
        AddContentRequest {
            project: project.map(PathBuf::from),
            file: file.map(PathBuf::from),
            include: include.map(str::to_string),
            overwrite,
        }
    }

    fn usage_message(result: Result<()>) -> String {
        match result {
            Err(ContentError::Usage(message)) => message,
            other => panic!("expected usage error, got {:?}", other),
        }
    }

    #[test]
    fn test_add_content_validation_order() {
        assert_eq!(
            usage_message(add_content(Some("a.csproj"), None, None, false).validate()),
            "You must specify at least --include or --file."
        );
        assert_eq!(
            usage_message(add_content(None, Some("a.props"), Some("a|b"), false).validate()),
            "Invalid include path. Must be a valid glob or file pattern."
        );
        assert_eq!(
            usage_message(add_content(Some("a.csproj"), None, Some("x/*.y"), true).validate()),
            "--overwrite requires --file."
        );
        assert_eq!(
            usage_message(add_content(None, None, Some("x/*.y"), false).validate()),
            "--include must be used with --project or --file."
        );
    }

    #[test]
    fn test_add_content_valid_combinations() {
        assert!(add_content(Some("a.csproj"), None, Some("x/*.y"), false).validate().is_ok());
        assert!(add_content(None, Some("a.props"), Some("x/*.y"), true).validate().is_ok());
        assert!(add_content(Some("a.csproj"), Some("a.props"), None, false).validate().is_ok());
        assert!(add_content(None, Some("a.props"), None, false).validate().is_ok());
    }

    #[test]
    fn test_blank_include_counts_as_missing() {
        assert_eq!(
            usage_message(add_content(Some("a.csproj"), None, Some("   "), false).validate()),
            "You must specify at least --include or --file."
        );
    }

    #[test]
    fn test_content_target_validation() {
        let request = ContentTargetRequest { file: PathBuf::from("some.props"), ..Default::default() };
        assert_eq!(
            usage_message(request.validate()),
            "You must specify at least one of --include or --project."
        );

        let request = ContentTargetRequest {
            file: PathBuf::from("some.props"),
            include: Some("data/<bad>.csv".to_string()),
            ..Default::default()
        };
        assert!(usage_message(request.validate()).starts_with("Invalid include path."));

        let request = ContentTargetRequest {
            file: PathBuf::from("some.props"),
            include: Some("C:/data/*.csv".to_string()),
            ..Default::default()
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_runner_with_io_creates_then_appends() {
        let store = MemoryDocuments::default();
        let runner = ContentRunner::with_io(&store, &store);
        let props = absolute_path(Path::new("/work/content.props")).unwrap();

        let request = ContentTargetRequest {
            file: props.clone(),
            include: Some("data/a.csv".to_string()),
            ..Default::default()
        };
        let outcomes = request.execute(&runner).unwrap();
        assert!(matches!(&outcomes[..], [Outcome::PropsCreated { .. }]));

        let request = ContentTargetRequest {
            include: Some("data/b.csv".to_string()),
            ..request
        };
        let outcomes = request.execute(&runner).unwrap();
        assert_eq!(outcomes[0].to_string(), "✅ Appended to props file: data/b.csv");

        let outcomes = request.execute(&runner).unwrap();
        assert_eq!(outcomes[0].to_string(), "ℹ️ Include already present: data/b.csv");

        let content = store.get(&props).unwrap();
        assert_eq!(content.matches("<None Include=").count(), 2);
        assert_eq!(*store.writes.borrow(), 2);
        // 存储之外的磁盘上不应出现该文件
        assert!(!props.exists());
    }

    #[test]
    fn test_outcome_messages() {
        let project = PathBuf::from("/w/App/App.csproj");
        assert_eq!(
            Outcome::InlineContentAdded { project: project.clone() }.to_string(),
            "✅ Added inline content to App.csproj"
        );
        assert_eq!(
            Outcome::ImportAdded { props: PathBuf::from("/w/b/c.props"), project: project.clone() }.to_string(),
            "✅ Imported c.props into App.csproj"
        );
        assert_eq!(
            Outcome::ImportAlreadyPresent { project }.to_string(),
            "ℹ️ Import already exists in App.csproj"
        );
        assert_eq!(
            Outcome::IncludeAlreadyPresent { include: "a/*.b".to_string() }.to_string(),
            "ℹ️ Include already present: a/*.b"
        );
    }

    #[test]
    fn test_resolve_project_from_file_and_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project = temp_dir.path().join("App.csproj");
        std::fs::write(&project, "<Project />").unwrap();

        assert_eq!(resolve_project_path(&project).unwrap(), absolute_path(&project).unwrap());
        assert_eq!(resolve_project_path(temp_dir.path()).unwrap(), absolute_path(&project).unwrap());
    }

    #[test]
    fn test_resolve_project_rejects_ambiguous_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("A.csproj"), "<Project />").unwrap();
        std::fs::write(temp_dir.path().join("B.csproj"), "<Project />").unwrap();

        match resolve_project_path(temp_dir.path()) {
            Err(ContentError::ProjectResolution(message)) => {
                assert!(message.ends_with("does not contain exactly one .csproj file."))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_project_rejects_other_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let props = temp_dir.path().join("a.props");
        std::fs::write(&props, "<Project />").unwrap();

        assert!(matches!(
            resolve_project_path(&props),
            Err(ContentError::ProjectResolution(message)) if message.starts_with("Could not resolve a .csproj file from:")
        ));
        assert!(resolve_project_path(&temp_dir.path().join("missing.csproj")).is_err());
    }
}
