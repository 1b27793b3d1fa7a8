/// XML 文档模型
///
/// 一个最小的可变元素树：单一元素类型（标签、有序属性、有序子节点）。
/// 解析时保留声明、注释、空白、CDATA 等所有节点，未改动的内容原样写回。
///
/// # 设计要点
///
/// - 属性值和文本按文件中的转义形式保存，写回时不做二次转义
/// - 每个元素记录其解析后的命名空间 URI，新建元素可继承父元素的命名空间与前缀
/// - 追加子元素时按文档检测到的缩进单位和换行符格式化，不影响已有内容
use std::borrow::Cow;
use std::fmt::Write as _;

use indexmap::IndexMap;
use quick_xml::escape::{escape, partial_escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::utils::{ContentError, Result};

const DEFAULT_INDENT: &str = "  ";
const DEFAULT_NEWLINE: &str = "\n";

/// 新增节点使用的格式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indentation {
    /// 缩进单位
    pub unit: String,
    /// 换行符（`\n` 或 `\r\n`）
    pub newline: String,
}

impl Default for Indentation {
    fn default() -> Self {
        Self {
            unit: DEFAULT_INDENT.to_string(),
            newline: DEFAULT_NEWLINE.to_string(),
        }
    }
}

impl Indentation {
    /// 换行后缩进 `depth` 层
    fn line(&self, depth: usize) -> String {
        format!("{}{}", self.newline, self.unit.repeat(depth))
    }
}

/// 文件的字符编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
}

/// XML 文档
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// 原文件是否带 UTF-8 BOM
    bom: bool,
    /// 根元素之前的节点（声明、注释、空白）
    prolog: Vec<Node>,
    root: Element,
    /// 根元素之后的节点
    epilog: Vec<Node>,
    /// 检测到的缩进单位与换行符
    indentation: Indentation,
    /// 读入时的字符编码，写回时沿用
    encoding: SourceEncoding,
}

/// XML 元素
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// 限定名（含前缀，如 `msb:ItemGroup`）
    name: String,
    /// 解析后的命名空间 URI
    namespace: Option<String>,
    /// 属性（值为转义后的原始文本）
    attributes: IndexMap<String, String>,
    children: Vec<Node>,
    /// 无子节点时写成 `<x />` 还是 `<x></x>`
    self_closing: bool,
}

/// XML 内容节点
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// 转义后的原始文本
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    Declaration(String),
    DocType(String),
}

impl Document {
    /// 以给定根元素创建新文档（无声明）
    pub fn new(root: Element) -> Self {
        Self {
            bom: false,
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
            indentation: Indentation::default(),
            encoding: SourceEncoding::Utf8,
        }
    }

    /// 添加 XML 声明
    pub fn with_declaration(mut self, version: &str, encoding: &str, standalone: Option<&str>) -> Self {
        let mut decl = format!("xml version=\"{}\" encoding=\"{}\"", version, encoding);
        if let Some(standalone) = standalone {
            let _ = write!(decl, " standalone=\"{}\"", standalone);
        }
        self.prolog.retain(|node| !matches!(node, Node::Declaration(_)));
        self.prolog.insert(0, Node::Declaration(decl));
        self.prolog.insert(1, Node::Text("\n".to_string()));
        self
    }

    /// 从字符串解析文档
    pub fn parse(input: &str) -> Result<Self> {
        let (bom, input) = match input.strip_prefix('\u{feff}') {
            Some(rest) => (true, rest),
            None => (false, input),
        };

        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(false);

        let mut parser = TreeBuilder::default();

        loop {
            let event = reader.read_event().map_err(|e| {
                ContentError::Parse(format!("{} (at byte {})", e, reader.error_position()))
            })?;

            match event {
                Event::Start(start) => {
                    let mut element = parser.open_element(&start)?;
                    element.self_closing = false;
                    parser.stack.push(element);
                }
                Event::Empty(start) => {
                    let element = parser.open_element(&start)?;
                    parser.scopes.pop();
                    parser.attach_element(element)?;
                }
                Event::End(_) => {
                    parser.scopes.pop();
                    let element = parser
                        .stack
                        .pop()
                        .ok_or_else(|| ContentError::Parse("unexpected closing tag".to_string()))?;
                    parser.attach_element(element)?;
                }
                Event::Text(text) => parser.attach_node(Node::Text(utf8(&text)?.to_string())),
                Event::CData(cdata) => parser.attach_node(Node::CData(utf8(&cdata)?.to_string())),
                Event::Comment(comment) => parser.attach_node(Node::Comment(utf8(&comment)?.to_string())),
                Event::Decl(decl) => parser.attach_node(Node::Declaration(utf8(&decl)?.to_string())),
                Event::PI(pi) => parser.attach_node(Node::ProcessingInstruction(utf8(&pi)?.to_string())),
                Event::DocType(doctype) => parser.attach_node(Node::DocType(utf8(&doctype)?.to_string())),
                Event::Eof => break,
            }
        }

        if let Some(open) = parser.stack.last() {
            return Err(ContentError::Parse(format!("unclosed element <{}>", open.name)));
        }

        let root = parser
            .root
            .ok_or_else(|| ContentError::InvalidDocument("document has no root element".to_string()))?;
        let indentation = Indentation {
            unit: detect_indent(&root).unwrap_or_else(|| DEFAULT_INDENT.to_string()),
            newline: detect_newline(&parser.prolog, &root).to_string(),
        };

        Ok(Self {
            bom,
            prolog: parser.prolog,
            root,
            epilog: parser.epilog,
            indentation,
            encoding: SourceEncoding::Utf8,
        })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// 文档使用的缩进单位
    pub fn indent(&self) -> &str {
        &self.indentation.unit
    }

    /// 文档使用的换行符
    pub fn newline(&self) -> &str {
        &self.indentation.newline
    }

    pub fn indentation(&self) -> &Indentation {
        &self.indentation
    }

    pub fn encoding(&self) -> SourceEncoding {
        self.encoding
    }

    pub fn set_encoding(&mut self, encoding: SourceEncoding) {
        self.encoding = encoding;
    }

    /// 是否带 XML 声明
    pub fn has_declaration(&self) -> bool {
        self.prolog.iter().any(|node| matches!(node, Node::Declaration(_)))
    }

    /// 向根元素末尾追加子元素（带格式化）
    pub fn append_to_root(&mut self, child: Element) {
        let indentation = self.indentation.clone();
        self.root.append_formatted(child, 0, &indentation);
    }

    /// 序列化为字符串
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        if self.bom {
            out.push('\u{feff}');
        }
        for node in &self.prolog {
            write_node(&mut out, node);
        }
        write_element(&mut out, &self.root);
        for node in &self.epilog {
            write_node(&mut out, node);
        }
        out
    }
}

impl Element {
    /// 创建无命名空间的元素
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            attributes: IndexMap::new(),
            children: Vec::new(),
            self_closing: true,
        }
    }

    /// 创建与 `parent` 同命名空间（同前缀）的元素
    pub fn in_namespace_of(parent: &Element, local_name: &str) -> Self {
        let name = match parent.prefix() {
            Some(prefix) => format!("{}:{}", prefix, local_name),
            None => local_name.to_string(),
        };
        Self {
            namespace: parent.namespace.clone(),
            ..Self::new(name)
        }
    }

    /// 设置属性（值会被转义）
    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// 追加文本子节点（会被转义）
    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(Node::Text(partial_escape(text).into_owned()));
        self
    }

    /// 追加子元素（不做格式化）
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// 限定名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 本地名（去掉前缀）
    pub fn local_name(&self) -> &str {
        self.name.split_once(':').map_or(self.name.as_str(), |(_, local)| local)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// 读取属性（已反转义）
    pub fn attribute(&self, key: &str) -> Option<Cow<'_, str>> {
        self.attributes
            .get(key)
            .map(|raw| unescape(raw).unwrap_or(Cow::Borrowed(raw.as_str())))
    }

    pub fn set_attribute(&mut self, key: &str, value: &str) {
        self.attributes.insert(key.to_string(), escape(value).into_owned());
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// 所有直接子元素
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// 按本地名和命名空间筛选直接子元素
    pub fn elements_named<'a>(
        &'a self,
        local_name: &'a str,
        namespace: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.child_elements()
            .filter(move |element| element.is_named(local_name, namespace))
    }

    /// 第一个匹配的直接子元素（可变）
    pub fn first_element_mut(&mut self, local_name: &str, namespace: Option<&str>) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|node| match node {
            Node::Element(element) if element.is_named(local_name, namespace) => Some(element),
            _ => None,
        })
    }

    pub fn is_named(&self, local_name: &str, namespace: Option<&str>) -> bool {
        self.local_name() == local_name && self.namespace() == namespace
    }

    /// 拼接所有文本子节点（已反转义）
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(raw) => Some(unescape(raw).unwrap_or(Cow::Borrowed(raw.as_str()))),
                Node::CData(data) => Some(Cow::Borrowed(data.as_str())),
                _ => None,
            })
            .collect()
    }

    /// 追加子元素，并按缩进对齐
    ///
    /// `depth` 为本元素的嵌套深度（根元素为 0）。已有子节点紧凑排列
    /// （没有尾部空白）时直接追加，新子树也保持紧凑，不引入任何换行。
    pub fn append_formatted(&mut self, mut child: Element, depth: usize, indentation: &Indentation) {
        if self.children.is_empty() {
            child.indent_children(depth + 1, indentation);
            self.children.push(Node::Text(indentation.line(depth + 1)));
            self.children.push(Node::Element(child));
            self.children.push(Node::Text(indentation.line(depth)));
            return;
        }

        match self.children.last() {
            Some(Node::Text(raw)) if raw.trim().is_empty() && raw.contains('\n') => {
                child.indent_children(depth + 1, indentation);
                let position = self.children.len() - 1;
                self.children.insert(position, Node::Element(child));
                self.children.insert(position, Node::Text(indentation.line(depth + 1)));
            }
            _ => self.children.push(Node::Element(child)),
        }
    }

    /// 为新建子树插入缩进（仅处理纯元素子节点的元素）
    pub fn indent_children(&mut self, depth: usize, indentation: &Indentation) {
        if self.children.is_empty() || !self.children.iter().all(|node| matches!(node, Node::Element(_))) {
            return;
        }

        let children = std::mem::take(&mut self.children);
        for node in children {
            if let Node::Element(mut element) = node {
                element.indent_children(depth + 1, indentation);
                self.children.push(Node::Text(indentation.line(depth + 1)));
                self.children.push(Node::Element(element));
            }
        }
        self.children.push(Node::Text(indentation.line(depth)));
    }
}

/// 解析过程中的状态
#[derive(Default)]
struct TreeBuilder {
    prolog: Vec<Node>,
    epilog: Vec<Node>,
    root: Option<Element>,
    stack: Vec<Element>,
    /// 命名空间作用域栈：(前缀, URI)，默认命名空间前缀为 None
    scopes: Vec<Vec<(Option<String>, String)>>,
}

impl TreeBuilder {
    /// 由起始标签创建元素，并压入其命名空间作用域
    fn open_element(&mut self, start: &BytesStart) -> Result<Element> {
        let name = utf8(start.name().as_ref())?.to_string();
        let mut attributes = IndexMap::new();
        let mut frame = Vec::new();

        for attr in start.attributes() {
            let attr = attr.map_err(|e| ContentError::Parse(e.to_string()))?;
            let key = utf8(attr.key.as_ref())?.to_string();
            let raw = utf8(attr.value.as_ref())?.to_string();

            if key == "xmlns" {
                frame.push((None, unescape(&raw).unwrap_or(Cow::Borrowed(raw.as_str())).into_owned()));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                frame.push((
                    Some(prefix.to_string()),
                    unescape(&raw).unwrap_or(Cow::Borrowed(raw.as_str())).into_owned(),
                ));
            }
            attributes.insert(key, raw);
        }

        self.scopes.push(frame);

        let prefix = name.split_once(':').map(|(prefix, _)| prefix);
        let namespace = self.resolve_namespace(prefix)?;

        Ok(Element {
            name,
            namespace,
            attributes,
            children: Vec::new(),
            self_closing: true,
        })
    }

    fn resolve_namespace(&self, prefix: Option<&str>) -> Result<Option<String>> {
        if prefix == Some("xml") {
            return Ok(Some("http://www.w3.org/XML/1998/namespace".to_string()));
        }

        let found = self
            .scopes
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(declared, _)| declared.as_deref() == prefix);

        match (found, prefix) {
            // 空 URI 表示取消默认命名空间
            (Some((_, uri)), _) if uri.is_empty() => Ok(None),
            (Some((_, uri)), _) => Ok(Some(uri.clone())),
            (None, None) => Ok(None),
            (None, Some(prefix)) => Err(ContentError::Parse(format!("unbound namespace prefix '{}'", prefix))),
        }
    }

    fn attach_element(&mut self, element: Element) -> Result<()> {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(Node::Element(element));
        } else if self.root.is_none() {
            self.root = Some(element);
        } else {
            return Err(ContentError::Parse("multiple root elements".to_string()));
        }
        Ok(())
    }

    fn attach_node(&mut self, node: Node) {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
        } else if self.root.is_none() {
            self.prolog.push(node);
        } else {
            self.epilog.push(node);
        }
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| ContentError::Parse(e.to_string()))
}

/// 根元素第一个子元素前的空白即为缩进单位
fn detect_indent(root: &Element) -> Option<String> {
    let mut previous: Option<&str> = None;
    for node in &root.children {
        match node {
            Node::Element(_) => {
                let whitespace = previous?;
                let unit = whitespace.rsplit('\n').next()?;
                return (!unit.is_empty() && unit.chars().all(|c| c == ' ' || c == '\t'))
                    .then(|| unit.to_string());
            }
            Node::Text(raw) if raw.trim().is_empty() => previous = Some(raw),
            _ => previous = None,
        }
    }
    None
}

/// 第一处含换行的空白决定换行符
fn detect_newline(prolog: &[Node], root: &Element) -> &'static str {
    fn find(nodes: &[Node]) -> Option<bool> {
        nodes.iter().find_map(|node| match node {
            Node::Text(raw) if raw.contains('\n') => Some(raw.contains("\r\n")),
            Node::Element(element) => find(&element.children),
            _ => None,
        })
    }

    match find(prolog).or_else(|| find(&root.children)) {
        Some(true) => "\r\n",
        _ => DEFAULT_NEWLINE,
    }
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Element(element) => write_element(out, element),
        Node::Text(raw) => out.push_str(raw),
        Node::CData(data) => {
            let _ = write!(out, "<![CDATA[{}]]>", data);
        }
        Node::Comment(comment) => {
            let _ = write!(out, "<!--{}-->", comment);
        }
        Node::ProcessingInstruction(pi) | Node::Declaration(pi) => {
            let _ = write!(out, "<?{}?>", pi);
        }
        Node::DocType(doctype) => {
            let _ = write!(out, "<!DOCTYPE {}>", doctype.trim_start());
        }
    }
}

fn write_element(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.name);
    for (key, raw) in &element.attributes {
        // 原文件用单引号且值里含双引号时保留单引号
        let quote = if raw.contains('"') { '\'' } else { '"' };
        let _ = write!(out, " {}={}{}{}", key, quote, raw, quote);
    }

    if element.children.is_empty() && element.self_closing {
        out.push_str(" />");
        return;
    }

    out.push('>');
    for child in &element.children {
        write_node(out, child);
    }
    let _ = write!(out, "</{}>", element.name);
}
