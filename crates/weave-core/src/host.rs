//! The render target the engine writes to.

use indexmap::IndexMap;

use crate::value::Value;

pub type HostId = usize;

/// Host-tree primitives the reconciler patches through.
///
/// Insertion follows DOM semantics: inserting a node that is already attached
/// somewhere moves it.
pub trait HostTree {
    /// The node the root element is mounted into.
    fn container(&self) -> HostId;

    fn create_element(&mut self, name: &str) -> HostId;

    fn create_text(&mut self, text: &str) -> HostId;

    fn set_text(&mut self, id: HostId, text: &str) -> Result<(), HostError>;

    /// `Null` and `false` values remove the attribute.
    fn set_attribute(&mut self, id: HostId, name: &str, value: &Value) -> Result<(), HostError>;

    fn remove_attribute(&mut self, id: HostId, name: &str) -> Result<(), HostError>;

    /// Inserts `child` under `parent` before `before`, or last when `before`
    /// is `None`.
    fn insert_before(
        &mut self,
        parent: HostId,
        child: HostId,
        before: Option<HostId>,
    ) -> Result<(), HostError>;

    fn remove_child(&mut self, parent: HostId, child: HostId) -> Result<(), HostError>;

    /// Frees a detached node and everything below it.
    fn release(&mut self, id: HostId) -> Result<(), HostError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostError {
    Missing { id: HostId },
    NotAnElement { id: HostId },
    NotAText { id: HostId },
    NotAChild { parent: HostId, child: HostId },
    /// A tree node that should own a host node has none.
    Unbound,
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostError::Missing { id } => write!(f, "host node {id} missing"),
            HostError::NotAnElement { id } => write!(f, "host node {id} is not an element"),
            HostError::NotAText { id } => write!(f, "host node {id} is not a text node"),
            HostError::NotAChild { parent, child } => {
                write!(f, "host node {child} is not a child of {parent}")
            }
            HostError::Unbound => write!(f, "tree node has no host node"),
        }
    }
}

impl std::error::Error for HostError {}

#[derive(Debug)]
enum MemoryKind {
    Container,
    Element {
        name: String,
        attributes: IndexMap<String, String>,
    },
    Text(String),
}

#[derive(Debug)]
struct MemoryNode {
    kind: MemoryKind,
    parent: Option<HostId>,
    children: Vec<HostId>,
}

/// In-memory host tree. Node 0 is the container.
pub struct MemoryHost {
    nodes: Vec<Option<MemoryNode>>, // freed slots are never reused
    writes: usize,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(MemoryNode {
                kind: MemoryKind::Container,
                parent: None,
                children: Vec::new(),
            })],
            writes: 0,
        }
    }

    /// Number of live nodes, container included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Count of mutating calls made so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn contains(&self, id: HostId) -> bool {
        matches!(self.nodes.get(id), Some(Some(_)))
    }

    pub fn children(&self, id: HostId) -> Result<&[HostId], HostError> {
        Ok(&self.node(id)?.children)
    }

    pub fn parent(&self, id: HostId) -> Result<Option<HostId>, HostError> {
        Ok(self.node(id)?.parent)
    }

    pub fn name(&self, id: HostId) -> Result<&str, HostError> {
        match &self.node(id)?.kind {
            MemoryKind::Element { name, .. } => Ok(name),
            _ => Err(HostError::NotAnElement { id }),
        }
    }

    pub fn text(&self, id: HostId) -> Result<&str, HostError> {
        match &self.node(id)?.kind {
            MemoryKind::Text(text) => Ok(text),
            _ => Err(HostError::NotAText { id }),
        }
    }

    pub fn attribute(&self, id: HostId, name: &str) -> Result<Option<&str>, HostError> {
        match &self.node(id)?.kind {
            MemoryKind::Element { attributes, .. } => Ok(attributes.get(name).map(String::as_str)),
            _ => Err(HostError::NotAnElement { id }),
        }
    }

    /// Markup of everything mounted in the container.
    pub fn html(&self) -> String {
        let mut output = String::new();
        if let Some(Some(container)) = self.nodes.first() {
            for &child in &container.children {
                self.write_html(&mut output, child);
            }
        }
        output
    }

    /// Markup of a single node and its descendants.
    pub fn html_of(&self, id: HostId) -> String {
        let mut output = String::new();
        self.write_html(&mut output, id);
        output
    }

    pub fn dump_tree(&self) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, 0, 0);
        output
    }

    fn node(&self, id: HostId) -> Result<&MemoryNode, HostError> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(HostError::Missing { id })
    }

    fn node_mut(&mut self, id: HostId) -> Result<&mut MemoryNode, HostError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(HostError::Missing { id })
    }

    fn push(&mut self, kind: MemoryKind) -> HostId {
        let id = self.nodes.len();
        self.nodes.push(Some(MemoryNode {
            kind,
            parent: None,
            children: Vec::new(),
        }));
        self.writes += 1;
        id
    }

    fn detach(&mut self, child: HostId) -> Result<(), HostError> {
        if let Some(parent) = self.node(child)?.parent {
            let siblings = &mut self.node_mut(parent)?.children;
            siblings.retain(|&id| id != child);
            self.node_mut(child)?.parent = None;
        }
        Ok(())
    }

    fn write_html(&self, output: &mut String, id: HostId) {
        let Some(Some(node)) = self.nodes.get(id) else {
            return;
        };
        match &node.kind {
            MemoryKind::Text(text) => escape_into(output, text),
            MemoryKind::Container => {
                for &child in &node.children {
                    self.write_html(output, child);
                }
            }
            MemoryKind::Element { name, attributes } => {
                output.push('<');
                output.push_str(name);
                for (key, value) in attributes {
                    output.push(' ');
                    output.push_str(key);
                    output.push_str("=\"");
                    escape_into(output, value);
                    output.push('"');
                }
                output.push('>');
                for &child in &node.children {
                    self.write_html(output, child);
                }
                output.push_str("</");
                output.push_str(name);
                output.push('>');
            }
        }
    }

    fn dump_node(&self, output: &mut String, id: HostId, depth: usize) {
        let indent = "  ".repeat(depth);
        match self.nodes.get(id) {
            Some(Some(node)) => {
                let label = match &node.kind {
                    MemoryKind::Container => "#container".to_string(),
                    MemoryKind::Element { name, .. } => format!("<{name}>"),
                    MemoryKind::Text(text) => format!("{text:?}"),
                };
                output.push_str(&format!("{indent}[{id}] {label}\n"));
                for &child in &node.children {
                    self.dump_node(output, child, depth + 1);
                }
            }
            _ => output.push_str(&format!("{indent}[{id}] (missing)\n")),
        }
    }
}

fn escape_into(output: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            _ => output.push(ch),
        }
    }
}

impl HostTree for MemoryHost {
    fn container(&self) -> HostId {
        0
    }

    fn create_element(&mut self, name: &str) -> HostId {
        self.push(MemoryKind::Element {
            name: name.to_string(),
            attributes: IndexMap::new(),
        })
    }

    fn create_text(&mut self, text: &str) -> HostId {
        self.push(MemoryKind::Text(text.to_string()))
    }

    fn set_text(&mut self, id: HostId, text: &str) -> Result<(), HostError> {
        match &mut self.node_mut(id)?.kind {
            MemoryKind::Text(current) => {
                if current != text {
                    *current = text.to_string();
                    self.writes += 1;
                }
                Ok(())
            }
            _ => Err(HostError::NotAText { id }),
        }
    }

    fn set_attribute(&mut self, id: HostId, name: &str, value: &Value) -> Result<(), HostError> {
        if !value.is_present_attribute() {
            return self.remove_attribute(id, name);
        }
        let text = match value {
            Value::Bool(true) => String::new(),
            other => other.to_string(),
        };
        match &mut self.node_mut(id)?.kind {
            MemoryKind::Element { attributes, .. } => {
                if attributes.get(name) != Some(&text) {
                    attributes.insert(name.to_string(), text);
                    self.writes += 1;
                }
                Ok(())
            }
            _ => Err(HostError::NotAnElement { id }),
        }
    }

    fn remove_attribute(&mut self, id: HostId, name: &str) -> Result<(), HostError> {
        match &mut self.node_mut(id)?.kind {
            MemoryKind::Element { attributes, .. } => {
                if attributes.shift_remove(name).is_some() {
                    self.writes += 1;
                }
                Ok(())
            }
            _ => Err(HostError::NotAnElement { id }),
        }
    }

    fn insert_before(
        &mut self,
        parent: HostId,
        child: HostId,
        before: Option<HostId>,
    ) -> Result<(), HostError> {
        if matches!(self.node(parent)?.kind, MemoryKind::Text(_)) {
            return Err(HostError::NotAnElement { id: parent });
        }
        self.node(child)?;
        self.detach(child)?;
        let siblings = &mut self.node_mut(parent)?.children;
        let index = match before {
            Some(anchor) => siblings
                .iter()
                .position(|&id| id == anchor)
                .ok_or(HostError::NotAChild {
                    parent,
                    child: anchor,
                })?,
            None => siblings.len(),
        };
        siblings.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        self.writes += 1;
        Ok(())
    }

    fn remove_child(&mut self, parent: HostId, child: HostId) -> Result<(), HostError> {
        if self.node(child)?.parent != Some(parent) {
            return Err(HostError::NotAChild { parent, child });
        }
        self.detach(child)?;
        self.writes += 1;
        Ok(())
    }

    fn release(&mut self, id: HostId) -> Result<(), HostError> {
        if id == self.container() {
            return Err(HostError::NotAChild { parent: id, child: id });
        }
        self.detach(id)?;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current).and_then(Option::take) {
                stack.extend(node.children);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_markup() {
        let mut host = MemoryHost::new();
        let div = host.create_element("div");
        let text = host.create_text("a < b");
        host.set_attribute(div, "id", &Value::from("x")).unwrap();
        host.set_attribute(div, "hidden", &Value::Bool(true)).unwrap();
        host.insert_before(div, text, None).unwrap();
        host.insert_before(host.container(), div, None).unwrap();

        assert_eq!(host.html(), "<div id=\"x\" hidden=\"\">a &lt; b</div>");
    }

    #[test]
    fn false_and_null_attributes_are_removed() {
        let mut host = MemoryHost::new();
        let div = host.create_element("div");
        host.set_attribute(div, "title", &Value::from("t")).unwrap();
        host.set_attribute(div, "title", &Value::Bool(false)).unwrap();
        host.set_attribute(div, "lang", &Value::Null).unwrap();
        assert_eq!(host.attribute(div, "title").unwrap(), None);
        assert_eq!(host.html_of(div), "<div></div>");
    }

    #[test]
    fn insert_before_moves_attached_nodes() {
        let mut host = MemoryHost::new();
        let root = host.container();
        let a = host.create_text("a");
        let b = host.create_text("b");
        host.insert_before(root, a, None).unwrap();
        host.insert_before(root, b, None).unwrap();
        host.insert_before(root, b, Some(a)).unwrap();
        assert_eq!(host.html(), "ba");
        assert_eq!(host.children(root).unwrap(), &[b, a]);
    }

    #[test]
    fn insert_before_unknown_anchor_fails() {
        let mut host = MemoryHost::new();
        let root = host.container();
        let a = host.create_text("a");
        let stray = host.create_text("stray");
        assert_eq!(
            host.insert_before(root, a, Some(stray)),
            Err(HostError::NotAChild {
                parent: root,
                child: stray
            })
        );
    }

    #[test]
    fn release_frees_the_whole_subtree() {
        let mut host = MemoryHost::new();
        let root = host.container();
        let div = host.create_element("div");
        let span = host.create_element("span");
        let text = host.create_text("t");
        host.insert_before(span, text, None).unwrap();
        host.insert_before(div, span, None).unwrap();
        host.insert_before(root, div, None).unwrap();

        host.remove_child(root, div).unwrap();
        host.release(div).unwrap();

        assert!(!host.contains(div));
        assert!(!host.contains(span));
        assert!(!host.contains(text));
        assert!(host.is_empty());
        assert_eq!(host.remove_child(root, div), Err(HostError::Missing { id: div }));
    }

    #[test]
    fn unchanged_writes_are_not_counted() {
        let mut host = MemoryHost::new();
        let text = host.create_text("same");
        let before = host.writes();
        host.set_text(text, "same").unwrap();
        assert_eq!(host.writes(), before);
        host.set_text(text, "other").unwrap();
        assert_eq!(host.writes(), before + 1);
    }
}
