//! In-process document model.
//!
//! An arena tree with the handful of DOM primitives the annotation engine
//! relies on: tree walking, attribute access, text content, node
//! insertion/removal and ranges (see [`range`]). Nodes that are removed from
//! the tree stay in the arena as detached nodes, so a stale `NodeId` is never
//! dangling, it just stops being connected.

mod parse;
mod range;
mod serialize;

pub use parse::parse_html;
pub use range::{Boundary, DomError, Range};

/// Opaque handle to a node in a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    /// Shallow copy of an element (tag and attributes, no children).
    pub fn clone_shallow(&mut self, id: NodeId) -> NodeId {
        let kind = self.nodes[id.0].kind.clone();
        self.alloc(kind)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Text(_))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element(_))
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el.tag.as_str()),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: &str) {
        if let NodeKind::Text(text) = &mut self.nodes[id.0].kind {
            *text = value.to_string();
        }
    }

    /// Length of a node for range offsets: bytes for text, child count otherwise.
    pub fn node_len(&self, id: NodeId) -> usize {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => text.len(),
            _ => self.nodes[id.0].children.len(),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.nodes[parent.0].children.iter().position(|c| *c == id)
    }

    /// Whether the node is attached to this document's root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.is_inclusive_ancestor(self.root, id)
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Inclusive ancestors, starting at `id` and ending at the tree root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            out.push(current);
            cursor = self.parent(current);
        }
        out
    }

    /// Detach a node from its parent. No-op for detached nodes.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.remove(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` into `parent` at `index` (clamped to the child count).
    pub fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.remove(child);
        let len = self.nodes[parent.0].children.len();
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index.min(len), child);
    }

    /// Put `new` where `old` is and detach `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        let Some(parent) = self.parent(old) else {
            return;
        };
        let Some(index) = self.index_in_parent(old) else {
            return;
        };
        self.remove(new);
        self.nodes[old.0].parent = None;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[parent.0].children[index] = new;
    }

    /// Split a text node at a byte offset. The original keeps the prefix and
    /// the returned node, inserted right after it, holds the rest.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, DomError> {
        let Some(text) = self.text(id) else {
            return Err(DomError::InvalidNodeType);
        };
        if offset > text.len() || !text.is_char_boundary(offset) {
            return Err(DomError::IndexSize);
        }
        let tail = text[offset..].to_string();
        let head = text[..offset].to_string();
        self.set_text(id, &head);
        let new = self.create_text(&tail);
        if let (Some(parent), Some(index)) = (self.parent(id), self.index_in_parent(id)) {
            self.insert_at(parent, index + 1, new);
        }
        Ok(new)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => el
                .attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element(el) = &mut self.nodes[id.0].kind {
            match el.attrs.iter_mut().find(|(k, _)| k == name) {
                Some(slot) => slot.1 = value.to_string(),
                None => el.attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeKind::Element(el) = &mut self.nodes[id.0].kind {
            el.attrs.retain(|(k, _)| k != name);
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .map(|classes| classes.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Nearest inclusive ancestor element carrying `class`.
    pub fn closest_with_class(&self, id: NodeId, class: &str) -> Option<NodeId> {
        self.ancestors(id)
            .into_iter()
            .find(|n| self.is_element(*n) && self.has_class(*n, class))
    }

    /// Nearest inclusive ancestor element carrying attribute `name`.
    pub fn closest_with_attr(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.ancestors(id)
            .into_iter()
            .find(|n| self.attr(*n, name).is_some())
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => out.push_str(text),
            _ => {
                for child in &self.nodes[id.0].children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    pub fn text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.is_text(*n))
            .collect()
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|n| self.tag(*n) == Some(tag))
            .collect()
    }

    /// First connected element whose `id` attribute equals `value`.
    pub fn get_element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.attr(*n, "id") == Some(value))
    }

    /// Connected elements whose attribute `name` equals `value`.
    pub fn query_by_attr(&self, name: &str, value: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|n| self.attr(*n, name) == Some(value))
            .collect()
    }

    pub fn query_by_class(&self, class: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|n| self.is_element(*n) && self.has_class(*n, class))
            .collect()
    }

    /// The `<body>` element, or the document root for body-less fragments.
    pub fn body(&self) -> NodeId {
        self.elements_by_tag("body")
            .into_iter()
            .next()
            .unwrap_or(self.root)
    }

    pub fn head(&self) -> Option<NodeId> {
        self.elements_by_tag("head").into_iter().next()
    }

    pub fn to_html(&self) -> String {
        serialize::serialize_children(self, self.root)
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        serialize::serialize_node(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_text_inserts_tail_after_original() {
        let mut doc = parse_html("<p>hello world</p>").unwrap();
        let text = doc.text_nodes(doc.root())[0];
        let tail = doc.split_text(text, 5).unwrap();

        assert_eq!(doc.text(text), Some("hello"));
        assert_eq!(doc.text(tail), Some(" world"));
        assert_eq!(doc.parent(tail), doc.parent(text));
        assert_eq!(doc.outer_html(doc.elements_by_tag("p")[0]), "<p>hello world</p>");
        assert_eq!(doc.children(doc.parent(text).unwrap()).len(), 2);
    }

    #[test]
    fn split_text_rejects_offsets_inside_a_char() {
        let mut doc = parse_html("<p>héllo</p>").unwrap();
        let text = doc.text_nodes(doc.root())[0];
        assert_eq!(doc.split_text(text, 2), Err(DomError::IndexSize));
    }

    #[test]
    fn replace_swaps_node_in_place() {
        let mut doc = parse_html("<p>a<b>b</b>c</p>").unwrap();
        let b = doc.elements_by_tag("b")[0];
        let replacement = doc.create_text("B");
        doc.replace(b, replacement);

        assert_eq!(doc.outer_html(doc.elements_by_tag("p")[0]), "<p>aBc</p>");
        assert!(!doc.is_connected(b));
    }

    #[test]
    fn closest_with_class_is_inclusive() {
        let doc = parse_html(r#"<div class="x y"><span>t</span></div>"#).unwrap();
        let div = doc.elements_by_tag("div")[0];
        let text = doc.text_nodes(doc.root())[0];

        assert_eq!(doc.closest_with_class(text, "y"), Some(div));
        assert_eq!(doc.closest_with_class(div, "x"), Some(div));
        assert_eq!(doc.closest_with_class(text, "z"), None);
    }

    #[test]
    fn body_falls_back_to_root() {
        let doc = parse_html("<p>no body here</p>").unwrap();
        assert_eq!(doc.body(), doc.root());

        let doc = parse_html("<html><body><p>x</p></body></html>").unwrap();
        assert_eq!(doc.tag(doc.body()), Some("body"));
    }

    #[test]
    fn get_element_by_id_ignores_detached_nodes() {
        let mut doc = parse_html(r#"<div id="a"></div>"#).unwrap();
        let div = doc.get_element_by_id("a").unwrap();
        doc.remove(div);
        assert_eq!(doc.get_element_by_id("a"), None);
    }
}
