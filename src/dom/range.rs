//! Live ranges over a [`Document`].
//!
//! Boundary offsets follow the DOM convention: a byte offset into the text
//! for text nodes, a child index for everything else.

use std::collections::HashMap;

use thiserror::Error;

use super::{Document, NodeId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("range partially selects a non-text node")]
    InvalidState,

    #[error("offset is out of bounds")]
    IndexSize,

    #[error("operation is not valid for this node type")]
    InvalidNodeType,

    #[error("range boundary is not connected to the document")]
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A pair of boundary points. Ranges are plain values: cloning one captures
/// the boundaries at that moment, independent of any later selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Boundary,
    pub end: Boundary,
}

impl Range {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    pub fn collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Tree-order slots: every node gets an enter slot and an exit slot.
struct TreeOrder {
    enter: HashMap<NodeId, usize>,
    exit: HashMap<NodeId, usize>,
}

impl TreeOrder {
    fn build(doc: &Document, root: NodeId) -> Self {
        let mut order = TreeOrder {
            enter: HashMap::new(),
            exit: HashMap::new(),
        };
        let mut slot = 0usize;
        order.visit(doc, root, &mut slot);
        order
    }

    fn visit(&mut self, doc: &Document, id: NodeId, slot: &mut usize) {
        self.enter.insert(id, *slot);
        *slot += 1;
        for child in doc.children(id) {
            self.visit(doc, *child, slot);
        }
        self.exit.insert(id, *slot);
        *slot += 1;
    }

    /// Comparable position of a boundary point. Text-interior points sort
    /// after the point right before the text node.
    fn position(&self, doc: &Document, b: Boundary) -> Option<(usize, usize)> {
        if doc.is_text(b.node) {
            return Some((*self.enter.get(&b.node)?, b.offset + 1));
        }
        match doc.children(b.node).get(b.offset) {
            Some(child) => Some((*self.enter.get(child)?, 0)),
            None => Some((*self.exit.get(&b.node)?, 0)),
        }
    }
}

impl Document {
    fn check_boundary(&self, b: Boundary) -> Result<(), DomError> {
        if !self.is_connected(b.node) {
            return Err(DomError::Disconnected);
        }
        if b.offset > self.node_len(b.node) {
            return Err(DomError::IndexSize);
        }
        if let Some(text) = self.text(b.node) {
            if !text.is_char_boundary(b.offset) {
                return Err(DomError::IndexSize);
            }
        }
        Ok(())
    }

    /// Validate that both boundaries are connected, in bounds and ordered.
    pub fn check_range(&self, range: &Range) -> Result<(), DomError> {
        self.check_boundary(range.start)?;
        self.check_boundary(range.end)?;
        let order = TreeOrder::build(self, self.root);
        let start = order
            .position(self, range.start)
            .ok_or(DomError::Disconnected)?;
        let end = order
            .position(self, range.end)
            .ok_or(DomError::Disconnected)?;
        if start > end {
            return Err(DomError::IndexSize);
        }
        Ok(())
    }

    /// Text selected by the range, concatenated in document order.
    pub fn range_to_string(&self, range: &Range) -> String {
        self.selected_text_spans(range)
            .into_iter()
            .filter_map(|(node, from, to)| self.text(node).map(|text| &text[from..to]))
            .collect()
    }

    /// Text nodes the range selects a non-empty part of, each with the
    /// selected byte span, in document order.
    pub fn selected_text_spans(&self, range: &Range) -> Vec<(NodeId, usize, usize)> {
        if self.check_range(range).is_err() {
            return Vec::new();
        }
        if range.start.node == range.end.node && self.is_text(range.start.node) {
            if range.start.offset < range.end.offset {
                return vec![(range.start.node, range.start.offset, range.end.offset)];
            }
            return Vec::new();
        }

        let order = TreeOrder::build(self, self.root);
        let (Some(start), Some(end)) = (
            order.position(self, range.start),
            order.position(self, range.end),
        ) else {
            return Vec::new();
        };

        let mut spans = Vec::new();
        for node in self.text_nodes(self.root) {
            let Some(text) = self.text(node) else {
                continue;
            };
            let Some(enter) = order.enter.get(&node).copied() else {
                continue;
            };
            let from = if node == range.start.node {
                range.start.offset
            } else if start.0 <= enter {
                0
            } else {
                text.len()
            };
            let to = if node == range.end.node {
                range.end.offset
            } else if end.0 > enter {
                text.len()
            } else {
                0
            };
            if from < to {
                spans.push((node, from, to));
            }
        }
        spans
    }

    /// Deepest node that is an inclusive ancestor of both boundaries.
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let b_ancestors = self.ancestors(b);
        self.ancestors(a)
            .into_iter()
            .find(|n| b_ancestors.contains(n))
    }

    /// Wrap the range's contents in `wrapper`, in place.
    ///
    /// Fails with [`DomError::InvalidState`] when a non-text node is only
    /// partially inside the range, leaving the document untouched.
    pub fn surround_contents(&mut self, range: &Range, wrapper: NodeId) -> Result<(), DomError> {
        self.check_range(range)?;
        if !self.is_element(wrapper) {
            return Err(DomError::InvalidNodeType);
        }

        let start_chain = self.ancestors(range.start.node);
        let end_chain = self.ancestors(range.end.node);
        let partial_start = start_chain
            .iter()
            .any(|n| !end_chain.contains(n) && !self.is_text(*n));
        let partial_end = end_chain
            .iter()
            .any(|n| !start_chain.contains(n) && !self.is_text(*n));
        if partial_start || partial_end {
            return Err(DomError::InvalidState);
        }

        let (container, index, contents) = self.extract_contents(range)?;
        for child in self.children(wrapper).to_vec() {
            self.remove(child);
        }
        self.insert_at(container, index, wrapper);
        for node in contents {
            self.append_child(wrapper, node);
        }
        Ok(())
    }

    /// Move the range's contents out of the tree.
    ///
    /// Partially selected text nodes are split; partially selected elements
    /// are shallow-cloned so the extracted nodes keep their formatting
    /// ancestors. Returns the collapsed insertion point `(container, index)`
    /// and the detached top-level nodes in document order.
    pub fn extract_contents(
        &mut self,
        range: &Range,
    ) -> Result<(NodeId, usize, Vec<NodeId>), DomError> {
        self.check_range(range)?;

        // End first, so splitting the start node keeps the end offset valid
        // when both boundaries share a text node.
        let (end_container, mut end_index, _) = self.split_boundary(range.end)?;
        let (start_container, start_index, split) = self.split_boundary(range.start)?;
        if split && start_container == end_container {
            end_index += 1;
        }

        Ok(self.extract_between(start_container, start_index, end_container, end_index))
    }

    /// Turn a boundary into an element-level `(container, index)` point,
    /// splitting the text node when the boundary falls inside it.
    fn split_boundary(&mut self, b: Boundary) -> Result<(NodeId, usize, bool), DomError> {
        let Some(text) = self.text(b.node) else {
            return Ok((b.node, b.offset, false));
        };
        let len = text.len();
        let parent = self.parent(b.node).ok_or(DomError::Disconnected)?;
        let index = self.index_in_parent(b.node).ok_or(DomError::Disconnected)?;

        if b.offset == 0 {
            return Ok((parent, index, false));
        }
        if b.offset >= len {
            return Ok((parent, index + 1, false));
        }
        self.split_text(b.node, b.offset)?;
        Ok((parent, index + 1, true))
    }

    fn extract_between(
        &mut self,
        start_container: NodeId,
        start_index: usize,
        end_container: NodeId,
        end_index: usize,
    ) -> (NodeId, usize, Vec<NodeId>) {
        if start_container == end_container {
            let end_index = end_index.min(self.children(start_container).len());
            let moved: Vec<NodeId> = if start_index < end_index {
                self.children(start_container)[start_index..end_index].to_vec()
            } else {
                Vec::new()
            };
            for node in &moved {
                self.remove(*node);
            }
            return (start_container, start_index, moved);
        }

        let Some(ancestor) = self.common_ancestor(start_container, end_container) else {
            return (start_container, start_index, Vec::new());
        };

        let first_partial = (start_container != ancestor)
            .then(|| self.child_towards(ancestor, start_container))
            .flatten();
        let last_partial = (end_container != ancestor)
            .then(|| self.child_towards(ancestor, end_container))
            .flatten();

        let middle_from = match first_partial {
            Some(p) => self.index_in_parent(p).map_or(start_index, |i| i + 1),
            None => start_index,
        };
        let middle_to = match last_partial {
            Some(p) => self.index_in_parent(p).unwrap_or(end_index),
            None => end_index.min(self.children(ancestor).len()),
        };
        let middle: Vec<NodeId> = if middle_from < middle_to {
            self.children(ancestor)[middle_from..middle_to].to_vec()
        } else {
            Vec::new()
        };

        let mut out = Vec::new();

        if let Some(partial) = first_partial {
            let clone = self.clone_shallow(partial);
            let len = self.children(partial).len();
            let (_, _, inner) = self.extract_between(start_container, start_index, partial, len);
            for node in inner {
                self.append_child(clone, node);
            }
            out.push(clone);
        }

        for node in middle {
            self.remove(node);
            out.push(node);
        }

        if let Some(partial) = last_partial {
            let clone = self.clone_shallow(partial);
            let (_, _, inner) = self.extract_between(partial, 0, end_container, end_index);
            for node in inner {
                self.append_child(clone, node);
            }
            out.push(clone);
        }

        let insertion = match first_partial {
            Some(p) => self.index_in_parent(p).map_or(start_index, |i| i + 1),
            None => start_index,
        };
        (ancestor, insertion, out)
    }

    /// Child of `ancestor` that contains `node`.
    fn child_towards(&self, ancestor: NodeId, node: NodeId) -> Option<NodeId> {
        let mut cursor = node;
        while let Some(parent) = self.parent(cursor) {
            if parent == ancestor {
                return Some(cursor);
            }
            cursor = parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse_html;
    use super::*;

    fn texts(doc: &Document) -> Vec<NodeId> {
        doc.text_nodes(doc.root())
    }

    fn paragraph_html(doc: &Document) -> String {
        doc.outer_html(doc.elements_by_tag("p")[0])
    }

    #[test]
    fn range_to_string_within_one_text_node() {
        let doc = parse_html("<p>abc abc</p>").unwrap();
        let t = texts(&doc)[0];
        let range = Range::new(Boundary::new(t, 4), Boundary::new(t, 7));
        assert_eq!(doc.range_to_string(&range), "abc");
    }

    #[test]
    fn range_to_string_across_elements() {
        let doc = parse_html("<p>hello <b>big</b> world</p>").unwrap();
        let t = texts(&doc);
        let range = Range::new(Boundary::new(t[0], 3), Boundary::new(t[2], 3));
        assert_eq!(doc.range_to_string(&range), "lo big wo");
    }

    #[test]
    fn range_to_string_with_element_boundaries() {
        let doc = parse_html("<p>one<i>two</i>three</p>").unwrap();
        let p = doc.elements_by_tag("p")[0];
        let range = Range::new(Boundary::new(p, 1), Boundary::new(p, 2));
        assert_eq!(doc.range_to_string(&range), "two");
    }

    #[test]
    fn surround_contents_inside_single_text_node() {
        let mut doc = parse_html("<p>say hello there</p>").unwrap();
        let t = texts(&doc)[0];
        let range = Range::new(Boundary::new(t, 4), Boundary::new(t, 9));
        let mark = doc.create_element("mark");

        doc.surround_contents(&range, mark).unwrap();
        assert_eq!(paragraph_html(&doc), "<p>say <mark>hello</mark> there</p>");
    }

    #[test]
    fn surround_contents_across_sibling_text_nodes() {
        let mut doc = parse_html("<p>x</p>").unwrap();
        let p = doc.elements_by_tag("p")[0];
        let first = doc.create_text("hello ");
        let second = doc.create_text("world!");
        doc.append_child(p, first);
        doc.append_child(p, second);

        let range = Range::new(Boundary::new(first, 0), Boundary::new(second, 5));
        let mark = doc.create_element("mark");
        doc.surround_contents(&range, mark).unwrap();

        assert_eq!(paragraph_html(&doc), "<p>x<mark>hello world</mark>!</p>");
    }

    #[test]
    fn surround_contents_keeps_whole_inline_elements() {
        let mut doc = parse_html("<p>a <b>bold</b> z</p>").unwrap();
        let t = texts(&doc);
        let range = Range::new(Boundary::new(t[0], 0), Boundary::new(t[2], 2));
        let mark = doc.create_element("mark");

        doc.surround_contents(&range, mark).unwrap();
        assert_eq!(paragraph_html(&doc), "<p><mark>a <b>bold</b> z</mark></p>");
    }

    #[test]
    fn surround_contents_rejects_partial_element() {
        let mut doc = parse_html("<p>a <b>bold</b> z</p>").unwrap();
        let t = texts(&doc);
        let range = Range::new(Boundary::new(t[0], 0), Boundary::new(t[1], 2));
        let mark = doc.create_element("mark");

        let before = doc.to_html();
        assert_eq!(doc.surround_contents(&range, mark), Err(DomError::InvalidState));
        assert_eq!(doc.to_html(), before);
    }

    #[test]
    fn extract_contents_clones_partial_elements() {
        let mut doc = parse_html("<p>a <b>bold</b> z</p>").unwrap();
        let t = texts(&doc);
        let range = Range::new(Boundary::new(t[0], 2), Boundary::new(t[1], 2));

        let (container, index, nodes) = doc.extract_contents(&range).unwrap();
        let extracted: String = nodes.iter().map(|n| doc.outer_html(*n)).collect();

        assert_eq!(extracted, "<b>bo</b>");
        assert_eq!(doc.tag(container), Some("p"));
        assert_eq!(index, 1);
        assert_eq!(paragraph_html(&doc), "<p>a <b>ld</b> z</p>");
    }

    #[test]
    fn check_range_rejects_reversed_boundaries() {
        let doc = parse_html("<p>abc</p>").unwrap();
        let t = texts(&doc)[0];
        let range = Range::new(Boundary::new(t, 2), Boundary::new(t, 1));
        assert_eq!(doc.check_range(&range), Err(DomError::IndexSize));
    }
}
