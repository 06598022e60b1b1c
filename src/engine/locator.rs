//! Whole-document text search across node boundaries.

use crate::dom::{Boundary, Document, NodeId, Range};

use super::{HIGHLIGHT_CLASS, UI_ATTR};

/// Where one text node's content sits inside the concatenated buffer.
struct Span {
    node: NodeId,
    start: usize,
    len: usize,
}

impl Span {
    fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Find the first occurrence of `search` in the text under `root`.
///
/// Text already inside a marker (or inside engine UI) is left out of the
/// search. Matching is case- and whitespace-exact. Returns `None` when the
/// text is absent, empty after trimming, or when the rebuilt range does not
/// serialize back to exactly `search`. The document is never mutated.
pub fn locate(doc: &Document, root: NodeId, search: &str) -> Option<Range> {
    if search.trim().is_empty() {
        return None;
    }

    let mut buffer = String::new();
    let mut spans = Vec::new();
    for node in doc.text_nodes(root) {
        if is_excluded(doc, node) {
            continue;
        }
        let Some(text) = doc.text(node) else {
            continue;
        };
        spans.push(Span {
            node,
            start: buffer.len(),
            len: text.len(),
        });
        buffer.push_str(text);
    }

    let match_start = buffer.find(search)?;
    let match_end = match_start + search.len();

    let start_span = spans.iter().find(|s| s.end() > match_start)?;
    let end_span = spans.iter().find(|s| s.end() >= match_end)?;

    let range = Range::new(
        Boundary::new(start_span.node, match_start - start_span.start),
        Boundary::new(end_span.node, match_end - end_span.start),
    );

    if doc.range_to_string(&range) != search {
        tracing::debug!("Located text failed the round-trip check, treating as not found");
        return None;
    }
    Some(range)
}

fn is_excluded(doc: &Document, text_node: NodeId) -> bool {
    let Some(parent) = doc.parent(text_node) else {
        return true;
    };
    doc.closest_with_class(parent, HIGHLIGHT_CLASS).is_some()
        || doc.closest_with_attr(parent, UI_ATTR).is_some()
}
