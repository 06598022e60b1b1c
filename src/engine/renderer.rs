//! Marker elements: wrapping located text, and unwrapping it again.

use thiserror::Error;

use crate::anchor::{display_text, Anchor};
use crate::dom::{DomError, Document, NodeId, Range};

use super::{
    ATTR_ANCHOR_ID, ATTR_COMMENT, ATTR_SEQUENCE, DELETE_CLASS, HIGHLIGHT_CLASS, STYLE_ID,
    TOOLTIP_ID, UI_ATTR,
};

const MARKER_TAG: &str = "mark";
const DELETE_LABEL: &str = "\u{d7}";

const MARKER_STYLES: &str = concat!(
    "mark.reforma-highlight{background-color:#FFE5F2!important;color:inherit!important;",
    "padding:2px 18px 2px 1px!important;border-radius:2px!important;position:relative!important;display:inline!important}",
    "mark.reforma-highlight[data-reforma-comment-number]::after{content:\"#\" attr(data-reforma-comment-number);",
    "font-size:9px;font-weight:700;color:#9E198C;background:#FEDAF5;padding:1px 3px;border-radius:2px;",
    "margin-left:3px;vertical-align:super}",
    "mark.reforma-highlight:hover{background-color:#FEDAF5!important}",
    ".reforma-highlight-delete{position:absolute!important;top:-6px!important;right:2px!important;",
    "width:16px!important;height:16px!important;background:#9E198C!important;color:#fff!important;",
    "border:none!important;border-radius:50%!important;cursor:pointer!important;font-size:14px!important}",
    "#reforma-highlight-toolbar,#reforma-highlight-panel{position:fixed;z-index:2147483646;",
    "font-family:system-ui,sans-serif;font-size:13px;box-shadow:0 2px 12px rgba(0,0,0,0.15);",
    "border-radius:8px;background:#fff}",
    "#reforma-highlight-tooltip{position:fixed;z-index:2147483647;max-width:280px;padding:8px 12px;",
    "background:#372828;color:#F9F6F6;font-size:12px;border-radius:6px;pointer-events:none}",
);

/// How the marker ended up around the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapStrategy {
    /// The range was wrapped in place; existing nodes kept their identity.
    Surround,
    /// The range crossed an element boundary; its contents were extracted
    /// (partially selected elements cloned) and re-inserted in the marker.
    ExtractReinsert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedMarker {
    pub marker: NodeId,
    pub strategy: WrapStrategy,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("range is collapsed")]
    Collapsed,

    #[error("range cannot be wrapped: {0}")]
    Unwrappable(#[from] DomError),
}

/// Wrap `range` in a marker for `anchor` and attach its delete control.
///
/// Callers check that no marker for `anchor.id` exists yet.
pub fn render(
    doc: &mut Document,
    range: &Range,
    anchor: &Anchor,
) -> Result<RenderedMarker, RenderError> {
    if range.collapsed() {
        return Err(RenderError::Collapsed);
    }

    let marker = create_marker(doc, anchor);
    let strategy = match doc.surround_contents(range, marker) {
        Ok(()) => WrapStrategy::Surround,
        Err(DomError::InvalidState) => {
            let (container, index, contents) = doc.extract_contents(range)?;
            doc.insert_at(container, index, marker);
            for node in contents {
                doc.append_child(marker, node);
            }
            WrapStrategy::ExtractReinsert
        }
        Err(e) => return Err(e.into()),
    };

    let delete = doc.create_element("button");
    doc.set_attr(delete, "class", DELETE_CLASS);
    doc.set_attr(delete, "type", "button");
    doc.set_attr(delete, "aria-label", "Delete highlight");
    let label = doc.create_text(DELETE_LABEL);
    doc.append_child(delete, label);
    doc.append_child(marker, delete);

    tracing::debug!("Rendered highlight {} ({:?})", anchor.id, strategy);
    Ok(RenderedMarker { marker, strategy })
}

fn create_marker(doc: &mut Document, anchor: &Anchor) -> NodeId {
    let marker = doc.create_element(MARKER_TAG);
    doc.set_attr(marker, "class", HIGHLIGHT_CLASS);
    doc.set_attr(marker, ATTR_ANCHOR_ID, &anchor.id);
    if let Some(n) = anchor.sequence_number {
        doc.set_attr(marker, ATTR_SEQUENCE, &n.to_string());
    }
    if !anchor.comment.is_empty() {
        doc.set_attr(marker, ATTR_COMMENT, &anchor.comment);
    }
    doc.set_attr(marker, "title", &anchor.display_text());
    marker
}

/// The live marker for an anchor id, if one is rendered.
pub fn find_marker(doc: &Document, anchor_id: &str) -> Option<NodeId> {
    doc.query_by_attr(ATTR_ANCHOR_ID, anchor_id)
        .into_iter()
        .find(|n| doc.has_class(*n, HIGHLIGHT_CLASS))
}

/// Ids of every rendered marker, in document order.
pub fn rendered_ids(doc: &Document) -> Vec<String> {
    doc.query_by_class(HIGHLIGHT_CLASS)
        .into_iter()
        .filter_map(|n| doc.attr(n, ATTR_ANCHOR_ID).map(str::to_string))
        .collect()
}

/// Marker text without any delete control's label, at any depth.
pub fn marker_text(doc: &Document, marker: NodeId) -> String {
    let mut out = String::new();
    collect_page_text(doc, marker, &mut out);
    out
}

fn collect_page_text(doc: &Document, node: NodeId, out: &mut String) {
    if let Some(text) = doc.text(node) {
        out.push_str(text);
        return;
    }
    for child in doc.children(node) {
        if !doc.has_class(*child, DELETE_CLASS) {
            collect_page_text(doc, *child, out);
        }
    }
}

/// Anchor id of the marker owning a delete control.
pub fn delete_target(doc: &Document, node: NodeId) -> Option<String> {
    let control = doc.closest_with_class(node, DELETE_CLASS)?;
    let marker = doc.closest_with_class(control, HIGHLIGHT_CLASS)?;
    doc.attr(marker, ATTR_ANCHOR_ID).map(str::to_string)
}

/// Replace the marker for `anchor_id` with one plain text node. Returns
/// `false` when no such marker is rendered.
pub fn unrender(doc: &mut Document, anchor_id: &str) -> bool {
    let Some(marker) = find_marker(doc, anchor_id) else {
        return false;
    };
    unwrap_marker(doc, marker);
    true
}

pub(crate) fn unwrap_marker(doc: &mut Document, marker: NodeId) {
    let text = marker_text(doc, marker);
    let replacement = doc.create_text(&text);
    doc.replace(marker, replacement);
}

/// Refresh the comment shown by a rendered marker.
pub fn update_marker_comment(doc: &mut Document, anchor_id: &str, comment: &str) -> bool {
    let Some(marker) = find_marker(doc, anchor_id) else {
        return false;
    };
    if comment.is_empty() {
        doc.remove_attr(marker, ATTR_COMMENT);
    } else {
        doc.set_attr(marker, ATTR_COMMENT, comment);
    }
    let sequence = doc.attr(marker, ATTR_SEQUENCE).and_then(|n| n.parse().ok());
    doc.set_attr(marker, "title", &display_text(sequence, comment));
    true
}

/// Show the hover tooltip for a marker. Markers with neither a comment nor
/// a number get no tooltip.
pub fn show_tooltip(doc: &mut Document, anchor_id: &str) -> Option<NodeId> {
    let marker = find_marker(doc, anchor_id)?;
    let comment = doc.attr(marker, ATTR_COMMENT).unwrap_or("").to_string();
    let sequence = doc.attr(marker, ATTR_SEQUENCE).and_then(|n| n.parse().ok());
    if comment.is_empty() && sequence.is_none() {
        return None;
    }

    let tooltip = match doc.get_element_by_id(TOOLTIP_ID) {
        Some(existing) => {
            for child in doc.children(existing).to_vec() {
                doc.remove(child);
            }
            existing
        }
        None => {
            let tooltip = doc.create_element("div");
            doc.set_attr(tooltip, "id", TOOLTIP_ID);
            doc.set_attr(tooltip, UI_ATTR, "");
            let body = doc.body();
            doc.append_child(body, tooltip);
            tooltip
        }
    };
    let label = doc.create_text(&display_text(sequence, &comment));
    doc.append_child(tooltip, label);
    Some(tooltip)
}

pub fn hide_tooltip(doc: &mut Document) {
    if let Some(tooltip) = doc.get_element_by_id(TOOLTIP_ID) {
        doc.remove(tooltip);
    }
}

/// Add the marker stylesheet once per document.
pub fn inject_styles(doc: &mut Document) -> bool {
    if doc.get_element_by_id(STYLE_ID).is_some() {
        return false;
    }
    let style = doc.create_element("style");
    doc.set_attr(style, "id", STYLE_ID);
    doc.set_attr(style, UI_ATTR, "");
    let css = doc.create_text(MARKER_STYLES);
    doc.append_child(style, css);
    let parent = doc.head().unwrap_or_else(|| doc.body());
    doc.append_child(parent, style);
    true
}
