//! Selection → highlight capture flow.
//!
//! ```text
//! Idle --selection--> Selecting --activate--> Composing --confirm/cancel--> Idle
//!   ^                     |                       |
//!   +---- outside click --+-----------------------+
//! ```
//!
//! The range is captured when the selection is offered and copied again on
//! activation; confirm never looks at the live selection, which clicking the
//! toolbar may already have cleared.
//!
//! Highlights never nest: a selection touching text inside a rendered marker
//! (its delete control included) is not offered for capture.

use crate::anchor::Anchor;
use crate::dom::{Document, NodeId, Range};
use crate::error::{ReformaError, Result};

use super::renderer::{render, RenderedMarker};
use super::{HIGHLIGHT_CLASS, PANEL_ID, TOOLBAR_ID, UI_ATTR};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    /// A non-collapsed selection is on screen with the toolbar next to it.
    Selecting { range: Range },
    /// The comment panel is open for a captured range.
    Composing {
        range: Range,
        text: String,
        sequence_number: u64,
    },
}

/// Result of confirming a capture: the anchor to persist and, when the
/// captured range could be wrapped, its marker.
#[derive(Debug, Clone)]
pub struct Captured {
    pub anchor: Anchor,
    pub marker: Option<RenderedMarker>,
}

#[derive(Debug)]
pub struct CaptureController {
    state: CaptureState,
    max_anchor_len: usize,
}

impl CaptureController {
    pub fn new(max_anchor_len: usize) -> Self {
        Self {
            state: CaptureState::Idle,
            max_anchor_len,
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    /// A selection event. Collapsed or empty selections change nothing:
    /// only an outside click dismisses the toolbar. While the panel is open,
    /// new selections are ignored.
    pub fn on_selection(&mut self, doc: &mut Document, selection: Option<&Range>) {
        if matches!(self.state, CaptureState::Composing { .. }) {
            return;
        }
        let Some(range) = selection.filter(|r| !r.collapsed()) else {
            return;
        };
        if doc.range_to_string(range).is_empty() {
            return;
        }
        if overlaps_marker(doc, range) {
            tracing::debug!("Selection overlaps an existing highlight, not offering capture");
            self.reset(doc);
            return;
        }

        hide_ui(doc);
        show_toolbar(doc);
        self.state = CaptureState::Selecting { range: *range };
    }

    /// The toolbar button was pressed: open the comment panel for the
    /// captured range. `sequence_number` is the number the new anchor gets.
    pub fn activate(&mut self, doc: &mut Document, sequence_number: u64) -> Result<()> {
        let CaptureState::Selecting { range } = &self.state else {
            return Err(ReformaError::InvalidSelection(
                "no selection to highlight".to_string(),
            ));
        };
        let range = *range;
        if overlaps_marker(doc, &range) {
            self.reset(doc);
            return Err(ReformaError::InvalidSelection(
                "selection overlaps an existing highlight".to_string(),
            ));
        }

        let text = doc.range_to_string(&range);
        let too_long = text.chars().count() > self.max_anchor_len;
        if text.is_empty() || too_long {
            self.reset(doc);
            return Err(ReformaError::InvalidSelection(if too_long {
                format!("selection is longer than {} characters", self.max_anchor_len)
            } else {
                "selection no longer covers any text".to_string()
            }));
        }

        hide_ui(doc);
        show_panel(doc, sequence_number);
        self.state = CaptureState::Composing {
            range,
            text,
            sequence_number,
        };
        Ok(())
    }

    /// Save from the panel: build the anchor and render it right away with
    /// the captured range.
    pub fn confirm(&mut self, doc: &mut Document, comment: &str) -> Result<Captured> {
        let CaptureState::Composing {
            range,
            text,
            sequence_number,
        } = std::mem::replace(&mut self.state, CaptureState::Idle)
        else {
            return Err(ReformaError::InvalidSelection(
                "no highlight is being composed".to_string(),
            ));
        };
        hide_ui(doc);

        let anchor = Anchor::new(text, comment.trim(), sequence_number);
        let marker = match render(doc, &range, &anchor) {
            Ok(marker) => Some(marker),
            Err(e) => {
                tracing::warn!("New highlight {} could not be rendered: {}", anchor.id, e);
                None
            }
        };
        Ok(Captured { anchor, marker })
    }

    pub fn cancel(&mut self, doc: &mut Document) {
        self.reset(doc);
    }

    /// A mousedown anywhere. Clicks inside the toolbar or panel keep the
    /// current state; anything else returns to idle without saving.
    pub fn on_click(&mut self, doc: &mut Document, target: Option<NodeId>) {
        let inside = target.is_some_and(|node| {
            doc.ancestors(node).into_iter().any(|n| {
                matches!(doc.attr(n, "id"), Some(id) if id == TOOLBAR_ID || id == PANEL_ID)
            })
        });
        if !inside {
            self.reset(doc);
        }
    }

    fn reset(&mut self, doc: &mut Document) {
        hide_ui(doc);
        self.state = CaptureState::Idle;
    }
}

fn overlaps_marker(doc: &Document, range: &Range) -> bool {
    doc.selected_text_spans(range)
        .iter()
        .any(|(node, _, _)| doc.closest_with_class(*node, HIGHLIGHT_CLASS).is_some())
}

fn ui_container(doc: &mut Document, id: &str) -> NodeId {
    let container = doc.create_element("div");
    doc.set_attr(container, "id", id);
    doc.set_attr(container, UI_ATTR, "");
    let body = doc.body();
    doc.append_child(body, container);
    container
}

fn append_text_element(doc: &mut Document, parent: NodeId, tag: &str, text: &str) -> NodeId {
    let el = doc.create_element(tag);
    let label = doc.create_text(text);
    doc.append_child(el, label);
    doc.append_child(parent, el);
    el
}

fn show_toolbar(doc: &mut Document) {
    let toolbar = ui_container(doc, TOOLBAR_ID);
    let button = append_text_element(doc, toolbar, "button", "Highlight & Comment");
    doc.set_attr(button, "type", "button");
}

fn show_panel(doc: &mut Document, sequence_number: u64) {
    let panel = ui_container(doc, PANEL_ID);
    append_text_element(doc, panel, "div", &format!("Comment #{}", sequence_number));
    let textarea = doc.create_element("textarea");
    doc.set_attr(textarea, "placeholder", "Add a comment (optional)");
    doc.set_attr(textarea, "rows", "2");
    doc.append_child(panel, textarea);
    let save = append_text_element(doc, panel, "button", "Save Comment");
    doc.set_attr(save, "class", "reforma-save-btn");
}

fn hide_ui(doc: &mut Document) {
    for id in [TOOLBAR_ID, PANEL_ID] {
        if let Some(node) = doc.get_element_by_id(id) {
            doc.remove(node);
        }
    }
}
