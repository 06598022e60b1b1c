//! Text-anchor engine: locate stored text in a live document, wrap it in
//! markers, and keep markers in step with the stored buckets.

pub mod capture;
pub mod locator;
pub mod reconcile;
pub mod renderer;

pub use capture::{CaptureController, CaptureState, Captured};
pub use locator::locate;
pub use reconcile::{clear_markers, reconcile, reconcile_anchors, ReconcileReport};
pub use renderer::{find_marker, render, unrender, RenderError, RenderedMarker, WrapStrategy};

/// Class carried by every marker element.
pub const HIGHLIGHT_CLASS: &str = "reforma-highlight";
/// Marker attribute holding the anchor id.
pub const ATTR_ANCHOR_ID: &str = "data-reforma-comment-id";
pub const ATTR_COMMENT: &str = "data-reforma-comment";
pub const ATTR_SEQUENCE: &str = "data-reforma-comment-number";
/// Class of the delete control inside a marker.
pub const DELETE_CLASS: &str = "reforma-highlight-delete";
/// Attribute marking engine-owned UI (toolbar, panel, tooltip, toasts).
/// Text inside such elements is never matched.
pub const UI_ATTR: &str = "data-reforma-ui";

pub const TOOLBAR_ID: &str = "reforma-highlight-toolbar";
pub const PANEL_ID: &str = "reforma-highlight-panel";
pub const TOOLTIP_ID: &str = "reforma-highlight-tooltip";
pub const HINT_ID: &str = "reforma-highlight-hint";
pub const TOAST_ID: &str = "reforma-highlight-toast";
pub const STYLE_ID: &str = "reforma-highlight-styles";
