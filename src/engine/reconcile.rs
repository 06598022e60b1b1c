//! Re-deriving markers from stored anchors.

use serde::{Deserialize, Serialize};

use crate::anchor::{Anchor, DecodedBucket};
use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::store::BucketStore;

use super::renderer::{find_marker, render, unwrap_marker};
use super::{locate, HIGHLIGHT_CLASS};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub rendered: usize,
    pub already_rendered: usize,
    pub not_found: usize,
    pub failed: usize,
    pub malformed: usize,
}

/// One pass over `anchors` in stored order: skip anchors that already have a
/// marker, locate the rest and render what is found. A miss or a failed wrap
/// only skips that anchor.
pub fn reconcile_anchors(doc: &mut Document, root: NodeId, anchors: &[Anchor]) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for anchor in anchors {
        if find_marker(doc, &anchor.id).is_some() {
            report.already_rendered += 1;
            continue;
        }

        let Some(range) = locate(doc, root, &anchor.text) else {
            tracing::debug!("Highlight {} not found on page", anchor.id);
            report.not_found += 1;
            continue;
        };

        match render(doc, &range, anchor) {
            Ok(_) => report.rendered += 1,
            Err(e) => {
                tracing::debug!("Highlight {} could not be rendered: {}", anchor.id, e);
                report.failed += 1;
            }
        }
    }

    report
}

/// Fetch the page's bucket and reconcile it against the document.
pub async fn reconcile(
    doc: &mut Document,
    root: NodeId,
    buckets: &BucketStore,
    page_key: &str,
) -> Result<ReconcileReport> {
    let DecodedBucket { anchors, malformed } = buckets.load(page_key).await?;
    let mut report = reconcile_anchors(doc, root, &anchors);
    report.malformed = malformed;

    tracing::info!(
        "Reconciled {}: {} rendered, {} already present, {} not found, {} failed, {} malformed",
        page_key,
        report.rendered,
        report.already_rendered,
        report.not_found,
        report.failed,
        report.malformed
    );
    Ok(report)
}

/// Unwrap every rendered marker. Returns how many were removed.
pub fn clear_markers(doc: &mut Document) -> usize {
    let markers = doc.query_by_class(HIGHLIGHT_CLASS);
    // Innermost first, so an outer marker's text still includes inner text.
    for marker in markers.iter().rev() {
        unwrap_marker(doc, *marker);
    }
    markers.len()
}
