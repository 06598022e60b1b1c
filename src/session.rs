//! One page's highlight session: the document, its bucket and the capture
//! flow, driven by user events and extension commands.

use std::time::Duration;

use crate::anchor::{next_sequence_number, Anchor};
use crate::config::EngineConfig;
use crate::dom::{Document, NodeId, Range};
use crate::engine::renderer::{
    delete_target, hide_tooltip, inject_styles, show_tooltip, update_marker_comment,
};
use crate::engine::{
    clear_markers, locate, reconcile, unrender, CaptureController, CaptureState, ReconcileReport,
    HINT_ID, TOAST_ID, UI_ATTR,
};
use crate::error::Result;
use crate::page::normalize_page_url;
use crate::protocol::{Command, Response};
use crate::store::restore_code::{export_restore_code, import_restore_code};
use crate::store::BucketStore;

const HINT_TEXT: &str = "Select text to highlight and add a comment.";
const DEFAULT_TOAST_TEXT: &str = "Done.";
const NOTICE_STYLE: &str = "position:fixed;bottom:80px;right:20px;z-index:2147483646;\
padding:10px 14px;background:#D643E3;color:white;font-size:13px;border-radius:8px;\
box-shadow:0 4px 12px rgba(0,0,0,0.2);font-family:sans-serif;";

pub struct PageSession {
    doc: Document,
    page_key: String,
    buckets: BucketStore,
    capture: CaptureController,
    settings: EngineConfig,
}

impl PageSession {
    pub fn new(doc: Document, page_url: &str, buckets: BucketStore, settings: EngineConfig) -> Self {
        Self {
            doc,
            page_key: normalize_page_url(page_url),
            capture: CaptureController::new(settings.max_anchor_len),
            buckets,
            settings,
        }
    }

    pub fn page_key(&self) -> &str {
        &self.page_key
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn capture_state(&self) -> &CaptureState {
        self.capture.state()
    }

    /// First load: give the page time to settle, add the marker styles and
    /// render what is stored.
    pub async fn ready(&mut self) -> Result<ReconcileReport> {
        if self.settings.settle_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.settings.settle_delay_ms)).await;
        }
        inject_styles(&mut self.doc);
        self.reconcile().await
    }

    /// Render stored anchors that have no marker yet.
    pub async fn reconcile(&mut self) -> Result<ReconcileReport> {
        let root = self.doc.body();
        reconcile(&mut self.doc, root, &self.buckets, &self.page_key).await
    }

    /// Drop every marker and render the bucket from scratch.
    pub async fn reload(&mut self) -> Result<ReconcileReport> {
        hide_tooltip(&mut self.doc);
        let cleared = clear_markers(&mut self.doc);
        tracing::debug!("Cleared {} marker(s) on {}", cleared, self.page_key);
        self.reconcile().await
    }

    /// A selection change on the page.
    pub fn select(&mut self, range: Option<Range>) {
        self.capture.on_selection(&mut self.doc, range.as_ref());
    }

    /// Select the first unmarked occurrence of `text`, as a user would with
    /// the mouse. Returns `false` when the text is not on the page.
    pub fn select_text(&mut self, text: &str) -> bool {
        let root = self.doc.body();
        match locate(&self.doc, root, text) {
            Some(range) => {
                self.select(Some(range));
                true
            }
            None => false,
        }
    }

    /// The toolbar button: open the comment panel numbered after the
    /// page's highest stored number.
    pub async fn begin_capture(&mut self) -> Result<u64> {
        let bucket = self.buckets.load(&self.page_key).await?;
        let sequence_number = next_sequence_number(&bucket.anchors);
        self.capture.activate(&mut self.doc, sequence_number)?;
        Ok(sequence_number)
    }

    /// Save from the comment panel. The anchor is stored even when its
    /// range could not be wrapped; a later reload may still place it.
    pub async fn confirm_capture(&mut self, comment: &str) -> Result<Anchor> {
        let captured = self.capture.confirm(&mut self.doc, comment)?;
        self.buckets.append(&self.page_key, &captured.anchor).await?;
        tracing::info!(
            "Saved highlight {} on {}",
            captured.anchor.id,
            self.page_key
        );
        Ok(captured.anchor)
    }

    pub fn cancel_capture(&mut self) {
        self.capture.cancel(&mut self.doc);
    }

    /// A mousedown on `target`. Dismisses capture UI when outside it, and
    /// deletes the highlight when `target` is a marker's delete control.
    /// Returns the deleted anchor id.
    pub async fn click(&mut self, target: NodeId) -> Result<Option<String>> {
        self.capture.on_click(&mut self.doc, Some(target));

        let Some(id) = delete_target(&self.doc, target) else {
            return Ok(None);
        };
        self.delete_anchor(&id).await?;
        Ok(Some(id))
    }

    /// Remove a highlight from the page and from storage. Either half may
    /// find nothing to do; returns whether anything was removed.
    pub async fn delete_anchor(&mut self, id: &str) -> Result<bool> {
        hide_tooltip(&mut self.doc);
        let unrendered = unrender(&mut self.doc, id);
        let removed = self.buckets.remove(&self.page_key, id).await?;
        if !unrendered && !removed {
            tracing::debug!("Nothing to delete for highlight {}", id);
        }
        Ok(unrendered || removed)
    }

    pub async fn update_comment(&mut self, id: &str, comment: &str) -> Result<Anchor> {
        let comment = comment.trim();
        let anchor = self
            .buckets
            .update_comment(&self.page_key, id, comment)
            .await?;
        update_marker_comment(&mut self.doc, id, comment);
        Ok(anchor)
    }

    pub fn hover_marker(&mut self, id: &str) -> bool {
        show_tooltip(&mut self.doc, id).is_some()
    }

    pub fn leave_marker(&mut self) {
        hide_tooltip(&mut self.doc);
    }

    pub async fn list(&self) -> Result<Vec<Anchor>> {
        Ok(self.buckets.load(&self.page_key).await?.anchors)
    }

    pub async fn export_code(&self) -> Result<String> {
        export_restore_code(&self.buckets, &self.page_key).await
    }

    /// Replace this page's bucket from a restore code and re-render.
    pub async fn import_code(&mut self, code: &str) -> Result<ReconcileReport> {
        import_restore_code(&self.buckets, &self.page_key, code).await?;
        self.reload().await
    }

    pub fn show_hint(&mut self) -> NodeId {
        self.show_notice(HINT_ID, HINT_TEXT)
    }

    pub fn show_toast(&mut self, text: Option<&str>) -> NodeId {
        let text = text.filter(|t| !t.is_empty()).unwrap_or(DEFAULT_TOAST_TEXT);
        self.show_notice(TOAST_ID, text)
    }

    fn show_notice(&mut self, id: &str, text: &str) -> NodeId {
        if let Some(existing) = self.doc.get_element_by_id(id) {
            self.doc.remove(existing);
        }
        let notice = self.doc.create_element("div");
        self.doc.set_attr(notice, "id", id);
        self.doc.set_attr(notice, UI_ATTR, "");
        self.doc.set_attr(notice, "style", NOTICE_STYLE);
        let label = self.doc.create_text(text);
        self.doc.append_child(notice, label);
        let body = self.doc.body();
        self.doc.append_child(body, notice);
        notice
    }

    /// Answer one extension command. Failures become error responses.
    pub async fn handle(&mut self, command: Command) -> Response {
        tracing::debug!("Handling {:?}", command);
        let result = match command {
            Command::Reload => self.reload().await.map(|r| Response::ok().with_report(r)),
            Command::ShowHint => {
                self.show_hint();
                Ok(Response::ok())
            }
            Command::ShowToast { text } => {
                self.show_toast(text.as_deref());
                Ok(Response::ok())
            }
            Command::List => self.list().await.map(|a| Response::ok().with_anchors(a)),
            Command::Delete { id } => self.delete_anchor(&id).await.map(|removed| {
                if removed {
                    Response::ok()
                } else {
                    Response::error("anchor_not_found", format!("No highlight with id {}", id))
                }
            }),
            Command::UpdateComment { id, comment } => self
                .update_comment(&id, &comment)
                .await
                .map(|a| Response::ok().with_anchor(a)),
            Command::ExportCode => self.export_code().await.map(|c| Response::ok().with_code(c)),
            Command::ImportCode { code } => self
                .import_code(&code)
                .await
                .map(|r| Response::ok().with_report(r)),
        };

        result.unwrap_or_else(|e| {
            tracing::warn!("Command failed on {}: {}", self.page_key, e);
            e.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_html, Boundary};
    use crate::engine::{find_marker, PANEL_ID, TOOLTIP_ID};
    use crate::error::ReformaError;

    const URL: &str = "https://example.com/article?id=7#section";

    fn settings() -> EngineConfig {
        EngineConfig {
            settle_delay_ms: 0,
            max_anchor_len: 10_000,
        }
    }

    fn session(html: &str, buckets: &BucketStore) -> PageSession {
        PageSession::new(parse_html(html).unwrap(), URL, buckets.clone(), settings())
    }

    async fn highlight(session: &mut PageSession, text: &str, comment: &str) -> Anchor {
        assert!(session.select_text(text));
        session.begin_capture().await.unwrap();
        session.confirm_capture(comment).await.unwrap()
    }

    #[test]
    fn page_key_is_normalized() {
        let buckets = BucketStore::in_memory();
        let session = session("<p>x</p>", &buckets);
        assert_eq!(session.page_key(), "https://example.com/article?id=7");
    }

    #[tokio::test]
    async fn capture_persists_and_renders() {
        let buckets = BucketStore::in_memory();
        let mut page = session("<body><p>The quick brown fox</p></body>", &buckets);

        let first = highlight(&mut page, "quick", "fast").await;
        let second = highlight(&mut page, "fox", "").await;

        assert_eq!(first.sequence_number, Some(1));
        assert_eq!(second.sequence_number, Some(2));
        assert!(find_marker(page.document(), &first.id).is_some());
        assert_eq!(page.list().await.unwrap(), vec![first, second]);
    }

    #[tokio::test]
    async fn reopened_page_restores_markers() {
        let buckets = BucketStore::in_memory();
        let html = "<body><p>The quick brown fox</p></body>";
        let mut page = session(html, &buckets);
        let anchor = highlight(&mut page, "brown", "colour").await;

        let mut reopened = session(html, &buckets);
        let report = reopened.ready().await.unwrap();

        assert_eq!(report.rendered, 1);
        assert!(find_marker(reopened.document(), &anchor.id).is_some());
    }

    #[tokio::test]
    async fn delete_control_click_removes_marker_and_record() {
        let buckets = BucketStore::in_memory();
        let mut page = session("<body><p>alpha beta</p></body>", &buckets);
        let anchor = highlight(&mut page, "beta", "").await;

        let marker = find_marker(page.document(), &anchor.id).unwrap();
        let control = *page.document().children(marker).last().unwrap();
        let deleted = page.click(control).await.unwrap();

        assert_eq!(deleted, Some(anchor.id.clone()));
        assert!(find_marker(page.document(), &anchor.id).is_none());
        assert!(page.list().await.unwrap().is_empty());
        assert_eq!(page.document().text_content(page.document().root()), "alpha beta");
    }

    #[tokio::test]
    async fn selection_spanning_a_highlight_is_not_captured() {
        let buckets = BucketStore::in_memory();
        let mut page = session("<body><p>alpha beta gamma</p></body>", &buckets);
        let inner = highlight(&mut page, "beta", "").await;

        let doc = page.document();
        let p = doc.elements_by_tag("p")[0];
        let first = doc.children(p)[0];
        let last = *doc.children(p).last().unwrap();
        let spanning = Range::new(Boundary::new(first, 0), Boundary::new(last, doc.node_len(last)));
        page.select(Some(spanning));

        assert!(matches!(
            page.begin_capture().await,
            Err(ReformaError::InvalidSelection(_))
        ));
        assert_eq!(page.list().await.unwrap(), vec![inner.clone()]);

        assert!(page.delete_anchor(&inner.id).await.unwrap());
        let root = page.document().root();
        assert_eq!(page.document().text_content(root), "alpha beta gamma");
    }

    #[tokio::test]
    async fn delete_of_unrendered_anchor_still_removes_record() {
        let buckets = BucketStore::in_memory();
        let mut page = session("<body><p>alpha beta</p></body>", &buckets);
        let anchor = Anchor::new("not on this page", "", 1);
        buckets.append(page.page_key(), &anchor).await.unwrap();

        assert!(page.delete_anchor(&anchor.id).await.unwrap());
        assert!(!page.delete_anchor(&anchor.id).await.unwrap());
    }

    #[tokio::test]
    async fn click_outside_closes_panel() {
        let buckets = BucketStore::in_memory();
        let mut page = session("<body><p>alpha beta</p></body>", &buckets);
        page.select_text("alpha");
        page.begin_capture().await.unwrap();
        assert!(page.document().get_element_by_id(PANEL_ID).is_some());

        let p = page.document().elements_by_tag("p")[0];
        assert_eq!(page.click(p).await.unwrap(), None);
        assert_eq!(page.capture_state(), &CaptureState::Idle);
        assert!(page.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn hover_shows_single_tooltip() {
        let buckets = BucketStore::in_memory();
        let mut page = session("<body><p>alpha beta</p></body>", &buckets);
        let a = highlight(&mut page, "alpha", "first").await;
        let b = highlight(&mut page, "beta", "second").await;

        assert!(page.hover_marker(&a.id));
        assert!(page.hover_marker(&b.id));
        let doc = page.document();
        let tooltip = doc.get_element_by_id(TOOLTIP_ID).unwrap();
        assert_eq!(doc.text_content(tooltip), "Comment #2: second");
        assert_eq!(doc.query_by_attr("id", TOOLTIP_ID).len(), 1);

        page.leave_marker();
        assert!(page.document().get_element_by_id(TOOLTIP_ID).is_none());
    }

    #[tokio::test]
    async fn update_comment_refreshes_marker() {
        let buckets = BucketStore::in_memory();
        let mut page = session("<body><p>alpha beta</p></body>", &buckets);
        let anchor = highlight(&mut page, "alpha", "old").await;

        let updated = page.update_comment(&anchor.id, " new ").await.unwrap();
        assert_eq!(updated.comment, "new");
        assert_eq!(updated.text, "alpha");

        let marker = find_marker(page.document(), &anchor.id).unwrap();
        assert_eq!(
            page.document().attr(marker, crate::engine::ATTR_COMMENT),
            Some("new")
        );
    }

    #[tokio::test]
    async fn toast_replaces_previous_notice() {
        let buckets = BucketStore::in_memory();
        let mut page = session("<body><p>x</p></body>", &buckets);

        page.show_toast(Some("Saved"));
        let toast = page.show_toast(None);

        let doc = page.document();
        assert_eq!(doc.query_by_attr("id", TOAST_ID).len(), 1);
        assert_eq!(doc.text_content(toast), DEFAULT_TOAST_TEXT);
    }

    #[tokio::test]
    async fn handle_answers_commands() {
        let buckets = BucketStore::in_memory();
        let mut page = session("<body><p>alpha beta</p></body>", &buckets);
        let anchor = highlight(&mut page, "alpha", "").await;

        let listed = page.handle(Command::List).await;
        assert!(listed.ok);
        assert_eq!(listed.anchors.unwrap().len(), 1);

        let exported = page.handle(Command::ExportCode).await;
        let code = exported.code.unwrap();

        let deleted = page
            .handle(Command::Delete {
                id: anchor.id.clone(),
            })
            .await;
        assert!(deleted.ok);

        let imported = page.handle(Command::ImportCode { code }).await;
        assert!(imported.ok);
        assert_eq!(imported.report.unwrap().rendered, 1);
        assert!(find_marker(page.document(), &anchor.id).is_some());

        let bad = page
            .handle(Command::ImportCode {
                code: "garbage".to_string(),
            })
            .await;
        assert!(!bad.ok);
        assert_eq!(bad.error.as_deref(), Some("invalid_restore_code"));
    }

    #[tokio::test]
    async fn reload_is_stable() {
        let buckets = BucketStore::in_memory();
        let mut page = session("<body><p>alpha beta gamma</p></body>", &buckets);
        highlight(&mut page, "beta", "").await;
        let html = page.document().to_html();

        let report = page.reload().await.unwrap();
        assert_eq!(report.rendered, 1);
        assert_eq!(page.document().to_html(), html);
    }
}
