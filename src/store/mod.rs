//! Highlight persistence.
//!
//! [`AnchorStore`] is the host storage seam: whole-value `get`/`set` by key,
//! no merge semantics. [`BucketStore`] layers the page-bucket operations on
//! top and serializes its own read-modify-write cycles through one lock, so
//! writers sharing a `BucketStore` never lose each other's updates. Writers
//! in other processes (another tab, another CLI run) still race with
//! last-write-wins on the whole bucket.

mod file;
mod memory;
pub mod restore_code;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::anchor::{decode_bucket, Anchor, DecodedBucket};
use crate::error::{ReformaError, Result};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Key under which the extension keeps the page → bucket map.
pub const STORAGE_KEY: &str = "reforma_highlights";

#[async_trait]
pub trait AnchorStore: Send + Sync {
    /// Read the whole value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the whole value stored under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    async fn keys(&self) -> Result<Vec<String>>;
}

/// Page-bucket operations over an [`AnchorStore`].
#[derive(Clone)]
pub struct BucketStore {
    store: Arc<dyn AnchorStore>,
    write_lock: Arc<Mutex<()>>,
}

impl BucketStore {
    pub fn new(store: Arc<dyn AnchorStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    async fn raw_records(&self, page_key: &str) -> Result<Vec<Value>> {
        match self.store.get(page_key).await? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(records)) => Ok(records),
            Some(other) => {
                tracing::warn!(
                    "Bucket for {} is not a list ({}), treating it as empty",
                    page_key,
                    type_name(&other)
                );
                Ok(Vec::new())
            }
        }
    }

    /// All anchors stored for a page, in stored order.
    pub async fn load(&self, page_key: &str) -> Result<DecodedBucket> {
        let value = self.store.get(page_key).await?.unwrap_or(Value::Null);
        Ok(decode_bucket(&value))
    }

    /// Replace a page's bucket.
    pub async fn save(&self, page_key: &str, anchors: &[Anchor]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store
            .set(page_key, serde_json::to_value(anchors)?)
            .await
    }

    /// Append one anchor to a page's bucket.
    pub async fn append(&self, page_key: &str, anchor: &Anchor) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.raw_records(page_key).await?;
        records.push(serde_json::to_value(anchor)?);
        self.store.set(page_key, Value::Array(records)).await
    }

    /// Remove the anchor with `id`. Returns whether a record was removed.
    pub async fn remove(&self, page_key: &str, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let records = self.raw_records(page_key).await?;
        let before = records.len();
        let kept: Vec<Value> = records
            .into_iter()
            .filter(|record| record.get("id").and_then(Value::as_str) != Some(id))
            .collect();
        let removed = kept.len() != before;
        if removed {
            self.store.set(page_key, Value::Array(kept)).await?;
        }
        Ok(removed)
    }

    /// Change an anchor's comment. The captured text is never touched.
    pub async fn update_comment(&self, page_key: &str, id: &str, comment: &str) -> Result<Anchor> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.raw_records(page_key).await?;
        let record = records
            .iter_mut()
            .find(|record| record.get("id").and_then(Value::as_str) == Some(id))
            .ok_or_else(|| ReformaError::AnchorNotFound(id.to_string()))?;

        let Some(fields) = record.as_object_mut() else {
            return Err(ReformaError::AnchorNotFound(id.to_string()));
        };
        fields.insert("comment".to_string(), Value::String(comment.to_string()));
        let anchor: Anchor = serde_json::from_value(record.clone())?;

        self.store.set(page_key, Value::Array(records)).await?;
        Ok(anchor)
    }

    /// Every page key with its stored anchor count.
    pub async fn pages(&self) -> Result<Vec<(String, usize)>> {
        let mut pages = Vec::new();
        for key in self.store.keys().await? {
            let count = self.load(&key).await?.anchors.len();
            if count > 0 {
                pages.push((key, count));
            }
        }
        pages.sort();
        Ok(pages)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAGE: &str = "https://example.com/a?x=1";

    #[tokio::test]
    async fn append_then_load_keeps_order() {
        let buckets = BucketStore::in_memory();
        let first = Anchor::new("one", "", 1);
        let second = Anchor::new("two", "note", 2);

        buckets.append(PAGE, &first).await.unwrap();
        buckets.append(PAGE, &second).await.unwrap();

        let bucket = buckets.load(PAGE).await.unwrap();
        assert_eq!(bucket.anchors, vec![first, second]);
    }

    #[tokio::test]
    async fn remove_leaves_empty_list() {
        let buckets = BucketStore::in_memory();
        let anchor = Anchor::new("one", "", 1);
        buckets.append(PAGE, &anchor).await.unwrap();

        assert!(buckets.remove(PAGE, &anchor.id).await.unwrap());
        assert!(!buckets.remove(PAGE, &anchor.id).await.unwrap());
        assert_eq!(buckets.store.get(PAGE).await.unwrap(), Some(json!([])));
    }

    #[tokio::test]
    async fn remove_of_unknown_id_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let buckets = BucketStore::new(store.clone());

        assert!(!buckets.remove(PAGE, "reforma-0-missing").await.unwrap());
        assert_eq!(store.get(PAGE).await.unwrap(), None);
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_keeps_malformed_records() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(PAGE, json!([{"id": "a", "text": "x"}, {"broken": true}]))
            .await
            .unwrap();
        let buckets = BucketStore::new(store.clone());

        buckets.remove(PAGE, "a").await.unwrap();
        assert_eq!(store.get(PAGE).await.unwrap(), Some(json!([{"broken": true}])));
    }

    #[tokio::test]
    async fn update_comment_keeps_text() {
        let buckets = BucketStore::in_memory();
        let anchor = Anchor::new("captured", "old", 1);
        buckets.append(PAGE, &anchor).await.unwrap();

        let updated = buckets.update_comment(PAGE, &anchor.id, "new").await.unwrap();
        assert_eq!(updated.text, "captured");
        assert_eq!(updated.comment, "new");
        assert_eq!(buckets.load(PAGE).await.unwrap().anchors[0].comment, "new");
    }

    #[tokio::test]
    async fn update_comment_unknown_id_is_an_error() {
        let buckets = BucketStore::in_memory();
        let result = buckets.update_comment(PAGE, "missing", "x").await;
        assert!(matches!(result, Err(ReformaError::AnchorNotFound(id)) if id == "missing"));
    }

    #[tokio::test]
    async fn concurrent_appends_through_one_handle_are_not_lost() {
        let buckets = BucketStore::in_memory();
        let mut tasks = Vec::new();
        for n in 1..=16u64 {
            let buckets = buckets.clone();
            tasks.push(tokio::spawn(async move {
                buckets
                    .append(PAGE, &Anchor::new(format!("text {}", n), "", n))
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(buckets.load(PAGE).await.unwrap().anchors.len(), 16);
    }

    #[tokio::test]
    async fn pages_lists_non_empty_buckets() {
        let buckets = BucketStore::in_memory();
        buckets
            .append("https://b.example/", &Anchor::new("x", "", 1))
            .await
            .unwrap();
        buckets.save("https://a.example/", &[]).await.unwrap();

        assert_eq!(
            buckets.pages().await.unwrap(),
            vec![("https://b.example/".to_string(), 1)]
        );
    }
}
