//! Persisted highlight records.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Prefix for every generated anchor id.
const ID_PREFIX: &str = "reforma-";

/// One highlighted piece of page text, optionally with a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    pub id: String,

    /// Exact page text captured when the highlight was created.
    pub text: String,

    /// Empty means highlight only.
    #[serde(default)]
    pub comment: String,

    #[serde(
        default,
        alias = "commentNumber",
        deserialize_with = "deserialize_sequence_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub sequence_number: Option<u64>,
}

impl Anchor {
    pub fn new(text: impl Into<String>, comment: impl Into<String>, sequence_number: u64) -> Self {
        Self {
            id: generate_anchor_id(),
            text: text.into(),
            comment: comment.into(),
            sequence_number: Some(sequence_number),
        }
    }

    /// Label shown in the marker's title and hover tooltip.
    pub fn display_text(&self) -> String {
        display_text(self.sequence_number, &self.comment)
    }
}

pub(crate) fn display_text(sequence_number: Option<u64>, comment: &str) -> String {
    match (sequence_number, comment.is_empty()) {
        (Some(n), true) => format!("Comment #{}", n),
        (Some(n), false) => format!("Comment #{}: {}", n, comment),
        (None, true) => "Highlight".to_string(),
        (None, false) => comment.to_string(),
    }
}

/// Older extension builds stored the number as `""` when absent and
/// sometimes as a string.
fn deserialize_sequence_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().filter(|n| *n > 0),
        Some(Value::String(s)) => s.trim().parse().ok().filter(|n| *n > 0),
        _ => None,
    })
}

/// Generate a new anchor id: `reforma-<unix millis>-<7 base36 chars>`.
pub fn generate_anchor_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..7)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}{}-{}", ID_PREFIX, millis, suffix)
}

/// `max(existing) + 1`; numbers of deleted anchors are never handed out again
/// while a higher one survives.
pub fn next_sequence_number(anchors: &[Anchor]) -> u64 {
    anchors
        .iter()
        .filter_map(|a| a.sequence_number)
        .max()
        .unwrap_or(0)
        + 1
}

/// A page bucket decoded record by record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedBucket {
    pub anchors: Vec<Anchor>,
    /// Records that were skipped because they were not valid anchors.
    pub malformed: usize,
}

/// Decode a stored bucket, skipping records that are not usable anchors
/// (non-objects, missing or empty `id`, missing or empty `text`).
pub fn decode_bucket(value: &Value) -> DecodedBucket {
    let Some(records) = value.as_array() else {
        return DecodedBucket {
            anchors: Vec::new(),
            malformed: usize::from(!value.is_null()),
        };
    };

    let mut bucket = DecodedBucket::default();
    for record in records {
        match serde_json::from_value::<Anchor>(record.clone()) {
            Ok(anchor) if !anchor.id.trim().is_empty() && !anchor.text.is_empty() => {
                bucket.anchors.push(anchor);
            }
            Ok(anchor) => {
                tracing::warn!("Skipping stored highlight with empty id or text: {:?}", anchor.id);
                bucket.malformed += 1;
            }
            Err(e) => {
                tracing::warn!("Skipping malformed stored highlight: {}", e);
                bucket.malformed += 1;
            }
        }
    }
    bucket
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generated_ids_have_prefix_and_suffix() {
        let id = generate_anchor_id();
        let parts: Vec<&str> = id.splitn(3, '-').collect();

        assert_eq!(parts[0], "reforma");
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 7);
        assert_ne!(generate_anchor_id(), generate_anchor_id());
    }

    #[test]
    fn next_sequence_number_skips_gaps() {
        let mut a = Anchor::new("a", "", 1);
        let b = Anchor::new("b", "", 4);
        assert_eq!(next_sequence_number(&[]), 1);
        assert_eq!(next_sequence_number(&[a.clone(), b]), 5);

        a.sequence_number = None;
        assert_eq!(next_sequence_number(&[a]), 1);
    }

    #[test]
    fn serializes_with_camel_case_field() {
        let mut anchor = Anchor::new("Hello", "note", 1);
        anchor.id = "reforma-1-abc".to_string();
        assert_eq!(
            serde_json::to_value(&anchor).unwrap(),
            json!({"id": "reforma-1-abc", "text": "Hello", "comment": "note", "sequenceNumber": 1})
        );
    }

    #[test]
    fn reads_legacy_comment_number() {
        let anchor: Anchor = serde_json::from_value(json!({
            "id": "x", "text": "t", "comment": "", "commentNumber": "3"
        }))
        .unwrap();
        assert_eq!(anchor.sequence_number, Some(3));

        let anchor: Anchor =
            serde_json::from_value(json!({"id": "x", "text": "t", "commentNumber": ""})).unwrap();
        assert_eq!(anchor.sequence_number, None);
        assert_eq!(anchor.comment, "");
    }

    #[test]
    fn decode_bucket_skips_malformed_records() {
        let bucket = decode_bucket(&json!([
            {"id": "a", "text": "first"},
            {"id": "b"},
            "garbage",
            {"id": "", "text": "no id"},
            {"id": "c", "text": "third", "comment": "ok", "sequenceNumber": 2}
        ]));

        assert_eq!(bucket.malformed, 3);
        let ids: Vec<&str> = bucket.anchors.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn decode_bucket_treats_non_array_as_malformed() {
        assert_eq!(decode_bucket(&json!({"id": "a"})).malformed, 1);
        assert_eq!(decode_bucket(&Value::Null), DecodedBucket::default());
    }

    #[test]
    fn display_text_variants() {
        assert_eq!(display_text(Some(3), "note"), "Comment #3: note");
        assert_eq!(display_text(Some(3), ""), "Comment #3");
        assert_eq!(display_text(None, "note"), "note");
        assert_eq!(display_text(None, ""), "Highlight");
    }
}
