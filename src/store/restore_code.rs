//! Restore codes: a page's bucket packed into a copy/paste token.
//!
//! Format: `rfm1.` followed by unpadded URL-safe base64 of
//! `{"url": "<page key>", "anchors": [...]}`.

use std::collections::HashSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::BucketStore;
use crate::anchor::Anchor;
use crate::error::{ReformaError, Result};
use crate::page::normalize_page_url;

const CODE_PREFIX: &str = "rfm1.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestorePayload {
    pub url: String,
    pub anchors: Vec<Anchor>,
}

pub fn encode_restore_code(page_key: &str, anchors: &[Anchor]) -> Result<String> {
    let payload = RestorePayload {
        url: page_key.to_string(),
        anchors: anchors.to_vec(),
    };
    let json = serde_json::to_vec(&payload)?;
    Ok(format!("{}{}", CODE_PREFIX, URL_SAFE_NO_PAD.encode(json)))
}

/// Decode and validate a whole restore code. Every record must be a usable
/// anchor and ids must be unique; nothing partial is ever returned.
pub fn decode_restore_code(code: &str) -> Result<RestorePayload> {
    let code: String = code.split_whitespace().collect();
    let body = code
        .strip_prefix(CODE_PREFIX)
        .ok_or_else(|| ReformaError::InvalidRestoreCode("unknown code format".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(body)
        .map_err(|e| ReformaError::InvalidRestoreCode(format!("bad encoding: {}", e)))?;
    let payload: RestorePayload = serde_json::from_slice(&bytes)
        .map_err(|e| ReformaError::InvalidRestoreCode(format!("bad payload: {}", e)))?;

    if payload.url.trim().is_empty() {
        return Err(ReformaError::InvalidRestoreCode("missing page url".to_string()));
    }
    let mut seen = HashSet::new();
    for anchor in &payload.anchors {
        if anchor.id.trim().is_empty() || anchor.text.is_empty() {
            return Err(ReformaError::InvalidRestoreCode(
                "highlight with empty id or text".to_string(),
            ));
        }
        if !seen.insert(anchor.id.as_str()) {
            return Err(ReformaError::InvalidRestoreCode(format!(
                "duplicate highlight id {}",
                anchor.id
            )));
        }
    }
    Ok(payload)
}

/// Export the bucket for `page_url` as a restore code.
pub async fn export_restore_code(buckets: &BucketStore, page_url: &str) -> Result<String> {
    let page_key = normalize_page_url(page_url);
    let bucket = buckets.load(&page_key).await?;
    encode_restore_code(&page_key, &bucket.anchors)
}

/// Replace the bucket for `page_url` with the code's anchors.
///
/// Storage is untouched unless the code is valid and was exported from the
/// same normalized URL.
pub async fn import_restore_code(
    buckets: &BucketStore,
    page_url: &str,
    code: &str,
) -> Result<Vec<Anchor>> {
    let page_key = normalize_page_url(page_url);
    let payload = decode_restore_code(code)?;
    let code_key = normalize_page_url(&payload.url);
    if code_key != page_key {
        return Err(ReformaError::RestoreCodeUrlMismatch {
            expected: code_key,
            actual: page_key,
        });
    }

    buckets.save(&page_key, &payload.anchors).await?;
    tracing::info!(
        "Restored {} highlight(s) for {}",
        payload.anchors.len(),
        page_key
    );
    Ok(payload.anchors)
}
