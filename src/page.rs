//! Page keys: the storage partition for highlights.

use url::Url;

/// Normalize a page URL to `scheme://host[:port]/path[?query]`.
///
/// The fragment is dropped so in-page navigation keeps using the same
/// bucket. Input that does not parse as a URL is returned trimmed.
pub fn normalize_page_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };

    let origin = url.origin();
    if !origin.is_tuple() {
        url.set_fragment(None);
        return url.to_string();
    }

    let mut key = origin.ascii_serialization();
    key.push_str(url.path());
    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        key.push('?');
        key.push_str(query);
    }
    key
}
