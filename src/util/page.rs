use reqwest::Url;
use serde_json::Value;

/// Extract the page token from a `next_page` cursor.
///
/// Cursors are full URLs such as `https://acme.zendesk.com/api/v2/groups.json?page=2`.
/// The token is the `page` query parameter, falling back to the last query value.
/// Returns `None` when the cursor is absent (`null`) or carries no query.
pub fn next_page_token(cursor: &Value) -> Option<String> {
    let raw = cursor.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }

    let url = Url::parse(raw).ok()?;
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    pairs
        .iter()
        .find(|(key, _)| key == "page")
        .or_else(|| pairs.last())
        .map(|(_, value)| value.clone())
        .filter(|value| !value.is_empty())
}
