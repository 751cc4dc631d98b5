use std::collections::HashSet;

use log::debug;
use serde_json::Value;

use crate::client::EnvironmentClient;
use crate::error::MigrationError;
use crate::model::item::Item;
use crate::util::page::next_page_token;

/// Fetch every item of a collection, following `next_page` cursors until exhausted.
///
/// Items come back in server order, concatenated across pages. Any failed page
/// aborts the whole fetch; no partial collection is returned.
pub async fn fetch_all<C>(client: &C, path: &str, collection_key: &str) -> Result<Vec<Item>, MigrationError>
where
    C: EnvironmentClient + ?Sized,
{
    let mut body = client.list(path, None).await?;
    let mut items = take_collection(&mut body, path, collection_key)?;
    let mut page = next_page_token(&body["next_page"]);
    let mut seen = HashSet::new();

    while let Some(token) = page {
        if !seen.insert(token.clone()) {
            return Err(MigrationError::transport(
                path,
                format!("next_page cursor returns to page {token}"),
            ));
        }
        debug!("{} {path}: fetching page {token}", client.name());
        let mut body = client.list(path, Some(&token)).await?;
        items.extend(take_collection(&mut body, path, collection_key)?);
        page = next_page_token(&body["next_page"]);
    }

    debug!("{} {path}: {} items", client.name(), items.len());
    Ok(items)
}

fn take_collection(body: &mut Value, path: &str, key: &str) -> Result<Vec<Item>, MigrationError> {
    let Some(Value::Array(entries)) = body.get_mut(key).map(Value::take) else {
        return Err(MigrationError::transport(
            path,
            format!("response has no '{key}' collection"),
        ));
    };

    entries
        .into_iter()
        .map(|entry| match entry {
            Value::Object(item) => Ok(item),
            other => Err(MigrationError::transport(
                path,
                format!("unexpected '{key}' entry: {other}"),
            )),
        })
        .collect()
}
