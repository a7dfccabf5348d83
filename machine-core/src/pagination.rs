// ABOUTME: Drains cursor-paginated listing endpoints into one ordered collection
// ABOUTME: Used once per connection to seed the entity cache

use crate::error::FetchError;
use crate::traits::{Listing, SlackApi};
use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;

/// Page size requested from listing endpoints
pub const PAGE_LIMIT: u16 = 500;

/// Arguments for one listing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u16,
    pub cursor: Option<String>,
}

/// Extract the next cursor from a page. Absent, null and empty all mean "last page".
pub fn next_cursor(response: &Value) -> Option<String> {
    response
        .pointer("/response_metadata/next_cursor")
        .and_then(Value::as_str)
        .filter(|cursor| !cursor.is_empty())
        .map(str::to_string)
}

/// Call `fetch_page` until the listing reports no further cursor, collecting
/// the `items_field` array of every page in arrival order.
///
/// Any failed page aborts the whole fetch; nothing gathered so far is returned.
/// A cursor seen earlier in the same drain is a cycle and fails with `CursorLoop`.
pub async fn fetch_all<F, Fut>(items_field: &str, mut fetch_page: F) -> Result<Vec<Value>, FetchError>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = anyhow::Result<Value>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut seen = HashSet::new();
    let mut page = 0;

    loop {
        page += 1;
        let response = fetch_page(PageRequest {
            limit: PAGE_LIMIT,
            cursor: cursor.clone(),
        })
        .await
        .map_err(|source| FetchError::Request { page, source })?;

        let batch = response
            .get(items_field)
            .and_then(Value::as_array)
            .ok_or_else(|| FetchError::MalformedPage {
                page,
                field: items_field.to_string(),
            })?;
        items.extend(batch.iter().cloned());

        match next_cursor(&response) {
            None => break,
            Some(next) if !seen.insert(next.clone()) => {
                return Err(FetchError::CursorLoop { cursor: next });
            }
            Some(next) => cursor = Some(next),
        }
    }

    tracing::debug!(field = items_field, pages = page, items = items.len(), "Listing drained");
    Ok(items)
}

/// Drain one of the Web API listings through the remote capability
pub async fn fetch_listing(api: &dyn SlackApi, listing: Listing) -> Result<Vec<Value>, FetchError> {
    fetch_all(listing.items_field(), move |page| api.list_page(listing, page)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_next_cursor_variants() {
        assert_eq!(
            next_cursor(&json!({"response_metadata": {"next_cursor": "dXNlcjpVMEc5V0ZYTlo="}})),
            Some("dXNlcjpVMEc5V0ZYTlo=".to_string())
        );
        assert_eq!(next_cursor(&json!({"response_metadata": {"next_cursor": ""}})), None);
        assert_eq!(next_cursor(&json!({"response_metadata": {"next_cursor": null}})), None);
        assert_eq!(next_cursor(&json!({"members": []})), None);
    }

    #[tokio::test]
    async fn test_single_page_without_metadata() {
        let items = fetch_all("members", |_| async { Ok(json!({"members": [{"id": "U1"}]})) })
            .await
            .unwrap();
        assert_eq!(items, vec![json!({"id": "U1"})]);
    }

    #[tokio::test]
    async fn test_missing_items_field_is_malformed() {
        let err = fetch_all("channels", |_| async { Ok(json!({"members": []})) })
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::MalformedPage { page: 1, .. }));
    }
}
