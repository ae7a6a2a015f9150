//! In-memory [`StorageClient`] implementation backed by [`DashMap`].
//!
//! Intended for development and tests. ETags are SHA-256 content hashes and
//! pagination tokens encode an offset into the key-ordered result set.

use armrpc_core::ResourceId;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use super::{Object, ObjectQueryResult, Query, QueryOptions, StorageClient, StoreError};

/// Concurrent in-memory store keyed by lower-cased resource ID.
#[derive(Debug, Default)]
pub struct MemoryStorageClient {
    entries: DashMap<String, Object>,
}

impl MemoryStorageClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_key(id: &str) -> String {
    id.to_ascii_lowercase()
}

fn compute_etag(data: &serde_json::Value) -> Result<String, StoreError> {
    let bytes = serde_json::to_vec(data).map_err(|e| StoreError::Invalid {
        message: format!("failed to serialize resource: {e}"),
    })?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Decodes a pagination token into a result offset.
///
/// Missing tokens start at offset 0.
fn decode_token_offset(token: Option<&str>) -> Result<usize, StoreError> {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return Ok(0);
    };
    let invalid = || StoreError::Invalid {
        message: format!("invalid pagination token '{token}'"),
    };
    let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
    let buf: [u8; 8] = bytes.as_slice().try_into().map_err(|_| invalid())?;
    usize::try_from(u64::from_le_bytes(buf)).map_err(|_| invalid())
}

/// Encodes an offset as an opaque pagination token (little-endian `u64`).
fn encode_token_offset(offset: usize) -> String {
    URL_SAFE_NO_PAD.encode((offset as u64).to_le_bytes())
}

fn scope_matches(stored_scope: &str, query: &Query) -> bool {
    let stored = stored_scope.to_ascii_lowercase();
    let wanted = query.root_scope.to_ascii_lowercase();
    if stored == wanted {
        return true;
    }
    query.scope_recursive
        && stored
            .strip_prefix(wanted.trim_end_matches('/'))
            .is_some_and(|rest| rest.starts_with('/'))
}

#[async_trait]
impl StorageClient for MemoryStorageClient {
    async fn get(&self, id: &str) -> Result<Object, StoreError> {
        self.entries
            .get(&normalize_key(id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    async fn save(&self, object: &mut Object, etag: Option<&str>) -> Result<(), StoreError> {
        let id = ResourceId::parse_resource(&object.metadata.id).map_err(|e| StoreError::Invalid {
            message: e.to_string(),
        })?;
        let new_etag = compute_etag(&object.data)?;

        match self.entries.entry(normalize_key(id.as_str())) {
            Entry::Occupied(mut occupied) => {
                if let Some(expected) = etag {
                    if occupied.get().metadata.etag != expected {
                        return Err(StoreError::Concurrency);
                    }
                }
                object.metadata.etag = new_etag;
                occupied.insert(object.clone());
            }
            Entry::Vacant(vacant) => {
                if etag.is_some() {
                    return Err(StoreError::Concurrency);
                }
                object.metadata.etag = new_etag;
                vacant.insert(object.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &str, etag: Option<&str>) -> Result<(), StoreError> {
        match self.entries.entry(normalize_key(id)) {
            Entry::Occupied(occupied) => {
                if let Some(expected) = etag {
                    if occupied.get().metadata.etag != expected {
                        return Err(StoreError::Concurrency);
                    }
                }
                occupied.remove();
                Ok(())
            }
            Entry::Vacant(_) => Err(StoreError::NotFound { id: id.to_string() }),
        }
    }

    async fn query(
        &self,
        query: &Query,
        options: &QueryOptions,
    ) -> Result<ObjectQueryResult, StoreError> {
        let offset = decode_token_offset(options.pagination_token.as_deref())?;

        let mut matches: Vec<(String, Object)> = self
            .entries
            .iter()
            .filter(|entry| {
                ResourceId::parse(&entry.value().metadata.id).is_ok_and(|id| {
                    id.resource_type().eq_ignore_ascii_case(&query.resource_type)
                        && scope_matches(&id.root_scope(), query)
                })
            })
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(&b.0));

        let total = matches.len();
        let page_size = if options.max_query_item_count == 0 {
            total
        } else {
            options.max_query_item_count
        };
        let items: Vec<Object> = matches
            .into_iter()
            .skip(offset)
            .take(page_size)
            .map(|(_, object)| object)
            .collect();

        let next_offset = offset + items.len();
        let pagination_token = (next_offset < total).then(|| encode_token_offset(next_offset));

        Ok(ObjectQueryResult {
            items,
            pagination_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::store::Metadata;

    const RG: &str = "/planes/radius/local/resourceGroups/rg";

    fn object(id: &str, value: i64) -> Object {
        Object {
            metadata: Metadata {
                id: id.to_string(),
                etag: String::new(),
            },
            data: json!({ "value": value }),
        }
    }

    fn container(scope: &str, name: &str) -> String {
        format!("{scope}/providers/Applications.Core/containers/{name}")
    }

    #[tokio::test]
    async fn save_assigns_etag_and_get_is_case_insensitive() {
        let store = MemoryStorageClient::new();
        let id = container(RG, "c1");
        let mut obj = object(&id, 1);
        store.save(&mut obj, None).await.unwrap();
        assert!(!obj.metadata.etag.is_empty());

        let fetched = store.get(&id.to_uppercase()).await.unwrap();
        assert_eq!(fetched, obj);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = MemoryStorageClient::new();
        let err = store.get(&container(RG, "missing")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn save_enforces_etag_precondition() {
        let store = MemoryStorageClient::new();
        let id = container(RG, "c1");
        let mut first = object(&id, 1);
        store.save(&mut first, None).await.unwrap();

        let mut stale = object(&id, 2);
        let err = store.save(&mut stale, Some("stale")).await.unwrap_err();
        assert!(matches!(err, StoreError::Concurrency));

        let mut fresh = object(&id, 3);
        store.save(&mut fresh, Some(&first.metadata.etag)).await.unwrap();
        assert_ne!(fresh.metadata.etag, first.metadata.etag);
    }

    #[tokio::test]
    async fn save_with_etag_on_missing_resource_conflicts() {
        let store = MemoryStorageClient::new();
        let mut obj = object(&container(RG, "c1"), 1);
        let err = store.save(&mut obj, Some("abc")).await.unwrap_err();
        assert!(matches!(err, StoreError::Concurrency));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn save_rejects_non_resource_ids() {
        let store = MemoryStorageClient::new();
        let mut obj = object(RG, 1);
        let err = store.save(&mut obj, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid { .. }));
    }

    #[tokio::test]
    async fn delete_checks_etag_and_existence() {
        let store = MemoryStorageClient::new();
        let id = container(RG, "c1");
        let mut obj = object(&id, 1);
        store.save(&mut obj, None).await.unwrap();

        assert!(matches!(
            store.delete(&id, Some("stale")).await.unwrap_err(),
            StoreError::Concurrency
        ));
        store.delete(&id, Some(&obj.metadata.etag)).await.unwrap();
        assert!(store.delete(&id, None).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn query_filters_by_scope_and_type() {
        let store = MemoryStorageClient::new();
        let other_rg = "/planes/radius/local/resourceGroups/other";
        for id in [
            container(RG, "a"),
            container(RG, "b"),
            container(other_rg, "c"),
            format!("{RG}/providers/Applications.Core/applications/app"),
        ] {
            store.save(&mut object(&id, 1), None).await.unwrap();
        }

        let query = Query {
            root_scope: RG.to_string(),
            scope_recursive: false,
            resource_type: "applications.core/containers".to_string(),
        };
        let result = store.query(&query, &QueryOptions::default()).await.unwrap();
        assert_eq!(result.items.len(), 2);
        assert!(result.pagination_token.is_none());

        let recursive = Query {
            root_scope: "/planes/radius/local".to_string(),
            scope_recursive: true,
            ..query
        };
        let result = store.query(&recursive, &QueryOptions::default()).await.unwrap();
        assert_eq!(result.items.len(), 3);
    }

    #[tokio::test]
    async fn query_paginates_with_tokens() {
        let store = MemoryStorageClient::new();
        for i in 0..7 {
            store
                .save(&mut object(&container(RG, &format!("c{i}")), i), None)
                .await
                .unwrap();
        }
        let query = Query {
            root_scope: RG.to_string(),
            scope_recursive: false,
            resource_type: "Applications.Core/containers".to_string(),
        };

        let mut options = QueryOptions {
            pagination_token: None,
            max_query_item_count: 5,
        };
        let first = store.query(&query, &options).await.unwrap();
        assert_eq!(first.items.len(), 5);
        let token = first.pagination_token.expect("more pages");

        options.pagination_token = Some(token);
        let second = store.query(&query, &options).await.unwrap();
        assert_eq!(second.items.len(), 2);
        assert!(second.pagination_token.is_none());
    }

    #[tokio::test]
    async fn query_rejects_garbage_token() {
        let store = MemoryStorageClient::new();
        let options = QueryOptions {
            pagination_token: Some("not-a-token!".to_string()),
            max_query_item_count: 5,
        };
        let err = store.query(&Query::default(), &options).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid { .. }));
    }

    proptest! {
        #[test]
        fn paging_visits_every_match_once(count in 0usize..40, page_size in 1usize..12) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let seen = runtime.block_on(async {
                let store = MemoryStorageClient::new();
                for i in 0..count {
                    store
                        .save(&mut object(&container(RG, &format!("c{i}")), 0), None)
                        .await
                        .unwrap();
                }
                let query = Query {
                    root_scope: RG.to_string(),
                    scope_recursive: false,
                    resource_type: "Applications.Core/containers".to_string(),
                };
                let mut options = QueryOptions {
                    pagination_token: None,
                    max_query_item_count: page_size,
                };
                let mut seen = Vec::new();
                loop {
                    let page = store.query(&query, &options).await.unwrap();
                    assert!(page.items.len() <= page_size);
                    seen.extend(page.items.into_iter().map(|o| o.metadata.id));
                    match page.pagination_token {
                        Some(token) => options.pagination_token = Some(token),
                        None => break,
                    }
                }
                seen
            });

            prop_assert_eq!(seen.len(), count);
            let unique: HashSet<_> = seen.iter().map(|id| id.to_lowercase()).collect();
            prop_assert_eq!(unique.len(), count);
        }
    }
}
