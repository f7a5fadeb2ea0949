use async_trait::async_trait;
use hoplink_core::error::StorageError;
use hoplink_core::mapping::{MappingPatch, OwnerQuery, Page, SortBy, SortOrder, UrlMapping};
use hoplink_core::repository::{ReadRepository, Repository};
use hoplink_core::shortcode::ShortCode;
use jiff::Timestamp;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

type Result<T> = std::result::Result<T, StorageError>;

/// In-memory repository with the same contract as the Postgres store.
///
/// Used by unit tests and single-process setups. Short codes are never
/// reused: soft-deleted rows keep occupying their code.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMappingStore {
    rows: Arc<Mutex<HashMap<String, UrlMapping>>>,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadRepository for InMemoryMappingStore {
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlMapping>> {
        let rows = self.rows.lock().await;
        Ok(rows.get(code.as_str()).cloned())
    }

    async fn get_active(&self, code: &ShortCode) -> Result<Option<UrlMapping>> {
        let rows = self.rows.lock().await;
        Ok(rows.get(code.as_str()).filter(|m| m.active).cloned())
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        let rows = self.rows.lock().await;
        Ok(rows.contains_key(code.as_str()))
    }
}

#[async_trait]
impl Repository for InMemoryMappingStore {
    async fn insert(&self, mapping: &UrlMapping) -> Result<()> {
        let mut rows = self.rows.lock().await;
        let key = mapping.short_code.as_str().to_string();
        if rows.contains_key(&key) {
            return Err(StorageError::Conflict(key));
        }
        rows.insert(key, mapping.clone());
        Ok(())
    }

    async fn update(&self, code: &ShortCode, patch: MappingPatch) -> Result<Option<UrlMapping>> {
        let mut rows = self.rows.lock().await;
        let Some(row) = rows.get_mut(code.as_str()).filter(|m| m.active) else {
            return Ok(None);
        };

        if let Some(long_url) = patch.long_url {
            row.long_url = long_url;
        }
        if let Some(expires_at) = patch.expires_at {
            row.expires_at = Some(expires_at);
        }
        if let Some(metadata) = patch.metadata {
            row.metadata = metadata;
        }

        Ok(Some(row.clone()))
    }

    async fn soft_delete(&self, code: &ShortCode) -> Result<bool> {
        let mut rows = self.rows.lock().await;
        match rows.get_mut(code.as_str()) {
            Some(row) if row.active => {
                row.active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_owner(
        &self,
        owner_id: &str,
        query: OwnerQuery,
    ) -> Result<Page<UrlMapping>> {
        let rows = self.rows.lock().await;
        let mut items: Vec<UrlMapping> = rows
            .values()
            .filter(|m| m.active && m.owner_id == owner_id)
            .cloned()
            .collect();

        items.sort_by(|a, b| {
            let ordering = match query.sort_by {
                SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
                SortBy::ClickCount => a.click_count.cmp(&b.click_count),
            };
            match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let offset = query.offset() as usize;
        let items: Vec<UrlMapping> = items.into_iter().skip(offset).collect();
        let has_next = items.len() > query.page_size as usize;
        let items = items
            .into_iter()
            .take(query.page_size as usize)
            .collect();

        Ok(Page { items, has_next })
    }

    async fn increment_click(&self, code: &ShortCode) -> Result<()> {
        let mut rows = self.rows.lock().await;
        if let Some(row) = rows.get_mut(code.as_str()) {
            row.click_count += 1;
            row.last_accessed = Some(Timestamp::now());
        }
        Ok(())
    }

    async fn click_count(&self, code: &ShortCode) -> Result<Option<u64>> {
        let rows = self.rows.lock().await;
        Ok(rows.get(code.as_str()).map(|m| m.click_count))
    }
}
