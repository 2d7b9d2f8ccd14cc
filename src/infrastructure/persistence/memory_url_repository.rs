//! In-memory implementation of the URL repository.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

use crate::domain::entities::{UrlEntry, UserUrl};
use crate::domain::repositories::UrlRepository;
use crate::error::StorageError;

/// Plain code → entry map with the storage contract's semantics.
///
/// Not synchronized: owners wrap it in a lock. Content deduplication is a
/// linear scan over all entries.
#[derive(Debug, Default)]
pub(crate) struct UrlTable {
    entries: HashMap<String, UrlEntry>,
    /// Codes in insertion order, for stable owner listings.
    order: Vec<String>,
}

impl UrlTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    pub(crate) fn read(&self, code: &str) -> Result<String, StorageError> {
        match self.entries.get(code) {
            None => Err(StorageError::NotFound(code.to_string())),
            Some(entry) if entry.deleted => Err(StorageError::UrlDeleted(code.to_string())),
            Some(entry) => Ok(entry.original_url.clone()),
        }
    }

    /// Finds the live entry of `owner_id` for `url`.
    pub(crate) fn find_live_code(&self, url: &str, owner_id: &str) -> Option<String> {
        self.entries
            .values()
            .find(|e| e.is_live_for(owner_id) && e.original_url == url)
            .map(|e| e.code.clone())
    }

    pub(crate) fn ensure_vacant(&self, code: &str) -> Result<(), StorageError> {
        if self.contains(code) {
            return Err(StorageError::CodeAlreadyExists(code.to_string()));
        }
        Ok(())
    }

    /// Checks that every code of a batch is vacant and not repeated.
    pub(crate) fn ensure_batch_vacant(
        &self,
        entries: &[(String, String)],
    ) -> Result<(), StorageError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for (code, _) in entries {
            self.ensure_vacant(code)?;
            if !seen.insert(code.as_str()) {
                return Err(StorageError::CodeAlreadyExists(code.clone()));
            }
        }
        Ok(())
    }

    pub(crate) fn insert(&mut self, entry: UrlEntry) -> Result<(), StorageError> {
        self.ensure_vacant(&entry.code)?;
        self.order.push(entry.code.clone());
        self.entries.insert(entry.code.clone(), entry);
        Ok(())
    }

    /// Applies a replayed record: unknown codes are inserted, known codes can
    /// only gain the deleted flag.
    pub(crate) fn apply(&mut self, entry: UrlEntry) {
        match self.entries.get_mut(&entry.code) {
            Some(existing) => {
                if entry.deleted {
                    existing.mark_deleted();
                }
            }
            None => {
                self.order.push(entry.code.clone());
                self.entries.insert(entry.code.clone(), entry);
            }
        }
    }

    pub(crate) fn is_owned_by(&self, code: &str, owner_id: &str) -> bool {
        self.entries
            .get(code)
            .is_some_and(|e| e.is_live_for(owner_id))
    }

    /// Returns the subset of `codes` that `owner_id` can delete, without duplicates.
    pub(crate) fn deletable(&self, codes: &[String], owner_id: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        codes
            .iter()
            .filter(|code| self.is_owned_by(code, owner_id) && seen.insert(code.as_str()))
            .cloned()
            .collect()
    }

    pub(crate) fn mark_deleted(&mut self, codes: &[String]) {
        for code in codes {
            if let Some(entry) = self.entries.get_mut(code) {
                entry.mark_deleted();
            }
        }
    }

    pub(crate) fn entry(&self, code: &str) -> Option<&UrlEntry> {
        self.entries.get(code)
    }

    /// Live entries of `owner_id`, newest first.
    pub(crate) fn by_owner(&self, owner_id: &str) -> Vec<UserUrl> {
        self.order
            .iter()
            .rev()
            .filter_map(|code| self.entries.get(code))
            .filter(|e| e.is_live_for(owner_id))
            .map(|e| UserUrl {
                code: e.code.clone(),
                original_url: e.original_url.clone(),
            })
            .collect()
    }
}

/// In-memory repository guarded by a single mutex.
///
/// All operations serialize behind one lock; no lock is held across calls.
#[derive(Debug, Default)]
pub struct InMemoryUrlRepository {
    table: Mutex<UrlTable>,
}

impl InMemoryUrlRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self {
            table: Mutex::new(UrlTable::new()),
        }
    }

    /// Number of stored entries, deleted ones included.
    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UrlRepository for InMemoryUrlRepository {
    async fn read(&self, code: &str) -> Result<String, StorageError> {
        self.table.lock().await.read(code)
    }

    async fn write(&self, code: &str, url: &str, owner_id: &str) -> Result<(), StorageError> {
        self.table.lock().await.insert(UrlEntry::new(
            code.to_string(),
            url.to_string(),
            owner_id.to_string(),
        ))
    }

    async fn create_or_get(
        &self,
        code: &str,
        url: &str,
        owner_id: &str,
    ) -> Result<(String, bool), StorageError> {
        let mut table = self.table.lock().await;

        if let Some(existing) = table.find_live_code(url, owner_id) {
            return Ok((existing, false));
        }

        table.insert(UrlEntry::new(
            code.to_string(),
            url.to_string(),
            owner_id.to_string(),
        ))?;

        Ok((code.to_string(), true))
    }

    async fn write_batch(
        &self,
        entries: Vec<(String, String)>,
        owner_id: &str,
    ) -> Result<(), StorageError> {
        let mut table = self.table.lock().await;
        table.ensure_batch_vacant(&entries)?;

        for (code, url) in entries {
            table.insert(UrlEntry::new(code, url, owner_id.to_string()))?;
        }

        Ok(())
    }

    async fn is_code_unique(&self, code: &str) -> Result<bool, StorageError> {
        Ok(!self.table.lock().await.contains(code))
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<UserUrl>, StorageError> {
        Ok(self.table.lock().await.by_owner(owner_id))
    }

    async fn delete_batch(&self, codes: Vec<String>, owner_id: &str) -> Result<(), StorageError> {
        let mut table = self.table.lock().await;
        let deletable = table.deletable(&codes, owner_id);
        table.mark_deleted(&deletable);
        Ok(())
    }

    async fn is_owned_by(&self, code: &str, owner_id: &str) -> Result<bool, StorageError> {
        Ok(self.table.lock().await.is_owned_by(code, owner_id))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
