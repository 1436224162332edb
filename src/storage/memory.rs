//! In-memory report store.
//!
//! Lists keys in lexicographic order like S3 and GCS, counts calls, and can
//! be told to fail or to hold fetches until released.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;

use super::{FetchedObject, ObjectEntry, ObjectPage, ReportStore, StorageError};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    updated: Option<DateTime<Utc>>,
}

/// Report store backed by a map.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failing_keys: Mutex<HashSet<String>>,
    listing_error: Mutex<Option<u16>>,
    gate: Option<Arc<Semaphore>>,
    list_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that blocks every fetch until [`MemoryStore::release_fetches`].
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn with_object(self, key: &str, body: impl Into<Vec<u8>>) -> Self {
        self.insert(key, body.into(), None);
        self
    }

    pub fn with_object_at(self, key: &str, body: impl Into<Vec<u8>>, updated: DateTime<Utc>) -> Self {
        self.insert(key, body.into(), Some(updated));
        self
    }

    /// Make fetches of `key` fail with HTTP 500.
    pub fn with_failing_fetch(self, key: &str) -> Self {
        if let Ok(mut failing) = self.failing_keys.lock() {
            failing.insert(key.to_string());
        }
        self
    }

    /// Make every listing fail with the given HTTP status.
    pub fn with_listing_error(self, status: u16) -> Self {
        if let Ok(mut err) = self.listing_error.lock() {
            *err = Some(status);
        }
        self
    }

    pub fn insert(&self, key: &str, body: Vec<u8>, updated: Option<DateTime<Utc>>) {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(key.to_string(), StoredObject { body, updated });
        }
    }

    /// Let `n` held fetches proceed.
    pub fn release_fetches(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    fn describe(&self) -> String {
        "memory://reports".to_string()
    }

    async fn list(
        &self,
        prefix: &str,
        max_results: usize,
        token: Option<&str>,
    ) -> Result<ObjectPage, StorageError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(status) = self.listing_error.lock().ok().and_then(|e| *e) {
            return Err(StorageError::Status {
                url: self.describe(),
                status,
            });
        }

        let start = match token {
            Some(t) => t
                .parse::<usize>()
                .map_err(|_| StorageError::InvalidListing(format!("bad token {}", t)))?,
            None => 0,
        };

        let objects = self
            .objects
            .lock()
            .map_err(|_| StorageError::InvalidListing("store poisoned".to_string()))?;
        let matching: Vec<_> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .collect();

        let entries: Vec<ObjectEntry> = matching
            .iter()
            .skip(start)
            .take(max_results)
            .map(|(key, obj)| ObjectEntry {
                key: (*key).clone(),
                updated: obj.updated,
            })
            .collect();

        let end = start + entries.len();
        let next_token = (end < matching.len()).then(|| end.to_string());

        Ok(ObjectPage {
            entries,
            next_token,
        })
    }

    async fn fetch(&self, key: &str) -> Result<FetchedObject, StorageError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let failing = self
            .failing_keys
            .lock()
            .map(|f| f.contains(key))
            .unwrap_or(false);
        if failing {
            return Err(StorageError::Status {
                url: key.to_string(),
                status: 500,
            });
        }

        let object = self
            .objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(key).cloned())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        Ok(FetchedObject {
            body: object.body,
            last_modified: None,
        })
    }
}
