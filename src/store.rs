//! Document store seam.
//!
//! The crawler persists processed documents in a blob store with an
//! etag index; the processor only ever asks that index one question:
//! has this URL been stored before, and under which etag. The store
//! must be safe for concurrent use.

use crate::kind::Kind;
use anyhow::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait Store: Send + Sync {
    /// Returns the etag recorded for a previously stored document.
    async fn etag(&self, kind: Kind, url: &str) -> Result<Option<String>, Error>;
}

/// In-memory etag index, for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    etags: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_etag(&self, url: impl Into<String>, etag: impl Into<String>) {
        self.etags.write().await.insert(url.into(), etag.into());
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn etag(&self, _kind: Kind, url: &str) -> Result<Option<String>, Error> {
        Ok(self.etags.read().await.get(url).cloned())
    }
}
