//! Digest cache: a content-addressed key over
//! `(host, owner, repo, commit, subpath, pattern-hash)`, consulted against an
//! opaque object-storage backend.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sha2::{Digest as _, Sha256};

use crate::error::Error;
use crate::types::{Digest, IngestionQuery};

/// Minimal object-storage interface the cache is built on. The in-memory
/// implementation below stands in for tests and for builds that don't wire
/// up a real backend; a production backend (e.g. S3) implements the same
/// trait.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn head(&self, key: &str) -> bool;
    async fn get(&self, key: &str) -> Option<Vec<u8>>;
    async fn put(&self, key: &str, bytes: Vec<u8>, tag: &str);
}

/// In-memory stand-in backend: the default implementation used for tests and
/// for builds that don't wire up a real object store.
#[derive(Default)]
pub struct InMemoryStore {
    blobs: Mutex<std::collections::HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn head(&self, key: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(key)
    }

    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(key).cloned()
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, _tag: &str) {
        self.blobs.lock().unwrap().insert(key.to_string(), bytes);
    }
}

/// Wraps an [`ObjectStore`] with content-addressed key derivation and a
/// JSON sibling that carries the full digest triple alongside the blob.
pub struct DigestCache {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl DigestCache {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn key_for(&self, query: &IngestionQuery) -> String {
        cache_key(&self.prefix, query)
    }

    /// Returns the cached digest triple if present. A hit with a missing
    /// `.json` sibling still links the `.txt` blob but reconstitutes the
    /// triple with placeholder summary/tree text.
    pub async fn get(&self, query: &IngestionQuery) -> Option<Digest> {
        let key = self.key_for(query);
        if !self.store.head(&key).await {
            return None;
        }
        let json_key = format!("{}.json", key.trim_end_matches(".txt"));
        match self.store.get(&json_key).await {
            Some(bytes) => serde_json::from_slice::<Digest>(&bytes).ok(),
            None => Some(Digest {
                summary: String::new(),
                tree: String::new(),
                content: String::new(),
            }),
        }
    }

    pub async fn put(&self, query: &IngestionQuery, digest: &Digest) -> Result<(), Error> {
        let key = self.key_for(query);
        self.store.put(&key, digest.as_blob().into_bytes(), &query.id.to_string()).await;
        let json_key = format!("{}.json", key.trim_end_matches(".txt"));
        let bytes = serde_json::to_vec(digest).map_err(|e| Error::InvalidInput(e.to_string()))?;
        self.store.put(&json_key, bytes, &query.id.to_string()).await;
        Ok(())
    }
}

/// `prefix/ingest/<host>/<owner>/<repo>/<commit>/<patterns-hash>/<owner>-<repo>-<subpath-hash>.txt`.
/// Both hashes are the first 16 hex digits of SHA-256 over deterministic inputs.
pub fn cache_key(prefix: &str, query: &IngestionQuery) -> String {
    let host = query.host.as_deref().unwrap_or("");
    let owner = query.owner.as_deref().unwrap_or("");
    let repo = query.repo.as_deref().unwrap_or("");
    let commit = query.commit.as_deref().unwrap_or("");
    let patterns_hash = hash16(&patterns_hash_input(&query.include, &query.exclude));
    let subpath_hash = hash16(query.subpath.as_bytes());

    format!(
        "{}/ingest/{host}/{owner}/{repo}/{commit}/{patterns_hash}/{owner}-{repo}-{subpath_hash}.txt",
        prefix.trim_end_matches('/')
    )
}

fn patterns_hash_input(include: &BTreeSet<String>, exclude: &BTreeSet<String>) -> Vec<u8> {
    let mut s = String::from("include:");
    for p in include {
        s.push_str(p);
        s.push(',');
    }
    s.push_str("exclude:");
    for p in exclude {
        s.push_str(p);
        s.push(',');
    }
    s.into_bytes()
}

fn hash16(input: &[u8]) -> String {
    let digest = Sha256::digest(input);
    hex::encode(digest)[..16].to_string()
}
