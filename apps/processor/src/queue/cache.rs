#![allow(dead_code)]

//! Parse-result cache. Absorbs duplicate or retried parse requests inside
//! the TTL window so they never re-spend AI quota. Best-effort: a cache
//! failure degrades to a miss, never to a job failure.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::resume::ParsedCandidateData;

/// How long a successful parse result short-circuits re-parsing.
pub const PARSE_CACHE_TTL: Duration = Duration::from_secs(3600);

#[async_trait]
pub trait ParseCache: Send + Sync {
    async fn get(&self, resume_id: Uuid) -> Option<ParsedCandidateData>;
    async fn put(&self, resume_id: Uuid, data: &ParsedCandidateData);
}

fn cache_key(resume_id: Uuid) -> String {
    format!("resume:parse:{resume_id}")
}

/// Redis-backed cache used in production. Concurrent writers for the same
/// key are last-write-wins, which is safe because identical input produces
/// identical output.
pub struct RedisParseCache {
    client: redis::Client,
    ttl: Duration,
}

impl RedisParseCache {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            ttl: PARSE_CACHE_TTL,
        }
    }
}

#[async_trait]
impl ParseCache for RedisParseCache {
    async fn get(&self, resume_id: Uuid) -> Option<ParsedCandidateData> {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("parse cache unavailable, treating as miss: {e}");
                return None;
            }
        };
        let raw: Option<String> = match conn.get(cache_key(resume_id)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("parse cache read failed, treating as miss: {e}");
                return None;
            }
        };
        raw.and_then(|json| match serde_json::from_str(&json) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("parse cache entry for {resume_id} is corrupt, ignoring: {e}");
                None
            }
        })
    }

    async fn put(&self, resume_id: Uuid, data: &ParsedCandidateData) {
        let payload = match serde_json::to_string(data) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("parse cache serialize failed: {e}");
                return;
            }
        };
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("parse cache unavailable, skipping write: {e}");
                return;
            }
        };
        let result: redis::RedisResult<()> = conn
            .set_ex(cache_key(resume_id), payload, self.ttl.as_secs())
            .await;
        match result {
            Ok(()) => debug!("parse result cached for {resume_id}"),
            Err(e) => warn!("parse cache write failed: {e}"),
        }
    }
}

/// In-process cache with the same TTL semantics, used by tests and
/// single-process runs without Redis.
pub struct MemoryParseCache {
    ttl: Duration,
    entries: Mutex<HashMap<Uuid, (Instant, ParsedCandidateData)>>,
}

impl MemoryParseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryParseCache {
    fn default() -> Self {
        Self::new(PARSE_CACHE_TTL)
    }
}

#[async_trait]
impl ParseCache for MemoryParseCache {
    async fn get(&self, resume_id: Uuid) -> Option<ParsedCandidateData> {
        let mut entries = self.entries.lock().expect("cache lock");
        match entries.get(&resume_id) {
            Some((stored_at, data)) if stored_at.elapsed() < self.ttl => Some(data.clone()),
            Some(_) => {
                entries.remove(&resume_id);
                None
            }
            None => None,
        }
    }

    async fn put(&self, resume_id: Uuid, data: &ParsedCandidateData) {
        self.entries
            .lock()
            .expect("cache lock")
            .insert(resume_id, (Instant::now(), data.clone()));
    }
}
