//! Dedup filter pipeline: decode, classify against the cache, append.

use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::task::JoinSet;
use tracing::debug;

use crate::cache::IdentityCache;
use crate::decode::ArrayDecoder;
use crate::identity::identity;

/// Upper bound on cache lookups in flight at once.
const LOOKUP_CONCURRENCY: usize = 8;

/// Filter the decoded stream down to the values whose identity is not yet
/// in the cache, preserving input order, then append the new identities.
///
/// Lookups run concurrently in batches of up to [`LOOKUP_CONCURRENCY`],
/// tagged with their batch index and re-assembled in that order, so
/// completion order cannot reorder the result. The append happens only
/// after the whole input has been consumed and classified; any failure
/// before that point leaves the cache untouched.
pub async fn process<R>(
    decoder: &mut ArrayDecoder<R>,
    cache: &Arc<IdentityCache>,
    id_key: Option<&str>,
) -> Result<Vec<Value>>
where
    R: AsyncRead + Unpin,
{
    let mut new_items = Vec::new();
    let mut new_ids = Vec::new();

    loop {
        let mut batch: Vec<(Value, String)> = Vec::with_capacity(LOOKUP_CONCURRENCY);
        while batch.len() < LOOKUP_CONCURRENCY {
            match decoder.next_value().await? {
                Some(value) => {
                    let id = identity(&value, id_key);
                    batch.push((value, id));
                }
                None => break,
            }
        }
        if batch.is_empty() {
            break;
        }

        let mut lookups = JoinSet::new();
        for (idx, (_, id)) in batch.iter().enumerate() {
            let cache = Arc::clone(cache);
            let id = id.clone();
            lookups.spawn(async move { cache.contains(&id).await.map(|seen| (idx, seen)) });
        }

        let mut seen = vec![false; batch.len()];
        while let Some(joined) = lookups.join_next().await {
            let (idx, was_seen) = joined.context("cache lookup task failed")??;
            seen[idx] = was_seen;
        }

        for ((value, id), was_seen) in batch.into_iter().zip(seen) {
            if was_seen {
                debug!(id = %id, "identity found in cache");
            } else {
                debug!(id = %id, "identity not found in cache");
                new_ids.push(id);
                new_items.push(value);
            }
        }
    }

    cache.append(&new_ids).await?;

    Ok(new_items)
}
