//! Single-invocation run controller.

use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::cache::IdentityCache;
use crate::config::Config;
use crate::decode::ArrayDecoder;
use crate::pipeline;

/// Run the filter once: decode `input`, classify against the configured
/// cache, persist new identities, and emit new items on `output`.
///
/// On a first run (the cache file did not exist yet) the cache is primed
/// and nothing is written to `output`. On later runs the new items are
/// written as a pretty-printed JSON array followed by a newline, even
/// when empty. Errors propagate to the caller before anything reaches
/// `output`.
pub async fn run<I, O>(config: &Config, input: I, output: &mut O) -> Result<()>
where
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let cache = Arc::new(IdentityCache::open(&config.cache_dir, &config.name).await?);
    let first_run = cache.is_first_run();

    let mut decoder = ArrayDecoder::new(input);
    let new_items = pipeline::process(&mut decoder, &cache, config.id_key.as_deref()).await?;

    if first_run {
        info!(
            count = new_items.len(),
            cache = %cache.path().display(),
            "first run: cache primed, no output emitted"
        );
        return Ok(());
    }

    debug!(count = new_items.len(), "emitting new items");
    let mut rendered = serde_json::to_string_pretty(&Value::Array(new_items))
        .context("failed to serialize new items")?;
    rendered.push('\n');
    output
        .write_all(rendered.as_bytes())
        .await
        .context("failed to write output")?;
    output.flush().await.context("failed to write output")?;

    Ok(())
}
