//! Append-only identity cache, one file per named instance.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::debug;

/// A named, file-backed set of identity strings.
///
/// The backing file holds one identity per line, in first-recorded order,
/// and is only ever appended to: no compaction, no expiry. Lookups stream
/// the file line by line and stop at the first match; each lookup opens
/// its own handle, so lookups for several items may run concurrently.
pub struct IdentityCache {
    path: PathBuf,
    existed: bool,
}

impl IdentityCache {
    /// Open the cache named `name` under `dir`, creating the directory if
    /// needed. Records whether the cache file already existed so the
    /// caller can detect a first run.
    pub async fn open(dir: &Path, name: &str) -> Result<Self> {
        if name.is_empty() || name.contains(['/', '\\']) {
            bail!("invalid cache name: {name:?}");
        }

        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create cache directory: {}", dir.display()))?;

        let path = dir.join(format!("{name}.cache"));
        let existed = fs::try_exists(&path)
            .await
            .with_context(|| format!("failed to stat cache file: {}", path.display()))?;
        debug!(path = %path.display(), existed, "opened identity cache");

        Ok(Self { path, existed })
    }

    /// Whether the cache file was absent before this invocation.
    pub fn is_first_run(&self) -> bool {
        !self.existed
    }

    /// Path of the backing cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `id` is present as a full line in the cache file.
    ///
    /// A cache file that does not exist yet reads as empty.
    pub async fn contains(&self, id: &str) -> Result<bool> {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to open cache file: {}", self.path.display())
                })
            }
        };

        let mut lines = BufReader::new(file).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .with_context(|| format!("failed to read cache file: {}", self.path.display()))?
        {
            if line == id {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Append each identity as its own line, then flush and sync so the
    /// write is durable before the run reports success.
    ///
    /// The file is opened in create+append mode even when `ids` is empty,
    /// so a first run materializes the cache file regardless of how many
    /// identities it recorded.
    pub async fn append(&self, ids: &[String]) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| {
                format!("failed to open cache file for append: {}", self.path.display())
            })?;

        let mut writer = BufWriter::new(file);
        for id in ids {
            writer
                .write_all(id.as_bytes())
                .await
                .with_context(|| format!("failed to append to cache file: {}", self.path.display()))?;
            writer
                .write_all(b"\n")
                .await
                .with_context(|| format!("failed to append to cache file: {}", self.path.display()))?;
        }
        writer
            .flush()
            .await
            .with_context(|| format!("failed to flush cache file: {}", self.path.display()))?;
        writer
            .into_inner()
            .sync_all()
            .await
            .with_context(|| format!("failed to sync cache file: {}", self.path.display()))?;

        debug!(count = ids.len(), path = %self.path.display(), "appended identities to cache");
        Ok(())
    }
}
