//! Local staging of uploaded files.
//!
//! Every upload lands in its own freshly created directory inside the upload
//! directory, so two uploads of `report.pdf` never overwrite each other. The
//! directories are kept after the upload; the stored path of a file is the
//! directory it was staged in.

use crate::error::{ErrorKind, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

static UNSAFE_CHARACTERS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());
static UNDERSCORE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{2,}").unwrap());

/// Reduce a client-supplied file name to a safe base name.
///
/// Directory components are dropped, whitespace becomes `_`, anything outside
/// `[A-Za-z0-9_.-]` is removed, and leading dots are stripped so the result
/// is never hidden or relative. Returns `None` if nothing is left.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = UNSAFE_CHARACTERS.replace_all(&joined, "");
    let cleaned = UNDERSCORE_RUNS.replace_all(&cleaned, "_");
    let cleaned = cleaned.trim_start_matches(['.', '_']).trim_end_matches('_');
    match cleaned.is_empty() {
        true => None,
        false => Some(cleaned.to_string()),
    }
}

/// An uploaded file, persisted locally and ready to be sent to Filecoin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    dir: PathBuf,
    name: String,
    size: u64,
}

impl StagedFile {
    /// Persist an incoming upload under its sanitized name.
    ///
    /// An upload without a usable name is [`ErrorKind::NoFileProvided`], as
    /// browsers submit an empty file part when nothing was chosen.
    pub async fn persist<S, E>(upload_dir: &Path, original_name: &str, data: S) -> Result<Self>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let Some(name) = sanitize_file_name(original_name) else {
            exn::bail!(ErrorKind::NoFileProvided);
        };
        let dir = unique_dir(upload_dir, "upload-").await?;
        let path = dir.join(&name);
        let mut file = tokio::fs::File::create(&path).await.map_err(ErrorKind::io)?;
        let mut size = 0u64;
        let mut data = std::pin::pin!(data);
        while let Some(chunk) = data.next().await {
            let chunk = chunk.map_err(|e| ErrorKind::io(std::io::Error::other(e)))?;
            file.write_all(&chunk).await.map_err(ErrorKind::io)?;
            size += chunk.len() as u64;
        }
        file.flush().await.map_err(ErrorKind::io)?;
        tracing::debug!(path = %path.display(), size, "staged upload");
        Ok(Self { dir, name, size })
    }

    /// Adopt a file that already sits in its own staging directory.
    pub(crate) fn existing(dir: PathBuf, name: String, size: u64) -> Self {
        Self { dir, name, size }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The staging directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Create a new, uniquely named directory inside `parent` and keep it.
pub(crate) async fn unique_dir(parent: &Path, prefix: &str) -> Result<PathBuf> {
    Ok(scratch_dir(parent, prefix).await?.keep())
}

/// Create a new, uniquely named directory inside `parent` that is removed,
/// with everything in it, when the returned handle is dropped.
pub(crate) async fn scratch_dir(parent: &Path, prefix: &str) -> Result<TempDir> {
    tokio::fs::create_dir_all(parent).await.map_err(ErrorKind::io)?;
    tempfile::Builder::new().prefix(prefix).tempdir_in(parent).map_err(ErrorKind::io)
}
