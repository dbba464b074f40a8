//! Moving files to and from Filecoin.
//!
//! Uploads and downloads both follow the same shape: do the work, and on a
//! failure the user can do nothing about locally (the service, the disk, a
//! duplicate) write an `ERROR` event and hand back a notice instead of an
//! error. Store failures are the exception and always propagate.

use crate::Context;
use crate::error::{ErrorKind, Result};
use crate::events;
use crate::profiles::ensure_default;
use crate::staging::{StagedFile, sanitize_file_name, scratch_dir, unique_dir};
use bytes::Bytes;
use exn::ResultExt;
use ffsgate_compress::Bundle;
use ffsgate_powergate::ByteStream;
use ffsgate_store::{NewFile, StoredFile};
use futures::{Stream, StreamExt};
use rslug::slugify;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use time::UtcDateTime;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::instrument;

/// Size of the chunks streamed to the staging call.
const CHUNK_SIZE: usize = 1024 * 1024;
/// What the package name field says before the user touches it.
const PACKAGE_NAME_PLACEHOLDER: &str = "Package name";

/// Outcome of uploading one file (or one package).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upload {
    Stored(StoredFile),
    /// The failure has been logged; `notice` is meant for the user.
    Failed { name: String, notice: String },
}

/// How to send a batch of files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packaging {
    /// Every file is uploaded on its own.
    Individual,
    /// All files are bundled into one tar archive, and only the archive is
    /// uploaded.
    Bundle { name: String },
}

/// Outcome of receiving one file from the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Staged(StagedFile),
    /// The failure has been logged; `notice` is meant for the user.
    Failed { name: String, notice: String },
}

/// Outcome of a download.
#[derive(Debug)]
pub enum Download {
    Ready(DownloadedFile),
    /// The failure has been logged; the notice is meant for the user.
    Failed(String),
}

/// Content fetched in full into a directory of its own. The directory and
/// the file are removed when this is dropped, so hold on to it until the
/// content has been sent.
#[derive(Debug)]
pub struct DownloadedFile {
    dir: TempDir,
    name: String,
    cid: String,
}

impl DownloadedFile {
    pub fn path(&self) -> PathBuf {
        self.dir.path().join(&self.name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cid(&self) -> &str {
        &self.cid
    }
}

/// Persist one file of an upload form into its own staging directory.
///
/// Nothing chosen is [`ErrorKind::NoFileProvided`], for the caller to skip.
/// A local failure while writing is logged as a failed upload.
#[instrument(skip(ctx, data))]
pub async fn receive_file<S, E>(ctx: &Context, original_name: &str, data: S) -> Result<Received>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    match StagedFile::persist(&ctx.upload_dir, original_name, data).await {
        Ok(staged) => Ok(Received::Staged(staged)),
        Err(e) if e.is_reportable() => {
            let name = sanitize_file_name(original_name).unwrap_or_else(|| original_name.to_string());
            let detail = (*e).to_string();
            tracing::warn!(error = %detail, "could not stage upload");
            ctx.store.append_log(events::upload_failed(&name, &detail)).await.map_err(ErrorKind::store)?;
            let notice = format!("'{name}' failed to upload to Filecoin. {detail}");
            Ok(Received::Failed { name, notice })
        },
        Err(e) => Err(e),
    }
}

/// Send one staged file to Filecoin and record it.
///
/// Provisions the default profile if there is none yet. The staged copy is
/// left in place whatever happens.
#[instrument(skip_all, fields(name = %staged.name()))]
pub async fn upload_file(ctx: &Context, staged: &StagedFile) -> Result<Upload> {
    match store_file(ctx, staged).await {
        Ok(stored) => {
            tracing::info!(cid = %stored.cid, "upload complete");
            Ok(Upload::Stored(stored))
        },
        Err(e) if e.is_reportable() => {
            let detail = (*e).to_string();
            tracing::warn!(error = %detail, "upload failed");
            ctx.store
                .append_log(events::upload_failed(staged.name(), &detail))
                .await
                .map_err(ErrorKind::store)?;
            Ok(Upload::Failed {
                name: staged.name().to_string(),
                notice: format!("'{}' failed to upload to Filecoin. {detail}", staged.name()),
            })
        },
        Err(e) => Err(e),
    }
}

async fn store_file(ctx: &Context, staged: &StagedFile) -> Result<StoredFile> {
    let ffs = ensure_default(ctx).await?;
    let file = tokio::fs::File::open(staged.path()).await.map_err(ErrorKind::io)?;
    let data: ByteStream = Box::pin(ReaderStream::with_capacity(file, CHUNK_SIZE));
    let cid = ctx.backend.stage(&ffs.token, data).await.map_err(ErrorKind::backend)?;
    let job = ctx.backend.push(&ffs.token, &cid).await.map_err(ErrorKind::backend)?;
    tracing::debug!(cid, job, "pushed to Filecoin");
    let event = events::uploaded(staged.name(), &cid);
    let new = NewFile {
        file_path: staged.dir().to_path_buf(),
        file_name: staged.name().to_string(),
        uploaded_at: UtcDateTime::now(),
        size: staged.size(),
        cid,
        ffs: ffs.id,
    };
    ctx.store.insert_file(&new, &event).await.map_err(ErrorKind::store)
}

/// Send a batch of staged files, either one by one or as a single package.
///
/// A package needs a real name; one that leaves nothing to name the archive
/// after (or the untouched placeholder) is
/// [`ErrorKind::PackageNameMissing`], raised before anything is sent or
/// logged.
#[instrument(skip_all, fields(files = files.len()))]
pub async fn upload_batch(ctx: &Context, files: Vec<StagedFile>, packaging: Packaging) -> Result<Vec<Upload>> {
    if files.is_empty() {
        exn::bail!(ErrorKind::NoFileProvided);
    }
    match packaging {
        Packaging::Individual => {
            let mut uploads = Vec::with_capacity(files.len());
            for staged in &files {
                uploads.push(upload_file(ctx, staged).await?);
            }
            Ok(uploads)
        },
        Packaging::Bundle { name } => {
            let name = name.trim();
            if name == PACKAGE_NAME_PLACEHOLDER {
                exn::bail!(ErrorKind::PackageNameMissing);
            }
            // Blank, or nothing but punctuation.
            let slug = slugify!(name);
            if slug.is_empty() {
                exn::bail!(ErrorKind::PackageNameMissing);
            }
            let file_name = format!("{slug}.tar{}", ctx.package_compression.extension());
            match package(ctx, &file_name, files).await {
                Ok(bundle) => Ok(vec![upload_file(ctx, &bundle).await?]),
                Err(e) if e.is_reportable() => {
                    let detail = (*e).to_string();
                    ctx.store
                        .append_log(events::upload_failed(&file_name, &detail))
                        .await
                        .map_err(ErrorKind::store)?;
                    let notice = format!("'{file_name}' could not be packaged. {detail}");
                    Ok(vec![Upload::Failed { name: file_name, notice }])
                },
                Err(e) => Err(e),
            }
        },
    }
}

/// Archive staged files into a new staging directory of their own.
async fn package(ctx: &Context, file_name: &str, files: Vec<StagedFile>) -> Result<StagedFile> {
    let dir = unique_dir(&ctx.upload_dir, "package-").await?;
    let path = dir.join(file_name);
    let compression = ctx.package_compression;
    let written = tokio::task::spawn_blocking(move || -> ffsgate_compress::error::Result<PathBuf> {
        let mut bundle = Bundle::create(&path, compression)?;
        let mut taken = HashSet::new();
        for (n, staged) in files.iter().enumerate() {
            // Entries with the same name would shadow each other on extraction.
            let entry = match taken.insert(staged.name().to_string()) {
                true => staged.name().to_string(),
                false => format!("{n}-{}", staged.name()),
            };
            bundle.append_file(staged.path(), &entry)?;
        }
        bundle.finish()
    })
    .await
    .or_raise(|| ErrorKind::Io("packaging task failed".to_string()))?
    .map_err(|e| {
        let detail = (*e).to_string();
        e.raise(ErrorKind::Io(detail))
    })?;
    let size = tokio::fs::metadata(&written).await.map_err(ErrorKind::io)?.len();
    tracing::debug!(path = %written.display(), size, "packaged upload");
    Ok(StagedFile::existing(dir, file_name.to_string(), size))
}

/// Fetch a previously uploaded file from Filecoin into the download directory.
///
/// An unknown CID never reaches the service. Partial output is removed if
/// the transfer fails midway, and complete output once the returned
/// [`DownloadedFile`] is dropped.
#[instrument(skip(ctx))]
pub async fn download(ctx: &Context, cid: &str) -> Result<Download> {
    let Some(file) = ctx.store.file_by_cid(cid).await.map_err(ErrorKind::store)? else {
        ctx.store.append_log(events::download_not_found(cid)).await.map_err(ErrorKind::store)?;
        return Ok(Download::Failed(format!("No file with CID {cid} has been uploaded.")));
    };
    match fetch(ctx, &file).await {
        Ok(dir) => {
            ctx.store
                .append_log(events::downloaded(&file.file_name, cid))
                .await
                .map_err(ErrorKind::store)?;
            Ok(Download::Ready(DownloadedFile { dir, name: file.file_name, cid: file.cid }))
        },
        Err(e) if e.is_reportable() => {
            let detail = (*e).to_string();
            tracing::warn!(error = %detail, "download failed");
            ctx.store
                .append_log(events::download_failed(&file.file_name, cid, &detail))
                .await
                .map_err(ErrorKind::store)?;
            Ok(Download::Failed(format!("'{}' failed to download from Filecoin. {detail}", file.file_name)))
        },
        Err(e) => Err(e),
    }
}

async fn fetch(ctx: &Context, file: &StoredFile) -> Result<TempDir> {
    let ffs = ctx
        .store
        .ffs_by_id(file.ffs)
        .await
        .map_err(ErrorKind::store)?
        .ok_or_else(|| exn::Exn::from(ErrorKind::Integrity("file without FFS")))?;
    // Dropped, and so removed, on every early return.
    let dir = scratch_dir(&ctx.download_dir, "download-").await?;
    write_content(ctx, &ffs.token, &file.cid, &dir.path().join(&file.file_name)).await?;
    Ok(dir)
}

async fn write_content(ctx: &Context, token: &str, cid: &str, path: &Path) -> Result<()> {
    let mut chunks = ctx.backend.get(token, cid).await.map_err(ErrorKind::backend)?;
    let mut out = tokio::fs::File::create(path).await.map_err(ErrorKind::io)?;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(ErrorKind::backend)?;
        out.write_all(&chunk).await.map_err(ErrorKind::io)?;
    }
    out.flush().await.map_err(ErrorKind::io)?;
    Ok(())
}
