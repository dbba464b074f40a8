//! Workflows behind every ffsgate request.
//!
//! Each public function here is one user-visible operation: provisioning a
//! profile, changing its configuration, uploading, downloading. They all take
//! a [`Context`] carrying their collaborators explicitly, and they all leave
//! a trace in the event log, whether they succeed or not.

pub mod error;
mod events;
mod profiles;
mod settings;
mod staging;
mod transfer;

pub use crate::profiles::{ProfileCreation, WalletListing, WalletView, create_profile, ensure_default, list_wallets};
pub use crate::settings::{ConfigChange, ConfigForm, ConfigLoad, ConfigView, load_config, save_config};
pub use crate::staging::StagedFile;
pub use crate::transfer::{Download, DownloadedFile, Packaging, Received, Upload, download, receive_file, upload_batch, upload_file};
use ffsgate_compress::Compression;
use ffsgate_powergate::PowergateHandle;
use ffsgate_store::Repository;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Everything a workflow needs, passed in rather than looked up.
pub struct Context {
    store: Repository,
    backend: PowergateHandle,
    upload_dir: PathBuf,
    download_dir: PathBuf,
    package_compression: Compression,
    /// Serializes creation of profiles, so that two requests racing to
    /// provision the default profile end up sharing one.
    provisioning: Mutex<()>,
}

impl Context {
    pub fn new(
        store: Repository,
        backend: PowergateHandle,
        upload_dir: impl Into<PathBuf>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            backend,
            upload_dir: upload_dir.into(),
            download_dir: download_dir.into(),
            package_compression: Compression::default(),
            provisioning: Mutex::new(()),
        }
    }

    /// Compression applied to bundles built from batch uploads.
    pub fn with_package_compression(mut self, compression: Compression) -> Self {
        self.package_compression = compression;
        self
    }

    pub fn store(&self) -> &Repository {
        &self.store
    }

    pub fn backend(&self) -> &PowergateHandle {
        &self.backend
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }
}
