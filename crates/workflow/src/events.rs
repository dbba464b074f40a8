//! Texts written to the event log.

use std::fmt::Display;

pub(crate) fn ffs_created(ffs_id: &str) -> String {
    format!("Created new Filecoin FileSystem (FFS): {ffs_id}")
}

pub(crate) fn wallet_created(address: &str) -> String {
    format!("Created new Wallet: {address}")
}

pub(crate) fn ffs_create_failed(error: impl Display) -> String {
    format!("Create FFS ERROR: {error}")
}

pub(crate) fn wallets_failed(ffs_id: &str, error: impl Display) -> String {
    format!("Wallet ERROR: FFS {ffs_id} {error}")
}

pub(crate) fn uploaded(name: &str, cid: &str) -> String {
    format!("Uploaded {name} (CID: {cid}) to Filecoin.")
}

pub(crate) fn upload_failed(name: &str, error: impl Display) -> String {
    format!("Upload ERROR: {name} {error}")
}

pub(crate) fn downloaded(name: &str, cid: &str) -> String {
    format!("Downloaded {name} (CID: {cid}) from Filecoin.")
}

pub(crate) fn download_failed(name: &str, cid: &str, error: impl Display) -> String {
    format!("Download ERROR: {name} CID: {cid} {error}")
}

pub(crate) fn download_not_found(cid: &str) -> String {
    format!("Download ERROR: CID {cid} not found")
}

pub(crate) fn config_load_failed(ffs_id: &str, error: impl Display) -> String {
    format!("Config ERROR: FFS {ffs_id} {error}")
}

pub(crate) fn config_changed(ffs_id: &str) -> String {
    format!("Changed default configuration for FFS {ffs_id}")
}

pub(crate) fn config_change_failed(ffs_id: &str, error: impl Display) -> String {
    format!("Config change ERROR: FFS {ffs_id} {error}")
}
