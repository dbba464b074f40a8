//! Per-profile storage configuration, flattened for editing.
//!
//! The service stores a nested [`StorageConfig`] where any part may be
//! missing. Editing happens on a flat set of scalars instead, so the two
//! directions are spelled out here once:
//!
//! - [`ConfigView::from`] is total: booleans default to `false` (except
//!   `repairable`, which defaults to `true`), numbers to `0`, lists to empty.
//! - [`ConfigForm::into_storage_config`] rebuilds every subtree, splitting
//!   list fields on commas.
//!
//! List entries cannot contain commas; there is no escaping.

use crate::Context;
use crate::error::{ErrorKind, Result};
use crate::events;
use crate::profiles::{creation_failed, ensure_default};
use ffsgate_powergate::{ColdConfig, FilecoinConfig, HotConfig, IpfsConfig, RenewConfig, StorageConfig};
use ffsgate_store::Ffs;
use tracing::instrument;

/// Flat, fully populated view of a profile's storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigView {
    pub hot_enabled: bool,
    pub allow_unfreeze: bool,
    pub add_timeout: i64,
    pub cold_enabled: bool,
    pub rep_factor: i64,
    pub deal_min_duration: i64,
    pub excluded_miners: String,
    pub trusted_miners: String,
    pub country_codes: String,
    pub renew_enabled: bool,
    pub renew_threshold: i64,
    /// Wallet paying for deals. The service always sets one; `None` means the
    /// configuration is incomplete and cannot be saved back.
    pub wallet_address: Option<String>,
    pub max_price: u64,
    pub repairable: bool,
}

impl From<&StorageConfig> for ConfigView {
    fn from(config: &StorageConfig) -> Self {
        let hot = config.hot.clone().unwrap_or_default();
        let ipfs = hot.ipfs.unwrap_or_default();
        let cold = config.cold.clone().unwrap_or_default();
        let filecoin = cold.filecoin.unwrap_or_default();
        let renew = filecoin.renew.unwrap_or_default();
        Self {
            hot_enabled: hot.enabled.unwrap_or(false),
            allow_unfreeze: hot.allow_unfreeze.unwrap_or(false),
            add_timeout: ipfs.add_timeout.unwrap_or(0),
            cold_enabled: cold.enabled.unwrap_or(false),
            rep_factor: filecoin.rep_factor.unwrap_or(0),
            deal_min_duration: filecoin.deal_min_duration.unwrap_or(0),
            excluded_miners: join_list(&filecoin.excluded_miners),
            trusted_miners: join_list(&filecoin.trusted_miners),
            country_codes: join_list(&filecoin.country_codes),
            renew_enabled: renew.enabled.unwrap_or(false),
            renew_threshold: renew.threshold.unwrap_or(0),
            wallet_address: filecoin.addr,
            max_price: filecoin.max_price.unwrap_or(0),
            repairable: config.repairable.unwrap_or(true),
        }
    }
}

/// Edited configuration as submitted by the user.
///
/// The wallet address is not part of the form; it travels separately and is
/// written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigForm {
    /// Make this profile the default one before applying the configuration.
    pub make_default: bool,
    pub hot_enabled: bool,
    pub allow_unfreeze: bool,
    pub add_timeout: i64,
    pub cold_enabled: bool,
    pub rep_factor: i64,
    pub deal_min_duration: i64,
    pub excluded_miners: String,
    pub trusted_miners: String,
    pub country_codes: String,
    pub renew_enabled: bool,
    pub renew_threshold: i64,
    pub max_price: u64,
    pub repairable: bool,
}

impl ConfigForm {
    /// Pre-fill a form from the current configuration.
    pub fn from_view(view: &ConfigView, make_default: bool) -> Self {
        Self {
            make_default,
            hot_enabled: view.hot_enabled,
            allow_unfreeze: view.allow_unfreeze,
            add_timeout: view.add_timeout,
            cold_enabled: view.cold_enabled,
            rep_factor: view.rep_factor,
            deal_min_duration: view.deal_min_duration,
            excluded_miners: view.excluded_miners.clone(),
            trusted_miners: view.trusted_miners.clone(),
            country_codes: view.country_codes.clone(),
            renew_enabled: view.renew_enabled,
            renew_threshold: view.renew_threshold,
            max_price: view.max_price,
            repairable: view.repairable,
        }
    }

    pub fn into_storage_config(self, wallet: &str) -> StorageConfig {
        StorageConfig {
            hot: Some(HotConfig {
                enabled: Some(self.hot_enabled),
                allow_unfreeze: Some(self.allow_unfreeze),
                ipfs: Some(IpfsConfig { add_timeout: Some(self.add_timeout) }),
            }),
            cold: Some(ColdConfig {
                enabled: Some(self.cold_enabled),
                filecoin: Some(FilecoinConfig {
                    rep_factor: Some(self.rep_factor),
                    deal_min_duration: Some(self.deal_min_duration),
                    excluded_miners: split_list(&self.excluded_miners),
                    trusted_miners: split_list(&self.trusted_miners),
                    country_codes: split_list(&self.country_codes),
                    renew: Some(RenewConfig {
                        enabled: Some(self.renew_enabled),
                        threshold: Some(self.renew_threshold),
                    }),
                    addr: Some(wallet.to_string()),
                    max_price: Some(self.max_price),
                }),
            }),
            repairable: Some(self.repairable),
        }
    }
}

/// Result of reading a profile's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLoad {
    Loaded { ffs: Ffs, view: ConfigView },
    /// The service could not be asked; carries a notice for the user. The
    /// failure has been logged.
    Failed(String),
}

/// Result of trying to apply an edited configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigChange {
    Applied,
    /// The service refused or could not be reached; carries a notice for the
    /// user. The failure has been logged.
    Failed(String),
}

fn join_list(items: &[String]) -> String {
    items.join(",")
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty()).map(str::to_string).collect()
}

/// Load the configuration of a profile, or of the default profile.
///
/// With no identifier and no default profile yet, this provisions one (see
/// [`ensure_default`]), so a read of the configuration page may create a
/// profile. An unknown identifier is [`ErrorKind::NotFound`]; a service
/// failure, in either step, is logged and returned as [`ConfigLoad::Failed`].
#[instrument(skip(ctx))]
pub async fn load_config(ctx: &Context, ffs_id: Option<&str>) -> Result<ConfigLoad> {
    let ffs = match ffs_id {
        Some(ffs_id) => find(ctx, ffs_id).await?,
        None => match ensure_default(ctx).await {
            Ok(ffs) => ffs,
            Err(e) if e.is_reportable() => return Ok(ConfigLoad::Failed(creation_failed(ctx, &e).await?)),
            Err(e) => return Err(e),
        },
    };
    match ctx.backend.default_config(&ffs.token).await {
        Ok(config) => {
            let view = ConfigView::from(&config);
            Ok(ConfigLoad::Loaded { ffs, view })
        },
        Err(e) => {
            let detail = (*e).to_string();
            tracing::warn!(ffs_id = %ffs.ffs_id, error = %detail, "could not load config");
            ctx.store
                .append_log(events::config_load_failed(&ffs.ffs_id, &detail))
                .await
                .map_err(ErrorKind::store)?;
            Ok(ConfigLoad::Failed(format!("Configuration of FFS {} could not be loaded. {detail}", ffs.ffs_id)))
        },
    }
}

/// Apply an edited configuration to a profile.
///
/// The default flag is switched first, and stays switched even if the
/// service then refuses the configuration. A refusal is logged and returned
/// as [`ConfigChange::Failed`]; only local failures are errors.
#[instrument(skip(ctx, form))]
pub async fn save_config(ctx: &Context, ffs_id: &str, wallet: &str, form: ConfigForm) -> Result<ConfigChange> {
    let ffs = find(ctx, ffs_id).await?;
    if form.make_default && !ffs.is_default {
        let _guard = ctx.provisioning.lock().await;
        ctx.store.set_default(&ffs.ffs_id).await.map_err(ErrorKind::store)?;
        tracing::info!(ffs_id, "switched default FFS");
    }
    let config = form.into_storage_config(wallet);
    match ctx.backend.set_default_config(&ffs.token, config).await {
        Ok(()) => {
            ctx.store.append_log(events::config_changed(ffs_id)).await.map_err(ErrorKind::store)?;
            Ok(ConfigChange::Applied)
        },
        Err(e) => {
            let detail = (*e).to_string();
            tracing::warn!(ffs_id, error = %detail, "config change failed");
            ctx.store
                .append_log(events::config_change_failed(ffs_id, &detail))
                .await
                .map_err(ErrorKind::store)?;
            Ok(ConfigChange::Failed(format!("Configuration of FFS {ffs_id} could not be changed. {detail}")))
        },
    }
}

async fn find(ctx: &Context, ffs_id: &str) -> Result<Ffs> {
    match ctx.store.ffs_by_ffs_id(ffs_id).await.map_err(ErrorKind::store)? {
        Some(ffs) => Ok(ffs),
        None => exn::bail!(ErrorKind::NotFound(ffs_id.to_string())),
    }
}
