//! Filecoin FileSystem (FFS) profiles and their wallets.

use crate::Context;
use crate::error::{Error, ErrorKind, Result};
use crate::events;
use exn::OptionExt;
use ffsgate_store::{Ffs, NewFfs};
use time::UtcDateTime;
use tracing::instrument;

/// One wallet address of one profile, as shown on the wallets page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletView {
    pub ffs_id: String,
    pub name: String,
    pub address: String,
    pub kind: String,
    /// `None` when the balance could not be looked up.
    pub balance: Option<u64>,
}

/// Outcome of asking for a new profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileCreation {
    Created(Ffs),
    /// The service could not create it. The failure has been logged; the
    /// notice is meant for the user.
    Failed(String),
}

/// Wallets of every profile the service could answer for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletListing {
    pub wallets: Vec<WalletView>,
    /// One logged notice per profile whose wallets could not be listed.
    pub notices: Vec<String>,
}

/// Return the default profile, creating it first if there is none.
///
/// Creating the default profile is the one write hidden behind reads (the
/// upload path and the configuration page both call this). Concurrent callers
/// are serialized, so at most one profile is ever created, and a second call
/// creates and logs nothing.
#[instrument(skip_all)]
pub async fn ensure_default(ctx: &Context) -> Result<Ffs> {
    if let Some(ffs) = ctx.store.default_ffs().await.map_err(ErrorKind::store)? {
        return Ok(ffs);
    }
    let _guard = ctx.provisioning.lock().await;
    // Someone else may have finished provisioning while we waited.
    if let Some(ffs) = ctx.store.default_ffs().await.map_err(ErrorKind::store)? {
        return Ok(ffs);
    }
    tracing::info!("no default FFS yet, creating one");
    provision(ctx, true).await
}

/// Create a new profile, optionally taking over the default flag.
#[instrument(skip(ctx))]
pub async fn create_profile(ctx: &Context, make_default: bool) -> Result<ProfileCreation> {
    let _guard = ctx.provisioning.lock().await;
    match provision(ctx, make_default).await {
        Ok(ffs) => Ok(ProfileCreation::Created(ffs)),
        Err(e) if e.is_reportable() => Ok(ProfileCreation::Failed(creation_failed(ctx, &e).await?)),
        Err(e) => Err(e),
    }
}

/// Log a failed provisioning attempt and phrase it for the user.
pub(crate) async fn creation_failed(ctx: &Context, err: &Error) -> Result<String> {
    let detail = (**err).to_string();
    tracing::warn!(error = %detail, "could not create FFS");
    ctx.store.append_log(events::ffs_create_failed(&detail)).await.map_err(ErrorKind::store)?;
    Ok(format!("A new Filecoin FileSystem could not be created. {detail}"))
}

/// Create a profile remotely, then record it and its announcement events in
/// one transaction. Callers must hold the provisioning lock.
async fn provision(ctx: &Context, is_default: bool) -> Result<Ffs> {
    let profile = ctx.backend.create().await.map_err(ErrorKind::backend)?;
    let addresses = ctx.backend.addresses(&profile.token).await.map_err(ErrorKind::backend)?;
    let wallet = addresses
        .first()
        .ok_or_raise(|| ErrorKind::Backend(format!("FFS {} has no wallet address", profile.id)))?;
    let events = [events::ffs_created(&profile.id), events::wallet_created(&wallet.address)];
    let new = NewFfs {
        ffs_id: profile.id,
        token: profile.token,
        created_at: UtcDateTime::now(),
        is_default,
    };
    let ffs = ctx.store.insert_ffs(&new, &events).await.map_err(ErrorKind::store)?;
    tracing::info!(ffs_id = %ffs.ffs_id, is_default, "created FFS");
    Ok(ffs)
}

/// List the wallet addresses of every profile, default profile first.
///
/// A failed balance lookup is not an error; the balance is simply unknown.
/// A profile whose addresses cannot be listed is logged and skipped.
#[instrument(skip_all)]
pub async fn list_wallets(ctx: &Context) -> Result<WalletListing> {
    let mut listing = WalletListing::default();
    for ffs in ctx.store.list_ffs().await.map_err(ErrorKind::store)? {
        let addresses = match ctx.backend.addresses(&ffs.token).await {
            Ok(addresses) => addresses,
            Err(e) => {
                let detail = (*e).to_string();
                tracing::warn!(ffs_id = %ffs.ffs_id, error = %detail, "could not list wallets");
                ctx.store
                    .append_log(events::wallets_failed(&ffs.ffs_id, &detail))
                    .await
                    .map_err(ErrorKind::store)?;
                listing.notices.push(format!("Wallets of FFS {} could not be listed. {detail}", ffs.ffs_id));
                continue;
            },
        };
        for address in addresses {
            let balance = match ctx.backend.balance(&address.address).await {
                Ok(balance) => Some(balance),
                Err(e) => {
                    tracing::warn!(address = %address.address, error = %*e, "balance lookup failed");
                    None
                },
            };
            listing.wallets.push(WalletView {
                ffs_id: ffs.ffs_id.clone(),
                name: address.name,
                address: address.address,
                kind: address.kind,
                balance,
            });
        }
    }
    Ok(listing)
}
