//! Typed storage configuration.
//!
//! The service may omit any part of the structure, down to whole subtrees, so
//! every field is optional. Lists use an empty `Vec` for "absent".

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageConfig {
    pub hot: Option<HotConfig>,
    pub cold: Option<ColdConfig>,
    pub repairable: Option<bool>,
}

/// IPFS (hot layer) settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HotConfig {
    pub enabled: Option<bool>,
    pub allow_unfreeze: Option<bool>,
    pub ipfs: Option<IpfsConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpfsConfig {
    /// Seconds to wait for content to be added to IPFS.
    pub add_timeout: Option<i64>,
}

/// Filecoin (cold layer) settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColdConfig {
    pub enabled: Option<bool>,
    pub filecoin: Option<FilecoinConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilecoinConfig {
    pub rep_factor: Option<i64>,
    /// Minimum deal duration, in epochs.
    pub deal_min_duration: Option<i64>,
    pub excluded_miners: Vec<String>,
    pub trusted_miners: Vec<String>,
    pub country_codes: Vec<String>,
    pub renew: Option<RenewConfig>,
    /// Wallet address paying for deals.
    pub addr: Option<String>,
    pub max_price: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenewConfig {
    pub enabled: Option<bool>,
    pub threshold: Option<i64>,
}
