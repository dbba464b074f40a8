//! Wire messages for the Powergate `ffs.rpc` and `wallet.rpc` services.
//!
//! Scalar fields are declared `optional` so that an omitted value stays
//! distinguishable from a zero value once decoded.

use crate::config;
use prost::bytes::Bytes;

pub(super) const FFS_SERVICE: &str = "ffs.rpc.RPCService";
pub(super) const WALLET_SERVICE: &str = "wallet.rpc.RPCService";

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateResponse {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub token: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AddrsListRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AddrsListResponse {
    #[prost(message, repeated, tag = "1")]
    pub addrs: Vec<AddrInfo>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AddrInfo {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub addr: String,
    #[prost(string, tag = "3")]
    pub r#type: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BalanceRequest {
    #[prost(string, tag = "1")]
    pub address: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BalanceResponse {
    #[prost(uint64, tag = "1")]
    pub balance: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StageRequest {
    #[prost(bytes = "bytes", tag = "1")]
    pub chunk: Bytes,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StageResponse {
    #[prost(string, tag = "1")]
    pub cid: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PushStorageConfigRequest {
    #[prost(string, tag = "1")]
    pub cid: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PushStorageConfigResponse {
    #[prost(string, tag = "1")]
    pub job_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetRequest {
    #[prost(string, tag = "1")]
    pub cid: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetResponse {
    #[prost(bytes = "bytes", tag = "1")]
    pub chunk: Bytes,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DefaultStorageConfigRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DefaultStorageConfigResponse {
    #[prost(message, optional, tag = "1")]
    pub default_storage_config: Option<StorageConfig>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SetDefaultStorageConfigRequest {
    #[prost(message, optional, tag = "1")]
    pub config: Option<StorageConfig>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SetDefaultStorageConfigResponse {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StorageConfig {
    #[prost(message, optional, tag = "1")]
    pub hot: Option<HotConfig>,
    #[prost(message, optional, tag = "2")]
    pub cold: Option<ColdConfig>,
    #[prost(bool, optional, tag = "3")]
    pub repairable: Option<bool>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct HotConfig {
    #[prost(bool, optional, tag = "1")]
    pub enabled: Option<bool>,
    #[prost(bool, optional, tag = "2")]
    pub allow_unfreeze: Option<bool>,
    #[prost(message, optional, tag = "3")]
    pub ipfs: Option<IpfsConfig>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IpfsConfig {
    #[prost(int64, optional, tag = "1")]
    pub add_timeout: Option<i64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ColdConfig {
    #[prost(bool, optional, tag = "1")]
    pub enabled: Option<bool>,
    #[prost(message, optional, tag = "2")]
    pub filecoin: Option<FilConfig>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FilConfig {
    #[prost(int64, optional, tag = "1")]
    pub rep_factor: Option<i64>,
    #[prost(int64, optional, tag = "2")]
    pub deal_min_duration: Option<i64>,
    #[prost(string, repeated, tag = "3")]
    pub excluded_miners: Vec<String>,
    #[prost(string, repeated, tag = "4")]
    pub trusted_miners: Vec<String>,
    #[prost(string, repeated, tag = "5")]
    pub country_codes: Vec<String>,
    #[prost(message, optional, tag = "6")]
    pub renew: Option<FilRenew>,
    #[prost(string, optional, tag = "7")]
    pub addr: Option<String>,
    #[prost(uint64, optional, tag = "8")]
    pub max_price: Option<u64>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FilRenew {
    #[prost(bool, optional, tag = "1")]
    pub enabled: Option<bool>,
    #[prost(int64, optional, tag = "2")]
    pub threshold: Option<i64>,
}

// Wire <-> domain. Both sides have the same shape, so these are plain moves.

impl From<StorageConfig> for config::StorageConfig {
    fn from(wire: StorageConfig) -> Self {
        Self {
            hot: wire.hot.map(|hot| config::HotConfig {
                enabled: hot.enabled,
                allow_unfreeze: hot.allow_unfreeze,
                ipfs: hot.ipfs.map(|ipfs| config::IpfsConfig { add_timeout: ipfs.add_timeout }),
            }),
            cold: wire.cold.map(|cold| config::ColdConfig {
                enabled: cold.enabled,
                filecoin: cold.filecoin.map(|fil| config::FilecoinConfig {
                    rep_factor: fil.rep_factor,
                    deal_min_duration: fil.deal_min_duration,
                    excluded_miners: fil.excluded_miners,
                    trusted_miners: fil.trusted_miners,
                    country_codes: fil.country_codes,
                    renew: fil.renew.map(|renew| config::RenewConfig {
                        enabled: renew.enabled,
                        threshold: renew.threshold,
                    }),
                    addr: fil.addr,
                    max_price: fil.max_price,
                }),
            }),
            repairable: wire.repairable,
        }
    }
}

impl From<config::StorageConfig> for StorageConfig {
    fn from(config: config::StorageConfig) -> Self {
        Self {
            hot: config.hot.map(|hot| HotConfig {
                enabled: hot.enabled,
                allow_unfreeze: hot.allow_unfreeze,
                ipfs: hot.ipfs.map(|ipfs| IpfsConfig { add_timeout: ipfs.add_timeout }),
            }),
            cold: config.cold.map(|cold| ColdConfig {
                enabled: cold.enabled,
                filecoin: cold.filecoin.map(|fil| FilConfig {
                    rep_factor: fil.rep_factor,
                    deal_min_duration: fil.deal_min_duration,
                    excluded_miners: fil.excluded_miners,
                    trusted_miners: fil.trusted_miners,
                    country_codes: fil.country_codes,
                    renew: fil.renew.map(|renew| FilRenew {
                        enabled: renew.enabled,
                        threshold: renew.threshold,
                    }),
                    addr: fil.addr,
                    max_price: fil.max_price,
                }),
            }),
            repairable: config.repairable,
        }
    }
}
