//! Client adapter for the Powergate Filecoin storage service.
//!
//! Everything non-trivial (content addressing, IPFS staging, Filecoin deal
//! making, wallets) happens on the remote side. This crate only describes the
//! calls the application needs, behind the [`Powergate`] trait, and provides
//! a gRPC implementation plus an in-memory mock for tests.

mod config;
pub mod error;
mod grpc;
#[cfg(feature = "mock")]
mod mock;

pub use crate::config::{ColdConfig, FilecoinConfig, HotConfig, IpfsConfig, RenewConfig, StorageConfig};
pub use crate::grpc::GrpcPowergate;
#[cfg(feature = "mock")]
pub use crate::mock::MockPowergate;
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// Outgoing content, read lazily from wherever the caller keeps it.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + 'static>>;
/// Incoming content, one chunk at a time as the service produces it.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send + 'static>>;

pub type PowergateHandle = Arc<dyn Powergate + Send + Sync>;

/// Identity of a newly created Filecoin FileSystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub token: String,
}

/// A wallet address belonging to a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub name: String,
    pub address: String,
    /// Key type, e.g. `bls` or `secp256k1`.
    pub kind: String,
}

/// Calls the application makes against the storage service.
///
/// All profile-scoped calls take the profile's auth token. Implementations
/// bound every call with a timeout and report it as
/// [`Unavailable`](crate::error::ErrorKind::Unavailable); nothing is retried.
#[async_trait]
pub trait Powergate: Send + Sync {
    /// Create a new Filecoin FileSystem, with its own default wallet.
    async fn create(&self) -> Result<Profile>;

    /// List the wallet addresses of a profile, default wallet first.
    async fn addresses(&self, token: &str) -> Result<Vec<Address>>;

    /// Look up a wallet balance.
    ///
    /// Purely informational; callers are expected to cope without it.
    async fn balance(&self, address: &str) -> Result<u64>;

    /// Add content to the hot storage layer, returning its CID.
    ///
    /// The content is streamed as-is; if the stream itself fails the call
    /// fails with [`Staging`](crate::error::ErrorKind::Staging) even if the
    /// service accepted the partial upload.
    async fn stage(&self, token: &str, data: ByteStream) -> Result<String>;

    /// Apply the profile's default storage configuration to staged content,
    /// returning the identifier of the job that stores it on Filecoin.
    async fn push(&self, token: &str, cid: &str) -> Result<String>;

    /// Retrieve content by CID.
    ///
    /// Only the first response is awaited here; errors (and timeouts) while
    /// reading further chunks surface through the stream.
    async fn get(&self, token: &str, cid: &str) -> Result<ChunkStream>;

    /// Fetch the default storage configuration of a profile.
    async fn default_config(&self, token: &str) -> Result<StorageConfig>;

    /// Replace the default storage configuration of a profile.
    async fn set_default_config(&self, token: &str, config: StorageConfig) -> Result<()>;
}
