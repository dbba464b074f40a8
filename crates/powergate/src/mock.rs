//! In-memory Powergate for testing.

use crate::error::{ErrorKind, Result};
use crate::{Address, ByteStream, ChunkStream, Powergate, Profile, StorageConfig};
use async_trait::async_trait;
use bytes::Bytes;
use exn::ResultExt;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

const CHUNK_SIZE: usize = 16 * 1024;

struct MockProfile {
    id: String,
    address: String,
    config: StorageConfig,
}

#[derive(Default)]
struct MockState {
    /// Keyed by token.
    profiles: HashMap<String, MockProfile>,
    /// Staged content, keyed by CID.
    content: HashMap<String, Bytes>,
    pushed: Vec<String>,
}

/// In-memory Powergate for testing.
///
/// State lives behind a [`RwLock`], so all trait methods operate on `&self`.
/// CIDs are derived from the BLAKE3 hash of the content, so staging the same
/// bytes twice yields the same CID, just like the real service.
///
/// # Examples
///
/// ```
/// use ffsgate_powergate::{MockPowergate, Powergate};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let powergate = MockPowergate::default();
/// let profile = powergate.create().await?;
/// let addresses = powergate.addresses(&profile.token).await?;
/// assert_eq!(addresses.len(), 1);
///
/// powergate.set_unreachable(true);
/// assert!(powergate.create().await.is_err());
/// # Ok(())
/// # }
/// ```
pub struct MockPowergate {
    state: RwLock<MockState>,
    initial_config: StorageConfig,
    unreachable: AtomicBool,
    fail_push: AtomicBool,
    balance: Option<u64>,
    created: AtomicUsize,
    stage_calls: AtomicUsize,
}

impl MockPowergate {
    /// Use the given configuration as the default configuration of every
    /// profile created from now on.
    pub fn with_config(mut self, config: StorageConfig) -> Self {
        self.initial_config = config;
        self
    }

    /// Make every balance lookup fail.
    pub fn without_balance(mut self) -> Self {
        self.balance = None;
        self
    }

    /// Simulate the service going away (or coming back).
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Make pushes fail while staging keeps working.
    pub fn set_fail_push(&self, fail: bool) {
        self.fail_push.store(fail, Ordering::SeqCst);
    }

    /// Number of `stage` calls received, successful or not.
    pub fn stage_calls(&self) -> usize {
        self.stage_calls.load(Ordering::SeqCst)
    }

    /// Number of profiles created.
    pub fn profiles_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// CIDs pushed to "Filecoin", in order.
    pub async fn pushed(&self) -> Vec<String> {
        self.state.read().await.pushed.clone()
    }

    /// Content staged under a CID.
    pub async fn content(&self, cid: &str) -> Option<Bytes> {
        self.state.read().await.content.get(cid).cloned()
    }

    /// Remove staged content, as if it had been garbage collected remotely.
    pub async fn forget(&self, cid: &str) {
        self.state.write().await.content.remove(cid);
    }

    fn reachable(&self) -> Result<()> {
        match self.unreachable.load(Ordering::SeqCst) {
            true => Err(exn::Exn::from(ErrorKind::Unavailable)),
            false => Ok(()),
        }
    }

    async fn profile<T>(&self, token: &str, f: impl FnOnce(&mut MockProfile) -> T) -> Result<T> {
        self.reachable()?;
        let mut guard = self.state.write().await;
        let profile = guard.profiles.get_mut(token).ok_or_else(|| exn::Exn::from(ErrorKind::InvalidToken))?;
        Ok(f(profile))
    }
}

impl Default for MockPowergate {
    fn default() -> Self {
        Self {
            state: RwLock::new(MockState::default()),
            initial_config: StorageConfig::default(),
            unreachable: AtomicBool::new(false),
            fail_push: AtomicBool::new(false),
            balance: Some(4_000_000_000_000_000),
            created: AtomicUsize::new(0),
            stage_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Powergate for MockPowergate {
    async fn create(&self) -> Result<Profile> {
        self.reachable()?;
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        // Give concurrent callers a chance to interleave, as a network call would.
        tokio::task::yield_now().await;
        let profile = Profile { id: format!("ffs-{n:04}"), token: format!("token-{n:04}") };
        let mock = MockProfile {
            id: profile.id.clone(),
            address: format!("f3mockwallet{n:04}"),
            config: self.initial_config.clone(),
        };
        self.state.write().await.profiles.insert(profile.token.clone(), mock);
        Ok(profile)
    }

    async fn addresses(&self, token: &str) -> Result<Vec<Address>> {
        self.profile(token, |p| {
            vec![Address { name: "Initial Address".to_string(), address: p.address.clone(), kind: "bls".to_string() }]
        })
        .await
    }

    async fn balance(&self, address: &str) -> Result<u64> {
        self.reachable()?;
        let known = self.state.read().await.profiles.values().any(|p| p.address == address);
        match (known, self.balance) {
            (true, Some(balance)) => Ok(balance),
            (false, _) => exn::bail!(ErrorKind::Backend(format!("unknown address {address}"))),
            (true, None) => exn::bail!(ErrorKind::Backend("balance lookup disabled".to_string())),
        }
    }

    async fn stage(&self, token: &str, mut data: ByteStream) -> Result<String> {
        self.stage_calls.fetch_add(1, Ordering::SeqCst);
        let owner = self.profile(token, |p| p.id.clone()).await?;
        let mut content = Vec::new();
        while let Some(chunk) = data.next().await {
            match chunk {
                Ok(chunk) => content.extend_from_slice(&chunk),
                Err(e) => return Err(e).or_raise(|| ErrorKind::Staging),
            }
        }
        let cid = format!("bafk{}", blake3::hash(&content).to_hex());
        tracing::debug!(ffs = %owner, cid = %cid, size = content.len(), "mock staged content");
        self.state.write().await.content.insert(cid.clone(), Bytes::from(content));
        Ok(cid)
    }

    async fn push(&self, token: &str, cid: &str) -> Result<String> {
        self.profile(token, |_| ()).await?;
        if self.fail_push.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Backend("deal proposal rejected".to_string()));
        }
        let mut guard = self.state.write().await;
        if !guard.content.contains_key(cid) {
            exn::bail!(ErrorKind::Backend(format!("{cid} is not staged")));
        }
        guard.pushed.push(cid.to_string());
        Ok(format!("job-{}", guard.pushed.len()))
    }

    async fn get(&self, token: &str, cid: &str) -> Result<ChunkStream> {
        self.profile(token, |_| ()).await?;
        let content = self.state.read().await.content.get(cid).cloned();
        let Some(content) = content else {
            exn::bail!(ErrorKind::Backend(format!("{cid} not found")));
        };
        let chunks: Vec<Result<Bytes>> = content
            .chunks(CHUNK_SIZE)
            .map(|chunk| Ok(content.slice_ref(chunk)))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn default_config(&self, token: &str) -> Result<StorageConfig> {
        self.profile(token, |p| p.config.clone()).await
    }

    async fn set_default_config(&self, token: &str, config: StorageConfig) -> Result<()> {
        self.profile(token, |p| p.config = config).await
    }
}
