//! gRPC implementation of [`Powergate`].

mod client;
mod proto;

use self::client::RpcClient;
use crate::error::{ErrorKind, Result};
use crate::{Address, ByteStream, ChunkStream, Powergate, Profile, StorageConfig};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use futures::StreamExt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::Endpoint;
use tonic::{Request, Status};
use tracing::instrument;

const TOKEN_HEADER: &str = "x-ffs-token";

/// Await a call for at most `limit`, classifying both the timeout and any
/// returned status.
async fn bounded<T>(limit: Duration, call: impl Future<Output = std::result::Result<T, Status>>) -> Result<T> {
    let outcome = tokio::time::timeout(limit, call).await.or_raise(|| ErrorKind::Unavailable)?;
    match outcome {
        Ok(value) => Ok(value),
        Err(status) => {
            let kind = ErrorKind::from_status(&status);
            Err(status).or_raise(|| kind)
        },
    }
}

/// Powergate client talking to a real service over gRPC.
///
/// The channel connects lazily, so constructing this never touches the
/// network; an unreachable service shows up as
/// [`Unavailable`](ErrorKind::Unavailable) on the first call instead.
#[derive(Debug, Clone)]
pub struct GrpcPowergate {
    ffs: RpcClient,
    wallet: RpcClient,
    timeout: Duration,
    transfer_timeout: Duration,
}

impl GrpcPowergate {
    /// Prepare a client for the service at `address` (`host:port`, or a full
    /// `http://` URI).
    ///
    /// `timeout` bounds unary calls; `transfer_timeout` bounds staging as a
    /// whole and each chunk of a retrieval.
    pub fn connect_lazy(address: &str, timeout: Duration, transfer_timeout: Duration) -> Result<Self> {
        let uri = match address.contains("://") {
            true => address.to_string(),
            false => format!("http://{address}"),
        };
        let channel = Endpoint::from_shared(uri)
            .or_raise(|| ErrorKind::Backend(format!("invalid address: {address}")))?
            .connect_timeout(timeout)
            .connect_lazy();
        tracing::debug!(address, "prepared Powergate channel");
        Ok(Self {
            ffs: RpcClient::new(channel.clone(), proto::FFS_SERVICE),
            wallet: RpcClient::new(channel, proto::WALLET_SERVICE),
            timeout,
            transfer_timeout,
        })
    }

    fn authorized<T>(token: &str, message: T) -> Result<Request<T>> {
        let value = AsciiMetadataValue::try_from(token).or_raise(|| ErrorKind::InvalidToken)?;
        let mut request = Request::new(message);
        request.metadata_mut().insert(TOKEN_HEADER, value);
        Ok(request)
    }
}

#[async_trait]
impl Powergate for GrpcPowergate {
    #[instrument(skip(self))]
    async fn create(&self) -> Result<Profile> {
        let mut client = self.ffs.clone();
        let request = Request::new(proto::CreateRequest {});
        let response: proto::CreateResponse = bounded(self.timeout, client.unary("Create", request))
            .await?
            .into_inner();
        if response.id.is_empty() || response.token.is_empty() {
            exn::bail!(ErrorKind::Backend("create returned an empty identity".to_string()));
        }
        Ok(Profile { id: response.id, token: response.token })
    }

    #[instrument(skip_all)]
    async fn addresses(&self, token: &str) -> Result<Vec<Address>> {
        let mut client = self.ffs.clone();
        let request = Self::authorized(token, proto::AddrsListRequest {})?;
        let response: proto::AddrsListResponse = bounded(self.timeout, client.unary("AddrsList", request))
            .await?
            .into_inner();
        Ok(response
            .addrs
            .into_iter()
            .map(|info| Address { name: info.name, address: info.addr, kind: info.r#type })
            .collect())
    }

    #[instrument(skip(self))]
    async fn balance(&self, address: &str) -> Result<u64> {
        let mut client = self.wallet.clone();
        let request = Request::new(proto::BalanceRequest { address: address.to_string() });
        let response: proto::BalanceResponse = bounded(self.timeout, client.unary("Balance", request))
            .await?
            .into_inner();
        Ok(response.balance)
    }

    #[instrument(skip_all)]
    async fn stage(&self, token: &str, data: ByteStream) -> Result<String> {
        let mut client = self.ffs.clone();
        // The request stream cannot carry an error, so a local read failure
        // ends it early and is reported once the call returns.
        let failure: Arc<Mutex<Option<std::io::Error>>> = Arc::default();
        let slot = Arc::clone(&failure);
        let chunks = stream! {
            let mut data = data;
            while let Some(chunk) = data.next().await {
                match chunk {
                    Ok(chunk) => yield proto::StageRequest { chunk },
                    Err(e) => {
                        if let Ok(mut slot) = slot.lock() {
                            *slot = Some(e);
                        }
                        break;
                    },
                }
            }
        };
        let request = Self::authorized(token, chunks)?;
        let call = client.client_streaming::<_, _, proto::StageResponse>("Stage", request);
        let outcome = bounded(self.transfer_timeout, call).await;
        if let Some(e) = failure.lock().ok().and_then(|mut slot| slot.take()) {
            return Err(e).or_raise(|| ErrorKind::Staging);
        }
        let response: proto::StageResponse = outcome.or_raise(|| ErrorKind::Staging)?.into_inner();
        if response.cid.is_empty() {
            exn::bail!(ErrorKind::Staging);
        }
        Ok(response.cid)
    }

    #[instrument(skip(self, token))]
    async fn push(&self, token: &str, cid: &str) -> Result<String> {
        let mut client = self.ffs.clone();
        let request = Self::authorized(token, proto::PushStorageConfigRequest { cid: cid.to_string() })?;
        let response: proto::PushStorageConfigResponse =
            bounded(self.timeout, client.unary("PushStorageConfig", request)).await?.into_inner();
        Ok(response.job_id)
    }

    #[instrument(skip(self, token))]
    async fn get(&self, token: &str, cid: &str) -> Result<ChunkStream> {
        let mut client = self.ffs.clone();
        let request = Self::authorized(token, proto::GetRequest { cid: cid.to_string() })?;
        let call = client.server_streaming::<_, proto::GetResponse>("Get", request);
        let mut responses = bounded(self.transfer_timeout, call).await?.into_inner();
        let limit = self.transfer_timeout;
        Ok(Box::pin(stream! {
            loop {
                match bounded(limit, responses.message()).await {
                    Ok(Some(response)) => yield Ok(response.chunk),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    },
                }
            }
        }))
    }

    #[instrument(skip_all)]
    async fn default_config(&self, token: &str) -> Result<StorageConfig> {
        let mut client = self.ffs.clone();
        let request = Self::authorized(token, proto::DefaultStorageConfigRequest {})?;
        let response: proto::DefaultStorageConfigResponse =
            bounded(self.timeout, client.unary("DefaultStorageConfig", request)).await?.into_inner();
        Ok(response.default_storage_config.map(StorageConfig::from).unwrap_or_default())
    }

    #[instrument(skip_all)]
    async fn set_default_config(&self, token: &str, config: StorageConfig) -> Result<()> {
        let mut client = self.ffs.clone();
        let request = Self::authorized(token, proto::SetDefaultStorageConfigRequest { config: Some(config.into()) })?;
        let _: proto::SetDefaultStorageConfigResponse =
            bounded(self.timeout, client.unary("SetDefaultStorageConfig", request)).await?.into_inner();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        // Nothing listens on the discard port; the lazy channel fails on first use.
        let powergate =
            GrpcPowergate::connect_lazy("127.0.0.1:9", Duration::from_millis(500), Duration::from_millis(500)).unwrap();
        let err = powergate.create().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unavailable), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_token_must_be_ascii_metadata() {
        let err = GrpcPowergate::authorized("bad\ntoken", ()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidToken));
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        let err = GrpcPowergate::connect_lazy("http://[::1", Duration::from_secs(1), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Backend(_)));
    }
}
