//! Minimal gRPC client shared by both Powergate services.
//!
//! Written by hand instead of generated: the application needs a handful of
//! methods and the messages live in [`super::proto`].

use futures::Stream;
use http::uri::PathAndQuery;
use tonic::codec::{ProstCodec, Streaming};
use tonic::transport::Channel;
use tonic::{Code, Request, Response, Status};

#[derive(Debug, Clone)]
pub(super) struct RpcClient {
    inner: tonic::client::Grpc<Channel>,
    service: &'static str,
}

impl RpcClient {
    pub(super) fn new(channel: Channel, service: &'static str) -> Self {
        Self { inner: tonic::client::Grpc::new(channel), service }
    }

    fn path(&self, method: &str) -> Result<PathAndQuery, Status> {
        PathAndQuery::try_from(format!("/{}/{method}", self.service))
            .map_err(|e| Status::new(Code::Internal, format!("invalid method path: {e}")))
    }

    async fn ready(&mut self) -> Result<(), Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| Status::new(Code::Unavailable, format!("service not ready: {e}")))
    }

    pub(super) async fn unary<Req, Res>(&mut self, method: &str, request: Request<Req>) -> Result<Response<Res>, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Res: prost::Message + Default + Send + Sync + 'static,
    {
        self.ready().await?;
        let path = self.path(method)?;
        self.inner.unary(request, path, ProstCodec::default()).await
    }

    pub(super) async fn client_streaming<S, Req, Res>(
        &mut self,
        method: &str,
        request: Request<S>,
    ) -> Result<Response<Res>, Status>
    where
        S: Stream<Item = Req> + Send + 'static,
        Req: prost::Message + Send + Sync + 'static,
        Res: prost::Message + Default + Send + Sync + 'static,
    {
        self.ready().await?;
        let path = self.path(method)?;
        self.inner.client_streaming(request, path, ProstCodec::default()).await
    }

    pub(super) async fn server_streaming<Req, Res>(
        &mut self,
        method: &str,
        request: Request<Req>,
    ) -> Result<Response<Streaming<Res>>, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Res: prost::Message + Default + Send + Sync + 'static,
    {
        self.ready().await?;
        let path = self.path(method)?;
        self.inner.server_streaming(request, path, ProstCodec::default()).await
    }
}
