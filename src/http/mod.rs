//! The web interface.

pub mod error;
mod files;
mod notice;
mod pages;
mod profiles;

use crate::error::{ErrorKind, Result};
use crate::http::pages::Pages;
use axum::Router;
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::routing::{get, post};
use axum_extra::extract::cookie::Key;
use exn::ResultExt;
use ffsgate_workflow::Context;
use std::sync::Arc;
use time::UtcDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Largest request body accepted by the upload form.
const MAX_UPLOAD_BYTES: u64 = 4 * 1024 * 1024 * 1024;
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    ctx: Arc<Context>,
    pages: Arc<Pages>,
    key: Key,
}

impl AppState {
    pub fn new(ctx: Context, secret_key: &str) -> Result<Self> {
        Ok(Self {
            ctx: Arc::new(ctx),
            pages: Arc::new(Pages::load()?),
            key: notice::signing_key(secret_key),
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(files::list))
        .route("/files", get(files::list).post(files::upload))
        .route("/download/:cid", get(files::download))
        .route("/wallets", get(profiles::wallets))
        .route("/logs", get(files::logs))
        .route("/config", get(profiles::show_default))
        .route("/config/:ffs_id", get(profiles::show))
        .route("/new_ffs", post(profiles::new_ffs))
        .route("/change_config/:ffs_id/:wallet", post(profiles::change_config))
        .layer(DefaultBodyLimit::max(upload_limit()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Capped at what the platform can address.
fn upload_limit() -> usize {
    usize::try_from(MAX_UPLOAD_BYTES).unwrap_or(usize::MAX)
}

/// Serve until Ctrl-C (or SIGTERM on Unix) is received.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Listening on http://{addr}");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .or_raise(|| ErrorKind::Server)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::warn!(error = %e, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutting down");
}

fn timestamp(at: UtcDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).unwrap_or_else(|_| at.to_string())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Response};
    use ffsgate_powergate::{MockPowergate, PowergateHandle};
    use ffsgate_store::{Database, Repository};
    use tower::ServiceExt;

    pub(crate) struct TestApp {
        pub state: AppState,
        pub mock: Arc<MockPowergate>,
        pub _dir: tempfile::TempDir,
    }

    impl TestApp {
        pub(crate) async fn new() -> Self {
            Self::with_mock(MockPowergate::default()).await
        }

        pub(crate) async fn with_mock(mock: MockPowergate) -> Self {
            let db = Database::connect_in_memory().await.unwrap();
            let dir = tempfile::tempdir().unwrap();
            let mock = Arc::new(mock);
            let backend: PowergateHandle = mock.clone();
            let ctx = Context::new(
                Repository::from(&db),
                backend,
                dir.path().join("_uploads"),
                dir.path().join("_downloads"),
            );
            let state = AppState::new(ctx, "test secret").unwrap();
            Self { state, mock, _dir: dir }
        }

        pub(crate) fn ctx(&self) -> &Context {
            &self.state.ctx
        }

        pub(crate) async fn send(&self, request: Request<Body>) -> Response<Body> {
            router(self.state.clone()).oneshot(request).await.unwrap()
        }

        pub(crate) async fn get(&self, uri: &str) -> Response<Body> {
            self.send(Request::get(uri).body(Body::empty()).unwrap()).await
        }
    }

    pub(crate) async fn body_text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }
}
