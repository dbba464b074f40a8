//! ffsgate: store files on Filecoin through a Powergate node, from the browser.

mod cli;
mod error;
mod http;
mod logging;

use crate::cli::Cli;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use ffsgate_config::Config;
use ffsgate_powergate::{GrpcPowergate, PowergateHandle};
use ffsgate_store::{Database, Repository};
use ffsgate_workflow::Context;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            if err.is_retryable() {
                eprintln!("This may be temporary; trying again later could help.");
            }
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    cli.apply(&mut config);
    logging::init(&config.log.level)?;
    config.validate().or_raise(|| ErrorKind::Config)?;
    let listen = config.http.listen_addr().or_raise(|| ErrorKind::Config)?;
    let compression = config.storage.package_compression().or_raise(|| ErrorKind::Config)?;

    let db = Database::connect(&config.database.url).await.or_raise(|| ErrorKind::Database)?;
    let backend: PowergateHandle = Arc::new(
        GrpcPowergate::connect_lazy(
            &config.powergate.address,
            config.powergate.timeout(),
            config.powergate.transfer_timeout(),
        )
        .or_raise(|| ErrorKind::Powergate)?,
    );
    tracing::info!(powergate = %config.powergate.address, database = %config.database.url, "starting ffsgate");

    let ctx = Context::new(
        Repository::from(&db),
        backend,
        &config.storage.upload_dir,
        &config.storage.download_dir,
    )
    .with_package_compression(compression);
    let state = http::AppState::new(ctx, &config.http.secret_key)?;
    let listener = tokio::net::TcpListener::bind(listen).await.or_raise(|| ErrorKind::Server)?;
    let served = http::serve(listener, state).await;
    db.close().await;
    served
}
