use clap::Parser;
use ffsgate_config::Config;
use std::path::PathBuf;

/// Store files on Filecoin through a Powergate node, from your browser.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON). Defaults to `ffsgate.toml`
    /// in the platform configuration directory, if present.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address (`host:port`) of the Powergate API.
    #[arg(short, long = "powergate-addr", value_name = "ADDR")]
    pub powergate: Option<String>,

    /// Directory uploads are staged in before being sent to Filecoin.
    #[arg(short, long, value_name = "DIR")]
    pub upload: Option<PathBuf>,

    /// Directory files retrieved from Filecoin are written to.
    #[arg(short, long, value_name = "DIR")]
    pub download: Option<PathBuf>,

    /// SQLite database URL, e.g. `sqlite://ffsgate.db`.
    #[arg(long, value_name = "URL")]
    pub database: Option<String>,

    /// Address (`ip:port`) to serve the web interface on.
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Log debug output (ignored when `RUST_LOG` is set).
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(address) = &self.powergate {
            config.powergate.address = address.clone();
        }
        if let Some(dir) = &self.upload {
            config.storage.upload_dir = dir.clone();
        }
        if let Some(dir) = &self.download {
            config.storage.download_dir = dir.clone();
        }
        if let Some(url) = &self.database {
            config.database.url = url.clone();
        }
        if let Some(listen) = &self.listen {
            config.http.listen = listen.clone();
        }
        if self.verbose {
            config.log.level = "debug".to_string();
        }
    }
}
