//! Diagnostic logging, powered by tracing-subscriber.
//!
//! This is unrelated to the event log kept in the database, which records
//! what happened to users' files and profiles.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Dependencies that are far too chatty at `debug`.
const QUIET_TARGETS: &[(&str, &str)] = &[("h2", "warn"), ("hyper", "warn"), ("sqlx", "warn"), ("tower", "warn")];

/// Build the filter from `RUST_LOG` if set, otherwise from `level`.
fn env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = std::iter::once(level.to_string())
        .chain(QUIET_TARGETS.iter().map(|(target, level)| format!("{target}={level}")))
        .collect::<Vec<_>>()
        .join(",");
    EnvFilter::try_new(&directives).or_raise(|| ErrorKind::Logging)
}

/// Install the global subscriber. Must be called once, before serving.
pub fn init(level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(env_filter(level)?)
        .try_init()
        .or_raise(|| ErrorKind::Logging)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_targets_parse() {
        assert!(env_filter("info").is_ok());
        assert!(env_filter("ffsgate=trace").is_ok());
    }
}
