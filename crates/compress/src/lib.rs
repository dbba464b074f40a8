//! Compression formats and bundle packaging.
//!
//! Wraps the compression libraries behind a unified [`Compression`] enum and
//! uses it to build [`Bundle`]s: tar archives that package several uploaded
//! files into a single (optionally compressed) file before it is pushed to
//! Filecoin.
//!
//! Formats are chosen by name in the configuration file (parsed with
//! [`str::parse`]) and always run at their
//! highest level, since every byte of a bundle is paid for in storage deals.

mod archive;
pub mod error;
mod format;
mod ops;

pub use crate::archive::{Bundle, list_entries};
pub use crate::ops::Encoder;

/// A supported compression format.
///
/// Defaults to [`Gzip`](Self::Gzip), matching the `.tar.gz` bundles users
/// expect when they ask for "one compressed package".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed
    None,
    /// Bzip2 compression (.bz2)
    Bzip2,
    /// Gzip compression (.gz)
    #[default]
    Gzip,
}
