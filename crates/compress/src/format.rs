//! Naming compression formats: configuration strings and file extensions.

use crate::Compression;
use crate::error::{Error, ErrorKind};
use std::fmt;
use std::str::FromStr;

impl Compression {
    /// Every format a bundle can be written in.
    pub const ALL: [Compression; 3] = [Compression::None, Compression::Bzip2, Compression::Gzip];

    /// Suffix appended after `.tar` in a bundle's file name; empty for a
    /// plain tarball.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Bzip2 => ".bz2",
            Compression::Gzip => ".gz",
        }
    }

    /// Canonical configuration value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Bzip2 => "bzip2",
            Compression::Gzip => "gzip",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = Error;

    /// Accepts the canonical name, the extension without its dot, or `tar`
    /// for no compression. Case and surrounding whitespace are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if wanted == "tar" {
            return Ok(Compression::None);
        }
        Compression::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted || (!c.extension().is_empty() && c.extension()[1..] == wanted))
            .ok_or_else(|| Error::from(ErrorKind::UnsupportedFormat(s.to_string())))
    }
}
