//! Tar bundles.
//!
//! A [`Bundle`] packages several local files into one tar archive, wrapped in
//! the configured [`Compression`]. Entries are stored flat (by base name)
//! so that extracting a downloaded bundle never writes outside of the
//! extraction directory.

use crate::Compression;
use crate::error::{ErrorKind, Result};
use crate::ops::Encoder;
use exn::ResultExt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Component, Path, PathBuf};

/// A tar archive under construction.
///
/// Construction and appending are blocking filesystem operations; async
/// callers should drive a bundle from inside
/// [`spawn_blocking`](https://docs.rs/tokio/latest/tokio/task/fn.spawn_blocking.html).
///
/// # Examples
///
/// ```no_run
/// use ffsgate_compress::{Bundle, Compression};
///
/// # fn example() -> ffsgate_compress::error::Result<()> {
/// let mut bundle = Bundle::create("/tmp/uploads/holiday.tar.gz", Compression::Gzip)?;
/// bundle.append_file("/tmp/uploads/abc/beach.jpg", "beach.jpg")?;
/// bundle.append_file("/tmp/uploads/abc/sunset.jpg", "sunset.jpg")?;
/// let path = bundle.finish()?;
/// # Ok(())
/// # }
/// ```
pub struct Bundle {
    path: PathBuf,
    builder: tar::Builder<Encoder<BufWriter<File>>>,
    entries: usize,
}
impl Bundle {
    /// Create (or truncate) the archive file at `path`.
    pub fn create(path: impl AsRef<Path>, compression: Compression) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).or_raise(|| ErrorKind::Io)?;
        let mut builder = tar::Builder::new(compression.encoder(BufWriter::new(file)));
        // Archive the file contents, never the link.
        builder.follow_symlinks(true);
        Ok(Self { path, builder, entries: 0 })
    }

    /// Add the file at `source` to the archive under the entry name `name`.
    pub fn append_file(&mut self, source: impl AsRef<Path>, name: &str) -> Result<()> {
        validate_entry(name)?;
        self.builder.append_path_with_name(source.as_ref(), name).or_raise(|| ErrorKind::Io)?;
        self.entries += 1;
        Ok(())
    }

    /// Number of entries appended so far.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Write the tar footer and compression trailer, returning the archive path.
    pub fn finish(self) -> Result<PathBuf> {
        let encoder = self.builder.into_inner().or_raise(|| ErrorKind::Io)?;
        encoder.finish()?;
        tracing::debug!(path = %self.path.display(), entries = self.entries, "Bundle written");
        Ok(self.path)
    }
}

/// Entry names are a single, normal path component.
fn validate_entry(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => exn::bail!(ErrorKind::InvalidEntry(name.to_string())),
    }
}

/// List the entry names of an existing bundle, in archive order.
pub fn list_entries(path: impl AsRef<Path>, compression: Compression) -> Result<Vec<String>> {
    let file = File::open(path.as_ref()).or_raise(|| ErrorKind::Io)?;
    let mut archive = tar::Archive::new(compression.wrap_reader(BufReader::new(file)));
    let mut names = Vec::new();
    for entry in archive.entries().or_raise(|| ErrorKind::InvalidData)? {
        let entry = entry.or_raise(|| ErrorKind::InvalidData)?;
        let name = entry.path().or_raise(|| ErrorKind::InvalidData)?.to_string_lossy().into_owned();
        names.push(name);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Read;

    #[rstest]
    #[case(Compression::None)]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    fn test_bundle_contains_all_files(#[case] compression: Compression) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"first").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"second").unwrap();
        let target = dir.path().join(format!("bundle.tar{}", compression.extension()));

        let mut bundle = Bundle::create(&target, compression).unwrap();
        bundle.append_file(dir.path().join("a.txt"), "a.txt").unwrap();
        bundle.append_file(dir.path().join("b.txt"), "b.txt").unwrap();
        assert_eq!(bundle.len(), 2);
        let written = bundle.finish().unwrap();

        assert_eq!(written, target);
        assert_eq!(list_entries(&written, compression).unwrap(), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_bundle_preserves_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), b"# Notes\nhello").unwrap();
        let target = dir.path().join("bundle.tar.gz");
        let mut bundle = Bundle::create(&target, Compression::Gzip).unwrap();
        bundle.append_file(dir.path().join("notes.md"), "notes.md").unwrap();
        bundle.finish().unwrap();

        let file = File::open(&target).unwrap();
        let mut archive = tar::Archive::new(Compression::Gzip.wrap_reader(file));
        let mut entry = archive.entries().unwrap().next().unwrap().unwrap();
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "# Notes\nhello");
    }

    #[rstest]
    #[case("")]
    #[case("../escape.txt")]
    #[case("nested/file.txt")]
    #[case("/etc/passwd")]
    fn test_rejects_unsafe_entry_names(#[case] name: &str) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"data").unwrap();
        let mut bundle = Bundle::create(dir.path().join("bundle.tar"), Compression::None).unwrap();
        let err = bundle.append_file(dir.path().join("a.txt"), name).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidEntry(_)));
        assert!(bundle.is_empty());
    }

    #[test]
    fn test_missing_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut bundle = Bundle::create(dir.path().join("bundle.tar"), Compression::None).unwrap();
        let err = bundle.append_file(dir.path().join("missing.txt"), "missing.txt").unwrap_err();
        assert_eq!(*err, ErrorKind::Io);
    }
}
