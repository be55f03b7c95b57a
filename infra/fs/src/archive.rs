use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use tracing::debug;
use walkdir::WalkDir;
use zip::{ZipArchive, ZipWriter, write::SimpleFileOptions};

use crate::{FsError, FsErrorExt, ensure_parent, normalize_path};

/// Supported archive container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip`, deflate compressed.
    Zip,
    /// `.tar`, uncompressed.
    Tar,
    /// `.tar.gz` or `.tgz`, gzip compressed.
    TarGz,
}

impl ArchiveFormat {
    /// Infers the format from the file name, case insensitively.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let name = path.as_ref().file_name()?.to_string_lossy().to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Canonical extension without the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
        }
    }
}

/// Packs the contents of `src_dir` into the archive `dest`, inferring the
/// format from the destination file name.
///
/// # Errors
///
/// Returns [`FsError::InvalidPath`] when `src_dir` is not a directory or
/// the destination extension names no known format.
pub fn pack(src_dir: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<PathBuf, FsError> {
    let dest = dest.as_ref();
    let format = ArchiveFormat::from_path(dest).ok_or_else(|| unknown_format(dest))?;
    pack_as(src_dir, dest, format)
}

/// Packs the contents of `src_dir` into `dest` with an explicit format.
///
/// Entry names are relative to `src_dir`, so unpacking recreates its
/// contents rather than the directory itself. Returns the archive path.
pub fn pack_as(
    src_dir: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    format: ArchiveFormat,
) -> Result<PathBuf, FsError> {
    let (src_dir, dest) = (src_dir.as_ref(), dest.as_ref());
    if !src_dir.is_dir() {
        return Err(FsError::InvalidPath {
            message: format!("not a directory: {}", src_dir.display()).into(),
            context: None,
        });
    }
    ensure_parent(dest)?;
    match format {
        ArchiveFormat::Zip => pack_zip(src_dir, dest),
        ArchiveFormat::Tar => pack_tar(src_dir, dest),
        ArchiveFormat::TarGz => pack_tar_gz(src_dir, dest),
    }?;
    debug!("Packed {} into {}", src_dir.display(), dest.display());
    Ok(dest.to_path_buf())
}

/// Unpacks `archive` into `dest_dir`, inferring the format from the archive
/// file name.
///
/// # Errors
///
/// Returns [`FsError::InvalidPath`] for an unknown extension and
/// [`FsError::Zip`] or [`FsError::Io`] for a corrupt archive.
pub fn unpack(archive: impl AsRef<Path>, dest_dir: impl AsRef<Path>) -> Result<(), FsError> {
    let archive = archive.as_ref();
    let format = ArchiveFormat::from_path(archive).ok_or_else(|| unknown_format(archive))?;
    unpack_as(archive, dest_dir, format)
}

/// Unpacks `archive` into `dest_dir` with an explicit format. The
/// destination directory is created when missing.
pub fn unpack_as(
    archive: impl AsRef<Path>,
    dest_dir: impl AsRef<Path>,
    format: ArchiveFormat,
) -> Result<(), FsError> {
    let (archive, dest_dir) = (archive.as_ref(), dest_dir.as_ref());
    fs::create_dir_all(dest_dir).context(format!("Creating {}", dest_dir.display()))?;
    match format {
        ArchiveFormat::Zip => unpack_zip(archive, dest_dir),
        ArchiveFormat::Tar => unpack_tar(archive, dest_dir),
        ArchiveFormat::TarGz => unpack_tar_gz(archive, dest_dir),
    }?;
    debug!("Unpacked {} into {}", archive.display(), dest_dir.display());
    Ok(())
}

fn pack_zip(src_dir: &Path, dest: &Path) -> Result<(), FsError> {
    let file = File::create(dest).context(format!("Creating {}", dest.display()))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default();
    for entry in WalkDir::new(src_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.context(format!("Walking {}", src_dir.display()))?;
        let name = relative_name(src_dir, entry.path())?;
        if entry.file_type().is_dir() {
            writer
                .add_directory(name, options)
                .context(format!("Adding {} to {}", entry.path().display(), dest.display()))?;
        } else {
            writer
                .start_file(name, options)
                .context(format!("Adding {} to {}", entry.path().display(), dest.display()))?;
            let mut src = File::open(entry.path())
                .context(format!("Opening {}", entry.path().display()))?;
            io::copy(&mut src, &mut writer)
                .context(format!("Compressing {}", entry.path().display()))?;
        }
    }
    let mut inner = writer.finish().context(format!("Finishing {}", dest.display()))?;
    inner.flush().context(format!("Finishing {}", dest.display()))
}

fn pack_tar(src_dir: &Path, dest: &Path) -> Result<(), FsError> {
    let file = File::create(dest).context(format!("Creating {}", dest.display()))?;
    let mut builder = tar::Builder::new(BufWriter::new(file));
    builder
        .append_dir_all(".", src_dir)
        .context(format!("Archiving {}", src_dir.display()))?;
    let mut inner = builder.into_inner().context(format!("Finishing {}", dest.display()))?;
    inner.flush().context(format!("Finishing {}", dest.display()))
}

fn pack_tar_gz(src_dir: &Path, dest: &Path) -> Result<(), FsError> {
    let file = File::create(dest).context(format!("Creating {}", dest.display()))?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all(".", src_dir)
        .context(format!("Archiving {}", src_dir.display()))?;
    let encoder = builder.into_inner().context(format!("Finishing {}", dest.display()))?;
    let mut inner = encoder.finish().context(format!("Finishing {}", dest.display()))?;
    inner.flush().context(format!("Finishing {}", dest.display()))
}

fn unpack_zip(archive: &Path, dest_dir: &Path) -> Result<(), FsError> {
    let file = File::open(archive).context(format!("Opening {}", archive.display()))?;
    let mut zip = ZipArchive::new(BufReader::new(file))
        .context(format!("Reading {}", archive.display()))?;
    zip.extract(dest_dir).context(format!("Extracting {}", archive.display()))
}

fn unpack_tar(archive: &Path, dest_dir: &Path) -> Result<(), FsError> {
    let file = File::open(archive).context(format!("Opening {}", archive.display()))?;
    tar::Archive::new(BufReader::new(file))
        .unpack(dest_dir)
        .context(format!("Extracting {}", archive.display()))
}

fn unpack_tar_gz(archive: &Path, dest_dir: &Path) -> Result<(), FsError> {
    let file = File::open(archive).context(format!("Opening {}", archive.display()))?;
    tar::Archive::new(GzDecoder::new(BufReader::new(file)))
        .unpack(dest_dir)
        .context(format!("Extracting {}", archive.display()))
}

fn relative_name(root: &Path, path: &Path) -> Result<String, FsError> {
    let rel = path.strip_prefix(root).map_err(|_| FsError::from("walk entry escaped its root"))?;
    Ok(normalize_path(rel.to_string_lossy()))
}

fn unknown_format(path: &Path) -> FsError {
    FsError::InvalidPath {
        message: format!("cannot infer the archive format of {}", path.display()).into(),
        context: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_inference_is_extension_driven() {
        assert_eq!(ArchiveFormat::from_path("backup.zip"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::from_path("backup.ZIP"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::from_path("backup.tar"), Some(ArchiveFormat::Tar));
        assert_eq!(ArchiveFormat::from_path("backup.tar.gz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_path("backup.tgz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_path("backup.rar"), None);
        assert_eq!(ArchiveFormat::from_path("backup"), None);
    }

    #[test]
    fn canonical_extensions_round_trip() {
        for format in [ArchiveFormat::Zip, ArchiveFormat::Tar, ArchiveFormat::TarGz] {
            let name = format!("data.{}", format.extension());
            assert_eq!(ArchiveFormat::from_path(name), Some(format));
        }
    }
}
