//! Filesystem helpers.
//!
//! Thin synchronous wrappers over [`std::fs`] with a forgiving surface:
//! writers create missing parent directories, removers tolerate paths that
//! are already gone and directory listing runs on [`walkdir`]. Archive
//! packing and unpacking live in [`ArchiveFormat`], [`pack`] and [`unpack`].
//!
//! ```no_run
//! use shed_fs::FsError;
//!
//! fn main() -> Result<(), FsError> {
//!     shed_fs::write_string("out/report.txt", "ready", false)?;
//!     assert_eq!(shed_fs::read_string("out/report.txt")?, "ready");
//!     Ok(())
//! }
//! ```

mod archive;
mod error;

pub use crate::{
    archive::{ArchiveFormat, pack, pack_as, unpack, unpack_as},
    error::{FsError, FsErrorExt},
};

use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

/// Replaces backslashes with `/` and collapses duplicate separators.
#[must_use]
pub fn normalize_path(path: impl AsRef<str>) -> String {
    let path = path.as_ref();
    let mut out = String::with_capacity(path.len());
    let mut prev_sep = false;
    for ch in path.chars() {
        let sep = ch == '/' || ch == '\\';
        if sep {
            if !prev_sep {
                out.push('/');
            }
        } else {
            out.push(ch);
        }
        prev_sep = sep;
    }
    out
}

/// Joins path fragments with `/` and normalizes the result.
#[must_use]
pub fn join_paths<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = parts.into_iter().map(|part| part.as_ref().to_owned()).collect::<Vec<_>>().join("/");
    normalize_path(joined)
}

/// Final component of `path`, if there is one.
#[must_use]
pub fn file_name(path: impl AsRef<Path>) -> Option<String> {
    path.as_ref().file_name().map(|name| name.to_string_lossy().into_owned())
}

/// Final component of `path` without its extension.
#[must_use]
pub fn file_stem_name(path: impl AsRef<Path>) -> Option<String> {
    path.as_ref().file_stem().map(|stem| stem.to_string_lossy().into_owned())
}

/// Extension of `path` without the leading dot.
#[must_use]
pub fn extension(path: impl AsRef<Path>) -> Option<String> {
    path.as_ref().extension().map(|ext| ext.to_string_lossy().into_owned())
}

/// Parent directory of `path` as a normalized string.
///
/// Returns `None` for bare file names and filesystem roots.
#[must_use]
pub fn parent_name(path: impl AsRef<Path>) -> Option<String> {
    path.as_ref()
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(|parent| normalize_path(parent.to_string_lossy()))
}

/// Whether `path` exists at all.
#[must_use]
pub fn exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

/// Whether `path` exists and is a regular file.
#[must_use]
pub fn is_file(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_file()
}

/// Whether `path` exists and is a directory.
#[must_use]
pub fn is_dir(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_dir()
}

/// Home directory of the current user.
///
/// # Errors
///
/// Returns [`FsError::InvalidPath`] when the platform reports no home.
pub fn home_dir() -> Result<PathBuf, FsError> {
    home::home_dir().ok_or_else(|| FsError::InvalidPath {
        message: "the home directory is not available".into(),
        context: None,
    })
}

/// Joins `workspace` under the user home. Not created.
pub fn workspace_dir(workspace: impl AsRef<Path>) -> Result<PathBuf, FsError> {
    Ok(home_dir()?.join(workspace))
}

/// `Desktop` directory under the user home. Not created.
pub fn desktop_dir() -> Result<PathBuf, FsError> {
    Ok(home_dir()?.join("Desktop"))
}

/// Current working directory of the process.
pub fn current_dir() -> Result<PathBuf, FsError> {
    std::env::current_dir().context("Resolving the current directory")
}

/// Creates `path` and any missing parents. Existing directories are fine.
pub fn create_dir(path: impl AsRef<Path>) -> Result<(), FsError> {
    let path = path.as_ref();
    fs::create_dir_all(path).context(format!("Creating {}", path.display()))
}

/// Creates an empty file at `path`, truncating any previous content.
pub fn create_file(path: impl AsRef<Path>) -> Result<(), FsError> {
    let path = path.as_ref();
    ensure_parent(path)?;
    File::create(path).map(|_| ()).context(format!("Creating {}", path.display()))
}

/// Reads the whole file as UTF-8 text.
///
/// # Errors
///
/// Returns [`FsError::Io`] when the file is missing or not valid UTF-8.
pub fn read_string(path: impl AsRef<Path>) -> Result<String, FsError> {
    let path = path.as_ref();
    fs::read_to_string(path).context(format!("Reading {}", path.display()))
}

/// Reads the whole file as raw bytes.
pub fn read_bytes(path: impl AsRef<Path>) -> Result<Vec<u8>, FsError> {
    let path = path.as_ref();
    fs::read(path).context(format!("Reading {}", path.display()))
}

/// Reads the file into lines, with line terminators stripped.
pub fn read_lines(path: impl AsRef<Path>) -> Result<Vec<String>, FsError> {
    let mut lines = Vec::new();
    for_each_line(path, |line| lines.push(line.to_owned()))?;
    Ok(lines)
}

/// Streams the file line by line without loading it whole.
pub fn for_each_line(path: impl AsRef<Path>, mut f: impl FnMut(&str)) -> Result<(), FsError> {
    let path = path.as_ref();
    let file = File::open(path).context(format!("Opening {}", path.display()))?;
    for line in BufReader::new(file).lines() {
        let line = line.context(format!("Reading {}", path.display()))?;
        f(&line);
    }
    Ok(())
}

/// Writes `text` to `path`, creating missing parent directories.
///
/// With `append` set the text is added to the end of the file, otherwise any
/// previous content is replaced.
pub fn write_string(path: impl AsRef<Path>, text: impl AsRef<str>, append: bool) -> Result<(), FsError> {
    write_bytes(path, text.as_ref().as_bytes(), append)
}

/// Writes `line` followed by a newline. See [`write_string`].
pub fn write_line(path: impl AsRef<Path>, line: impl AsRef<str>, append: bool) -> Result<(), FsError> {
    let mut text = line.as_ref().to_owned();
    text.push('\n');
    write_bytes(path, text.as_bytes(), append)
}

/// Writes every line followed by a newline. See [`write_string`].
pub fn write_lines<I, S>(path: impl AsRef<Path>, lines: I, append: bool) -> Result<(), FsError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut text = String::new();
    for line in lines {
        text.push_str(line.as_ref());
        text.push('\n');
    }
    write_bytes(path, text.as_bytes(), append)
}

/// Writes raw bytes to `path`, creating missing parent directories.
pub fn write_bytes(path: impl AsRef<Path>, bytes: impl AsRef<[u8]>, append: bool) -> Result<(), FsError> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let mut file = open_for_write(path, append)?;
    file.write_all(bytes.as_ref()).context(format!("Writing {}", path.display()))
}

/// Copies a single file, creating the destination parents. Returns the
/// number of bytes copied.
pub fn copy_file(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<u64, FsError> {
    let (src, dest) = (src.as_ref(), dest.as_ref());
    ensure_parent(dest)?;
    fs::copy(src, dest).context(format!("Copying {} to {}", src.display(), dest.display()))
}

/// Copies a directory tree recursively. Existing destination files are
/// overwritten.
///
/// # Errors
///
/// Returns [`FsError::InvalidPath`] when `src` is not a directory.
pub fn copy_dir(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<(), FsError> {
    let (src, dest) = (src.as_ref(), dest.as_ref());
    if !src.is_dir() {
        return Err(FsError::InvalidPath {
            message: format!("not a directory: {}", src.display()).into(),
            context: None,
        });
    }
    fs::create_dir_all(dest).context(format!("Creating {}", dest.display()))?;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.context(format!("Walking {}", src.display()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| FsError::from("walk entry escaped its root"))?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).context(format!("Creating {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target)
                .context(format!("Copying {} to {}", entry.path().display(), target.display()))?;
        }
    }
    Ok(())
}

/// Moves a file, falling back to copy + delete when a plain rename fails
/// (for example across filesystems).
pub fn move_file(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<(), FsError> {
    let (src, dest) = (src.as_ref(), dest.as_ref());
    ensure_parent(dest)?;
    if fs::rename(src, dest).is_err() {
        copy_file(src, dest)?;
        fs::remove_file(src).context(format!("Removing {}", src.display()))?;
    }
    Ok(())
}

/// Moves a directory tree, falling back to copy + delete when a plain
/// rename fails.
pub fn move_dir(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<(), FsError> {
    let (src, dest) = (src.as_ref(), dest.as_ref());
    ensure_parent(dest)?;
    if fs::rename(src, dest).is_err() {
        copy_dir(src, dest)?;
        remove_dir(src)?;
    }
    Ok(())
}

/// Renames `path` within its parent directory and returns the new path.
///
/// # Errors
///
/// Returns [`FsError::InvalidPath`] when `new_name` is empty or carries a
/// path separator.
pub fn rename(path: impl AsRef<Path>, new_name: impl AsRef<str>) -> Result<PathBuf, FsError> {
    let (path, name) = (path.as_ref(), new_name.as_ref());
    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(FsError::InvalidPath {
            message: format!("invalid target name '{name}'").into(),
            context: None,
        });
    }
    let target = path.parent().map_or_else(|| PathBuf::from(name), |parent| parent.join(name));
    fs::rename(path, &target).context(format!("Renaming {} to {name}", path.display()))?;
    Ok(target)
}

/// Removes a file or a whole directory tree. Missing paths are ignored.
pub fn remove(path: impl AsRef<Path>) -> Result<(), FsError> {
    let path = path.as_ref();
    if path.is_dir() { remove_dir(path) } else { remove_file(path) }
}

/// Removes a single file. Missing paths are ignored.
pub fn remove_file(path: impl AsRef<Path>) -> Result<(), FsError> {
    let path = path.as_ref();
    if path.is_file() {
        fs::remove_file(path).context(format!("Removing {}", path.display()))?;
    }
    Ok(())
}

/// Removes a directory tree. Missing paths are ignored.
pub fn remove_dir(path: impl AsRef<Path>) -> Result<(), FsError> {
    let path = path.as_ref();
    if path.is_dir() {
        fs::remove_dir_all(path).context(format!("Removing {}", path.display()))?;
    }
    Ok(())
}

/// Collects the entries under `root` in file name order.
///
/// `recursive` descends into subdirectories and `include_dirs` adds the
/// directories themselves to the listing. The root itself is never listed.
pub fn list_files(
    root: impl AsRef<Path>,
    recursive: bool,
    include_dirs: bool,
) -> Result<Vec<PathBuf>, FsError> {
    let mut files = Vec::new();
    for_each_file(root, recursive, include_dirs, |path| files.push(path.to_path_buf()))?;
    Ok(files)
}

/// Visits the entries under `root` without collecting them.
///
/// Flags match [`list_files`].
pub fn for_each_file(
    root: impl AsRef<Path>,
    recursive: bool,
    include_dirs: bool,
    mut f: impl FnMut(&Path),
) -> Result<(), FsError> {
    let root = root.as_ref();
    let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }
    for entry in walker {
        let entry = entry.context(format!("Walking {}", root.display()))?;
        if entry.file_type().is_dir() && !include_dirs {
            continue;
        }
        f(entry.path());
    }
    Ok(())
}

pub(crate) fn ensure_parent(path: &Path) -> Result<(), FsError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).context(format!("Creating {}", parent.display()))?;
    }
    Ok(())
}

fn open_for_write(path: &Path, append: bool) -> Result<File, FsError> {
    let mut options = OpenOptions::new();
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    options.create(true).open(path).context(format!("Opening {}", path.display()))
}
