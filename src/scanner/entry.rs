//! Path classification.
//!
//! [`classify`] performs a non-following stat and maps the result onto
//! [`FileKind`] in a fixed precedence order: stat failure, read access,
//! regular file, directory, anything else.

use std::fs;
use std::path::Path;

use super::{FileKind, FileRecord};

/// Classify `path` into a [`FileRecord`].
///
/// Never fails: a path that cannot be stat'ed becomes [`FileKind::Invalid`].
/// Symlinks are not followed and classify as [`FileKind::Other`].
///
/// # Example
///
/// ```no_run
/// use bloomdupe::scanner::{classify, FileKind};
/// use std::path::Path;
///
/// let record = classify(Path::new("/etc/hostname"));
/// if let FileKind::Regular { size } = record.kind {
///     println!("{size} bytes");
/// }
/// ```
#[must_use]
pub fn classify(path: &Path) -> FileRecord {
    FileRecord::new(path.to_path_buf(), kind_of(path))
}

fn kind_of(path: &Path) -> FileKind {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) => {
            log::trace!("stat failed for {}: {}", path.display(), e);
            return FileKind::Invalid;
        }
    };

    if !is_readable(path) {
        return FileKind::Inaccessible;
    }

    let file_type = metadata.file_type();
    if file_type.is_file() {
        FileKind::Regular {
            size: metadata.len(),
        }
    } else if file_type.is_dir() {
        FileKind::Directory
    } else {
        FileKind::Other
    }
}

#[cfg(unix)]
fn is_readable(path: &Path) -> bool {
    nix::unistd::access(path, nix::unistd::AccessFlags::R_OK).is_ok()
}

#[cfg(not(unix))]
fn is_readable(path: &Path) -> bool {
    if path.is_dir() {
        fs::read_dir(path).is_ok()
    } else {
        fs::File::open(path).is_ok()
    }
}
