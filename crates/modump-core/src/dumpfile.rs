//! Dump file naming and allocation.
//!
//! Dumps land next to the diagnosed invocation when the working directory is
//! writable, otherwise in the OS temp directory. Files are created in
//! never-overwrite mode; a name collision moves on to the next suffix, any
//! other creation error abandons the directory.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;

use chrono::Utc;

use crate::{DUMP_FILE_EXTENSION, DUMP_FILE_PREFIX, MAX_FILENAME_TRIES};

/// `Prefix-stamp.ext` for the first attempt, `Prefix-stamp-N.ext` after.
fn dump_file_name(stamp: &str, attempt: u32) -> String {
    if attempt == 0 {
        format!("{DUMP_FILE_PREFIX}-{stamp}.{DUMP_FILE_EXTENSION}")
    } else {
        format!("{DUMP_FILE_PREFIX}-{stamp}-{attempt}.{DUMP_FILE_EXTENSION}")
    }
}

/// Current UTC time as `YYYYMMDDThhmmss`, zero-padded.
fn timestamp() -> String {
    Utc::now().format("%Y%m%dT%H%M%S").to_string()
}

/// Creates a dump file in `dir`, suffixing the name on collisions.
fn create_dump_file_in(dir: &Path, stamp: &str) -> Option<File> {
    for attempt in 0..MAX_FILENAME_TRIES {
        let path = dir.join(dump_file_name(stamp, attempt));
        log::info!("trying dump file '{}'", path.display());

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Some(file),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                // taken, try the next suffix
            }
            Err(e) => {
                // probably no write access
                log::error!("failed to create dump file '{}': {e}", path.display());
                return None;
            }
        }
    }

    log::error!(
        "can't create dump file in '{}', ran out of filenames",
        dir.display()
    );
    None
}

/// Collision-free dump file in `primary`, then in `fallback` when `primary`
/// is exhausted or unwritable. Both directories use the identical
/// timestamp-and-suffix scheme.
fn allocate_between(primary: &Path, fallback: &Path, stamp: &str) -> Option<File> {
    if let Some(file) = create_dump_file_in(primary, stamp) {
        return Some(file);
    }

    log::warn!("cannot write dump file in '{}'", primary.display());
    create_dump_file_in(fallback, stamp)
}

/// Timestamped, never-overwriting dump file in the working directory, or in
/// the OS temp directory when the working directory is not usable.
pub fn allocate_dump_file() -> Option<File> {
    allocate_between(Path::new("."), &std::env::temp_dir(), &timestamp())
}
