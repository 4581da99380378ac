//! Sibling-process discovery and minidump capture for Mod Organizer.
//!
//! When a crash or hang must be investigated, the host calls
//! [`capture::coredump`] to snapshot the current process, or
//! [`capture::coredump_other`] to find the other running instance of the
//! same executable and snapshot that one instead.
//!
//! The OS-bound paths are Windows-only and gated with `#[cfg(windows)]`;
//! the retry, naming and scanning logic they share compiles everywhere and
//! is tested on every platform.

pub mod capture;
pub mod dumpfile;
pub mod env;
pub mod error;
pub mod process;
pub mod query;

pub use capture::DumpKind;
#[cfg(windows)]
pub use capture::{coredump, coredump_other};
pub use error::{Error, Result};
pub use process::ProcessRecord;
#[cfg(windows)]
pub use process::{find_sibling_pid, running_processes, ProcessHandle};

/// Executable name assumed for the sibling when self-resolution fails.
pub const DEFAULT_EXECUTABLE_NAME: &str = "ModOrganizer.exe";

/// Prefix of every dump file written by this crate.
pub const DUMP_FILE_PREFIX: &str = "ModOrganizer";

/// Extension of dump files, without the dot.
pub const DUMP_FILE_EXTENSION: &str = "dmp";

/// Initial buffer capacity, in pids, for process enumeration.
pub const INITIAL_PID_CAPACITY: usize = 300;

/// Initial buffer capacity, in UTF-16 units, for filename queries (MAX_PATH).
pub const INITIAL_PATH_CAPACITY: usize = 260;

/// Filename attempts per directory before the allocator gives up on it.
pub const MAX_FILENAME_TRIES: u32 = 100;
