//! Process enumeration and sibling-instance discovery.
//!
//! Everything here is a read-only view of the process table: handles are
//! opened with query/read access only and closed on drop.

#[cfg(windows)]
use std::path::Path;

#[cfg(windows)]
use windows::Win32::Foundation::{CloseHandle, ERROR_ACCESS_DENIED, HANDLE};
#[cfg(windows)]
use windows::Win32::System::LibraryLoader::GetModuleFileNameW;
#[cfg(windows)]
use windows::Win32::System::ProcessStatus::{EnumProcesses, GetModuleBaseNameW};
#[cfg(windows)]
use windows::Win32::System::Threading::{
    GetCurrentProcessId, OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ,
};

#[cfg(windows)]
use crate::query::grow_query;
#[cfg(windows)]
use crate::{
    Error, Result, DEFAULT_EXECUTABLE_NAME, INITIAL_PATH_CAPACITY, INITIAL_PID_CAPACITY,
};

/// One running process as seen during a single discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    /// Base executable filename, e.g. `ModOrganizer.exe`.
    pub filename: String,
    pub pid: u32,
}

/// First enumeration-order record whose filename equals `own_filename` and
/// whose pid differs from `own_pid`.
///
/// Filename comparison is case-insensitive, matching Windows filename rules.
/// When several siblings run, scan order decides which one is picked; the
/// enumeration order carries no particular meaning, but changing the
/// tie-break would change which instance gets diagnosed.
pub fn find_sibling_in(
    processes: &[ProcessRecord],
    own_filename: &str,
    own_pid: u32,
) -> Option<u32> {
    processes
        .iter()
        .find(|p| p.pid != own_pid && p.filename.eq_ignore_ascii_case(own_filename))
        .map(|p| p.pid)
}

// =============================================================================
// Process Handle RAII Wrapper
// =============================================================================

/// Owned process handle with query/read access, closed exactly once on drop.
#[cfg(windows)]
pub struct ProcessHandle(HANDLE);

#[cfg(windows)]
impl ProcessHandle {
    /// Opens `pid` with `PROCESS_QUERY_INFORMATION | PROCESS_VM_READ`.
    pub fn open(pid: u32) -> Result<Self> {
        let handle =
            unsafe { OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, false, pid) }?;
        Ok(Self(handle))
    }

    /// Raw handle for Win32 calls; ownership stays with `self`.
    pub fn as_raw(&self) -> HANDLE {
        self.0
    }
}

#[cfg(windows)]
impl Drop for ProcessHandle {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.0).ok() };
    }
}

// =============================================================================
// Process Directory
// =============================================================================

/// All process ids the OS currently reports, in enumeration order.
///
/// Returns an empty list after logging when enumeration itself fails; a
/// partial result is never returned.
#[cfg(windows)]
pub fn list_process_ids() -> Vec<u32> {
    let result = grow_query(INITIAL_PID_CAPACITY, |buffer: &mut [u32]| {
        let bytes_given = (buffer.len() * std::mem::size_of::<u32>()) as u32;
        let mut bytes_written = 0u32;

        unsafe { EnumProcesses(buffer.as_mut_ptr(), bytes_given, &mut bytes_written) }?;

        Ok(bytes_written as usize / std::mem::size_of::<u32>())
    });

    match result {
        Ok(pids) => pids,
        Err(e) => {
            log::error!("failed to enumerate processes: {e}");
            Vec::new()
        }
    }
}

/// Base executable filename of `process`, or of the current process when
/// `None` is given.
///
/// Returns an empty string after logging the cause on any failure.
#[cfg(windows)]
pub fn process_filename(process: Option<&ProcessHandle>) -> String {
    let result = grow_query(INITIAL_PATH_CAPACITY, |buffer: &mut [u16]| {
        let written = match process {
            Some(handle) => unsafe { GetModuleBaseNameW(handle.as_raw(), None, buffer) },
            None => unsafe { GetModuleFileNameW(None, buffer) },
        };

        if written == 0 {
            return Err(windows::core::Error::from_win32().into());
        }

        // `written` does not include the terminator; a count equal to the
        // capacity means the name was truncated
        Ok(written as usize)
    });

    match result {
        Ok(units) => {
            let full = String::from_utf16_lossy(&units);
            Path::new(&full)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or(full)
        }
        Err(e) => {
            match process {
                Some(handle) => {
                    log::error!("failed to get filename for handle {:?}: {e}", handle.as_raw());
                }
                None => log::error!("failed to get filename for the current process: {e}"),
            }
            String::new()
        }
    }
}

/// Whether a failed process open deserves a log line.
///
/// Access denied happens a lot for system processes, even when elevated,
/// and is skipped silently; every other failure logs exactly once.
#[cfg(windows)]
fn open_failure_is_loggable(error: &Error) -> bool {
    !matches!(error, Error::WindowsError(e) if e.code() == ERROR_ACCESS_DENIED.to_hresult())
}

/// Every process the current user can open, in enumeration order.
///
/// Pid 0 is the idle placeholder and is always skipped. Access-denied opens
/// are skipped without logging; any other open failure logs one line for
/// that pid.
#[cfg(windows)]
pub fn running_processes() -> Vec<ProcessRecord> {
    let mut processes = Vec::new();

    for pid in list_process_ids() {
        if pid == 0 {
            continue;
        }

        let handle = match ProcessHandle::open(pid) {
            Ok(handle) => handle,
            Err(e) => {
                if open_failure_is_loggable(&e) {
                    log::warn!("failed to open process {pid}: {e}");
                }
                continue;
            }
        };

        let filename = process_filename(Some(&handle));
        if !filename.is_empty() {
            processes.push(ProcessRecord { filename, pid });
        }
    }

    processes
}

// =============================================================================
// Sibling Locator
// =============================================================================

/// Pid of another running instance of this executable, if any.
///
/// Falls back to [`DEFAULT_EXECUTABLE_NAME`] when the current process's own
/// filename cannot be resolved.
#[cfg(windows)]
pub fn find_sibling_pid() -> Option<u32> {
    log::info!("looking for the other process...");

    let own_pid = unsafe { GetCurrentProcessId() };
    log::info!("this process id is {own_pid}");

    let mut filename = process_filename(None);
    if filename.is_empty() {
        log::warn!("can't get current process filename, defaulting to {DEFAULT_EXECUTABLE_NAME}");
        filename = DEFAULT_EXECUTABLE_NAME.to_string();
    } else {
        log::info!("this process filename is {filename}");
    }

    let processes = running_processes();
    log::info!("there are {} processes running", processes.len());

    let sibling = find_sibling_in(&processes, &filename, own_pid);
    if sibling.is_none() {
        log::warn!(
            "no process with this filename; the other instance may not be \
             running, or it may be running as administrator"
        );
    }

    sibling
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(filename: &str, pid: u32) -> ProcessRecord {
        ProcessRecord {
            filename: filename.to_string(),
            pid,
        }
    }

    #[test]
    fn no_match_in_empty_list() {
        assert_eq!(find_sibling_in(&[], "ModOrganizer.exe", 100), None);
    }

    #[test]
    fn own_pid_alone_is_not_a_sibling() {
        let processes = vec![
            record("explorer.exe", 4),
            record("ModOrganizer.exe", 100),
            record("svchost.exe", 200),
        ];

        assert_eq!(find_sibling_in(&processes, "ModOrganizer.exe", 100), None);
    }

    #[test]
    fn first_enumeration_match_wins() {
        let processes = vec![
            record("ModOrganizer.exe", 100),
            record("ModOrganizer.exe", 250),
            record("ModOrganizer.exe", 175),
        ];

        // deterministic across repeated scans of the same list
        for _ in 0..100 {
            assert_eq!(
                find_sibling_in(&processes, "ModOrganizer.exe", 100),
                Some(250)
            );
        }
    }

    #[test]
    fn own_pid_is_skipped_even_when_listed_first() {
        let processes = vec![
            record("ModOrganizer.exe", 42),
            record("ModOrganizer.exe", 43),
        ];

        assert_eq!(find_sibling_in(&processes, "ModOrganizer.exe", 42), Some(43));
    }

    #[test]
    fn filename_comparison_ignores_case() {
        let processes = vec![record("MODORGANIZER.EXE", 7)];

        assert_eq!(find_sibling_in(&processes, "ModOrganizer.exe", 1), Some(7));
    }

    #[test]
    fn different_filename_never_matches() {
        let processes = vec![record("ModOrganizer2.exe", 7), record("notepad.exe", 8)];

        assert_eq!(find_sibling_in(&processes, "ModOrganizer.exe", 1), None);
    }

    #[cfg(windows)]
    #[test]
    fn access_denied_open_is_the_only_silent_failure() {
        use windows::Win32::Foundation::{ERROR_ACCESS_DENIED, ERROR_INVALID_PARAMETER};

        let denied =
            Error::WindowsError(ERROR_ACCESS_DENIED.to_hresult().ok().unwrap_err());
        assert!(!open_failure_is_loggable(&denied));

        let invalid =
            Error::WindowsError(ERROR_INVALID_PARAMETER.to_hresult().ok().unwrap_err());
        assert!(open_failure_is_loggable(&invalid));

        let io = Error::IoError(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(open_failure_is_loggable(&io));
    }

    #[cfg(windows)]
    #[test]
    fn running_processes_never_reports_pid_zero() {
        assert!(running_processes().iter().all(|p| p.pid != 0));
    }

    #[cfg(windows)]
    #[test]
    fn current_process_filename_resolves() {
        let filename = process_filename(None);
        assert!(!filename.is_empty());
        assert!(!filename.contains('\\'));
    }
}
