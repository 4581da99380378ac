//! Minidump capture for the current process or a sibling instance.

#[cfg(windows)]
use std::os::windows::io::AsRawHandle;

#[cfg(windows)]
use windows::Win32::Foundation::HANDLE;
#[cfg(windows)]
use windows::Win32::System::Diagnostics::Debug::{
    MiniDumpNormal, MiniDumpWithDataSegs, MiniDumpWithFullMemory, MiniDumpWithHandleData,
    MiniDumpWithProcessThreadData, MiniDumpWithUnloadedModules, MiniDumpWriteDump, MINIDUMP_TYPE,
};
#[cfg(windows)]
use windows::Win32::System::Threading::{GetCurrentProcess, GetProcessId};

#[cfg(windows)]
use crate::dumpfile::allocate_dump_file;
#[cfg(windows)]
use crate::process::{find_sibling_pid, ProcessHandle};
#[cfg(windows)]
use crate::{Error, Result};

/// How much memory content a capture includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpKind {
    /// Baseline streams only.
    Mini,
    /// Baseline plus data segments.
    Data,
    /// Baseline plus full process memory.
    Full,
}

/// Stream selection for the snapshot call: a fixed baseline, widened by the
/// requested kind.
#[cfg(windows)]
fn dump_flags(kind: DumpKind) -> MINIDUMP_TYPE {
    let baseline = MiniDumpNormal.0
        | MiniDumpWithHandleData.0
        | MiniDumpWithUnloadedModules.0
        | MiniDumpWithProcessThreadData.0;

    let bits = match kind {
        DumpKind::Mini => baseline,
        DumpKind::Data => baseline | MiniDumpWithDataSegs.0,
        DumpKind::Full => baseline | MiniDumpWithFullMemory.0,
    };

    MINIDUMP_TYPE(bits)
}

/// Writes a minidump of `process` to a freshly allocated dump file.
///
/// A partially written file is left in place when the snapshot call fails;
/// it may still carry diagnostic value.
#[cfg(windows)]
fn write_dump(process: HANDLE, kind: DumpKind) -> Result<()> {
    let pid = unsafe { GetProcessId(process) };

    let Some(file) = allocate_dump_file() else {
        log::error!("nowhere to write the dump file");
        return Err(Error::NoDumpLocation);
    };

    match kind {
        DumpKind::Mini => log::info!("writing mini minidump for pid {pid}"),
        DumpKind::Data => log::info!("writing minidump with data for pid {pid}"),
        DumpKind::Full => log::info!("writing full minidump for pid {pid}"),
    }

    let result = unsafe {
        MiniDumpWriteDump(
            process,
            pid,
            HANDLE(file.as_raw_handle()),
            dump_flags(kind),
            None,
            None,
            None,
        )
    };

    if let Err(e) = result {
        log::error!("failed to write minidump: {e}");
        return Err(e.into());
    }

    log::info!("minidump written correctly");
    Ok(())
}

/// Captures a minidump of the current process.
#[cfg(windows)]
pub fn coredump(kind: DumpKind) -> Result<()> {
    log::info!("creating minidump for the current process");
    write_dump(unsafe { GetCurrentProcess() }, kind)
}

/// Finds the sibling instance of this executable and captures a minidump of
/// it. Fails without attempting a capture when no sibling is found or it
/// cannot be opened.
#[cfg(windows)]
pub fn coredump_other(kind: DumpKind) -> Result<()> {
    log::info!("creating minidump for another running instance");

    let pid = find_sibling_pid().ok_or(Error::NoSiblingProcess)?;
    log::info!("found other process with pid {pid}");

    let handle = match ProcessHandle::open(pid) {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("failed to open process {pid}: {e}");
            return Err(e);
        }
    };

    write_dump(handle.as_raw(), kind)
}

#[cfg(all(test, windows))]
mod tests {
    use super::*;

    #[test]
    fn flag_set_per_kind() {
        let baseline = MiniDumpNormal.0
            | MiniDumpWithHandleData.0
            | MiniDumpWithUnloadedModules.0
            | MiniDumpWithProcessThreadData.0;

        let cases = [
            (DumpKind::Mini, baseline),
            (DumpKind::Data, baseline | MiniDumpWithDataSegs.0),
            (DumpKind::Full, baseline | MiniDumpWithFullMemory.0),
        ];

        for (kind, expected) in cases {
            assert_eq!(dump_flags(kind).0, expected, "{kind:?}");
        }
    }

    #[test]
    fn data_and_full_extend_the_baseline() {
        let mini = dump_flags(DumpKind::Mini).0;

        assert_eq!(dump_flags(DumpKind::Data).0 & mini, mini);
        assert_eq!(dump_flags(DumpKind::Full).0 & mini, mini);
    }
}
