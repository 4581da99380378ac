//! Read-only snapshot of the host environment, used for diagnostics logging.
//!
//! Security product and display detection belong to the host application;
//! this module carries their records, collects the loaded-module list, and
//! writes the one-line-per-record summary.

use std::fmt;

/// One module loaded in the inspected process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    pub path: String,
    pub base: u64,
}

impl fmt::Display for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ 0x{:X}", self.path, self.base)
    }
}

/// One installed security/antivirus product, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityProduct {
    pub name: String,
    pub active: bool,
}

impl fmt::Display for SecurityProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.active { "active" } else { "inactive" };
        write!(f, "{} ({state})", self.name)
    }
}

/// One attached display, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayInfo {
    pub width: u32,
    pub height: u32,
    pub primary: bool,
}

impl fmt::Display for DisplayInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)?;
        if self.primary {
            write!(f, " (primary)")?;
        }
        Ok(())
    }
}

/// Immutable environment snapshot consumed for logging only.
#[derive(Debug, Default, Clone)]
pub struct Environment {
    modules: Vec<LoadedModule>,
    security: Vec<SecurityProduct>,
    displays: Vec<DisplayInfo>,
}

impl Environment {
    pub fn new(
        modules: Vec<LoadedModule>,
        security: Vec<SecurityProduct>,
        displays: Vec<DisplayInfo>,
    ) -> Self {
        Self {
            modules,
            security,
            displays,
        }
    }

    /// Snapshot of the current process. Loaded modules are collected here;
    /// security products and displays are the host's to fill in via
    /// [`Environment::new`].
    #[cfg(windows)]
    pub fn current() -> Self {
        Self {
            modules: loaded_modules(),
            security: Vec::new(),
            displays: Vec::new(),
        }
    }

    pub fn loaded_modules(&self) -> &[LoadedModule] {
        &self.modules
    }

    pub fn security_products(&self) -> &[SecurityProduct] {
        &self.security
    }

    pub fn displays(&self) -> &[DisplayInfo] {
        &self.displays
    }

    /// One debug line per record.
    pub fn log_summary(&self) {
        log::debug!("security products:");
        for product in &self.security {
            log::debug!("  . {product}");
        }

        log::debug!("modules loaded in process:");
        for module in &self.modules {
            log::debug!("  . {module}");
        }

        log::debug!("displays:");
        for display in &self.displays {
            log::debug!("  . {display}");
        }
    }
}

/// Modules loaded in the current process, in enumeration order.
#[cfg(windows)]
fn loaded_modules() -> Vec<LoadedModule> {
    use windows::Win32::Foundation::HMODULE;
    use windows::Win32::System::ProcessStatus::{
        EnumProcessModulesEx, GetModuleFileNameExW, LIST_MODULES_ALL,
    };
    use windows::Win32::System::Threading::GetCurrentProcess;

    let process = unsafe { GetCurrentProcess() };

    let mut modules = [HMODULE::default(); 1024];
    let mut needed = 0u32;

    if let Err(e) = unsafe {
        EnumProcessModulesEx(
            process,
            modules.as_mut_ptr(),
            std::mem::size_of_val(&modules) as u32,
            &mut needed,
            LIST_MODULES_ALL,
        )
    } {
        log::warn!("failed to enumerate own modules: {e}");
        return Vec::new();
    }

    let count = (needed as usize / std::mem::size_of::<HMODULE>()).min(modules.len());
    let mut out = Vec::with_capacity(count);

    for &module in &modules[..count] {
        let mut path_buf = [0u16; 512];
        let len = unsafe { GetModuleFileNameExW(Some(process), Some(module), &mut path_buf) };
        if len > 0 {
            out.push(LoadedModule {
                path: String::from_utf16_lossy(&path_buf[..len as usize]),
                base: module.0 as usize as u64,
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_summary_names_path_and_base() {
        let module = LoadedModule {
            path: r"C:\Windows\System32\ntdll.dll".to_string(),
            base: 0x7FF8_0000_0000,
        };

        assert_eq!(
            module.to_string(),
            r"C:\Windows\System32\ntdll.dll @ 0x7FF800000000"
        );
    }

    #[test]
    fn security_product_summary_shows_state() {
        let active = SecurityProduct {
            name: "Windows Defender".to_string(),
            active: true,
        };
        let inactive = SecurityProduct {
            name: "Some AV".to_string(),
            active: false,
        };

        assert_eq!(active.to_string(), "Windows Defender (active)");
        assert_eq!(inactive.to_string(), "Some AV (inactive)");
    }

    #[test]
    fn display_summary_marks_the_primary() {
        let primary = DisplayInfo {
            width: 2560,
            height: 1440,
            primary: true,
        };
        let secondary = DisplayInfo {
            width: 1920,
            height: 1080,
            primary: false,
        };

        assert_eq!(primary.to_string(), "2560x1440 (primary)");
        assert_eq!(secondary.to_string(), "1920x1080");
    }

    #[test]
    fn accessors_preserve_order() {
        let environment = Environment::new(
            vec![
                LoadedModule {
                    path: "a.dll".into(),
                    base: 1,
                },
                LoadedModule {
                    path: "b.dll".into(),
                    base: 2,
                },
            ],
            Vec::new(),
            Vec::new(),
        );

        let paths: Vec<_> = environment
            .loaded_modules()
            .iter()
            .map(|m| m.path.as_str())
            .collect();
        assert_eq!(paths, ["a.dll", "b.dll"]);
    }
}
