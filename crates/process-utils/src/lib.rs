//! Small process-related helpers shared across the workspace.
//!
//! Besides the Windows console-window handling for spawned children, this
//! crate knows how to locate an external tool either from a configured
//! location or from `PATH`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Apply the Windows `CREATE_NO_WINDOW` flag to child processes.
///
/// On non-Windows targets this is a no-op.
pub trait NoWindowExt {
    fn no_window(&mut self);
}

impl NoWindowExt for std::process::Command {
    fn no_window(&mut self) {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.creation_flags(CREATE_NO_WINDOW);
        }
    }
}

/// Create a `std::process::Command` with `CREATE_NO_WINDOW` applied on Windows.
pub fn std_command(program: impl AsRef<OsStr>) -> std::process::Command {
    let mut cmd = std::process::Command::new(program);
    cmd.no_window();
    cmd
}

#[cfg(feature = "tokio")]
impl NoWindowExt for tokio::process::Command {
    fn no_window(&mut self) {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            self.as_std_mut().creation_flags(CREATE_NO_WINDOW);
        }
    }
}

/// Create a `tokio::process::Command` with `CREATE_NO_WINDOW` applied on Windows.
#[cfg(feature = "tokio")]
pub fn tokio_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    cmd.no_window();
    cmd
}

/// Platform file name of a tool, e.g. `ffmpeg` -> `ffmpeg.exe` on Windows.
pub fn executable_name(tool: &str) -> String {
    if cfg!(windows) {
        format!("{tool}.exe")
    } else {
        tool.to_string()
    }
}

/// Resolve a configured location for `tool`.
///
/// The location may be the executable itself or the directory containing it
/// (the `bin` directory of an ffmpeg build, for instance). Returns `None` when
/// nothing usable exists there.
pub fn resolve_configured(tool: &str, configured: &Path) -> Option<PathBuf> {
    if configured.is_file() {
        return Some(configured.to_path_buf());
    }
    if configured.is_dir() {
        let candidate = configured.join(executable_name(tool));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Look `tool` up on `PATH`.
pub fn find_on_path(tool: &str) -> Option<PathBuf> {
    which::which(tool).ok()
}

/// Run `<program> -version` and return the first line of its output.
///
/// Returns `None` if the program cannot be spawned or exits unsuccessfully.
pub fn probe_version(program: &Path) -> Option<String> {
    let output = std_command(program).arg("-version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
}
