//! Chrome executable discovery.
//!
//! Resolution order:
//!
//! 1. An explicit override path. If it does not name an executable file
//!    the lookup fails immediately, with no fallback; a misconfigured
//!    path should be loud.
//! 2. Platform-specific well-known installation paths.
//! 3. The OS lookup command (`where chrome.exe` on Windows,
//!    `which google-chrome` elsewhere).

use std::path::{Path, PathBuf};

use crate::error::{Html2PdfError, Result};

/// Well-known Chrome locations on Windows.
fn windows_candidates() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
        PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
    ];
    if let Some(home) = std::env::var_os("USERPROFILE") {
        paths.push(
            PathBuf::from(home).join(r"AppData\Local\Google\Chrome\Application\chrome.exe"),
        );
    }
    paths
}

/// Well-known Chrome locations on macOS.
fn macos_candidates() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    )];
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(
            PathBuf::from(home)
                .join("Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
        );
    }
    paths
}

/// Well-known Chrome/Chromium locations on Linux.
fn linux_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/bin/google-chrome"),
        PathBuf::from("/usr/bin/google-chrome-stable"),
        PathBuf::from("/usr/bin/chromium-browser"),
        PathBuf::from("/usr/bin/chromium"),
    ]
}

/// Candidate list for the current platform.
pub(crate) fn platform_candidates() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        windows_candidates()
    } else if cfg!(target_os = "macos") {
        macos_candidates()
    } else {
        linux_candidates()
    }
}

/// Whether `path` names an existing, executable regular file.
fn is_executable_file(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Ask the OS to locate Chrome by name.
fn find_via_command() -> Option<PathBuf> {
    let (program, argument) = if cfg!(target_os = "windows") {
        ("where", "chrome.exe")
    } else {
        ("which", "google-chrome")
    };

    let output = std::process::Command::new(program)
        .arg(argument)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.lines().next()?.trim();
    if first.is_empty() {
        return None;
    }
    let path = PathBuf::from(first);
    if path.exists() {
        Some(path)
    } else {
        None
    }
}

/// Resolve the Chrome executable.
///
/// See the module docs for the resolution order.
///
/// # Errors
///
/// Returns [`Html2PdfError::ChromeNotFound`] when the override is invalid
/// or every candidate is exhausted.
///
/// # Example
///
/// ```rust,no_run
/// use html2pdf_pool::chrome::find_chrome;
///
/// let path = find_chrome(None)?;
/// println!("using {}", path.display());
/// # Ok::<(), html2pdf_pool::Html2PdfError>(())
/// ```
pub fn find_chrome(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        if is_executable_file(path) {
            return Ok(path.to_path_buf());
        }
        return Err(Html2PdfError::ChromeNotFound(format!(
            "configured Chrome path is not an executable file: {}",
            path.display()
        )));
    }

    for candidate in platform_candidates() {
        if is_executable_file(&candidate) {
            log::debug!("found Chrome at well-known path: {}", candidate.display());
            return Ok(candidate);
        }
    }

    if let Some(path) = find_via_command() {
        log::debug!("found Chrome via OS lookup: {}", path.display());
        return Ok(path);
    }

    Err(Html2PdfError::ChromeNotFound(
        "no Chrome installation found; specify the path explicitly".to_string(),
    ))
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// An override that points nowhere must fail without falling back
    /// to auto-discovery.
    #[test]
    fn test_invalid_override_fails_fast() {
        let result = find_chrome(Some(Path::new("/no/such/chrome-binary")));
        match result {
            Err(Html2PdfError::ChromeNotFound(msg)) => {
                assert!(msg.contains("/no/such/chrome-binary"), "got: {}", msg);
            }
            other => panic!("expected ChromeNotFound, got {:?}", other),
        }
    }

    /// A directory is not an executable file, even if it exists.
    #[test]
    fn test_directory_override_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = find_chrome(Some(dir.path()));
        assert!(matches!(result, Err(Html2PdfError::ChromeNotFound(_))));
    }

    /// The platform candidate list is never empty.
    #[test]
    fn test_platform_candidates_nonempty() {
        assert!(!platform_candidates().is_empty());
    }

    /// On unix, a file without the executable bit is rejected.
    #[cfg(unix)]
    #[test]
    fn test_non_executable_file_rejected() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"#!/bin/sh\n").unwrap();
        // NamedTempFile creates with mode 600, no exec bit.
        let result = find_chrome(Some(file.path()));
        assert!(matches!(result, Err(Html2PdfError::ChromeNotFound(_))));
    }

    /// On unix, an executable file passes the override check.
    #[cfg(unix)]
    #[test]
    fn test_executable_override_accepted() {
        use std::os::unix::fs::PermissionsExt;
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut perms = file.as_file().metadata().unwrap().permissions();
        perms.set_mode(0o755);
        file.as_file().set_permissions(perms).unwrap();

        let resolved = find_chrome(Some(file.path())).unwrap();
        assert_eq!(resolved, file.path());
    }
}
