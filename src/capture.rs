//! Guest display capture.

use std::path::Path;

use tracing::debug;

use crate::error::CaptureError;
use crate::prlctl::Prlctl;

/// Writes a screenshot of the guest display to a file.
#[cfg_attr(test, mockall::automock)]
pub trait ScreenCapture {
    fn capture(&self, destination: &Path) -> Result<(), CaptureError>;
}

/// Captures through `prlctl capture`.
pub struct PrlctlCapture {
    prlctl: Prlctl,
    vm_name: String,
}

impl PrlctlCapture {
    pub fn new(prlctl: Prlctl, vm_name: impl Into<String>) -> Self {
        Self {
            prlctl,
            vm_name: vm_name.into(),
        }
    }
}

impl ScreenCapture for PrlctlCapture {
    fn capture(&self, destination: &Path) -> Result<(), CaptureError> {
        self.prlctl.capture(&self.vm_name, destination)?;
        let written = std::fs::metadata(destination).is_ok_and(|m| m.len() > 0);
        if !written {
            return Err(CaptureError::Missing(destination.to_path_buf()));
        }
        debug!("Captured {} to {}", self.vm_name, destination.display());
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn fake_prlctl(dir: &Path, body: &str) -> Prlctl {
        let path = dir.join("prlctl");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        Prlctl::new(path)
    }

    #[test]
    fn test_capture_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        // $4 is the --file argument
        let capture = PrlctlCapture::new(fake_prlctl(dir.path(), "echo png > \"$4\""), "guest");
        let dest = dir.path().join("shot.png");
        capture.capture(&dest).unwrap();
        assert!(dest.exists());
    }

    #[test]
    fn test_capture_without_output_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let capture = PrlctlCapture::new(fake_prlctl(dir.path(), "true"), "guest");
        let dest = dir.path().join("shot.png");
        let err = capture.capture(&dest).unwrap_err();
        assert!(matches!(err, CaptureError::Missing(_)));
    }

    #[test]
    fn test_capture_failure_surfaces_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let capture = PrlctlCapture::new(
            fake_prlctl(dir.path(), "echo 'VM is not running' >&2; exit 1"),
            "guest",
        );
        let err = capture.capture(&dir.path().join("shot.png")).unwrap_err();
        assert!(err.to_string().contains("VM is not running"));
    }
}
