//! Thin wrapper over the `prlctl` guest-control command line.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::command;
use crate::error::{CommandError, TransportError};
use crate::keyboard::ToolsVersion;

#[derive(Debug, Clone)]
pub struct Prlctl {
    path: PathBuf,
}

impl Prlctl {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Runs `prlctl <args>` and returns trimmed stdout.
    pub fn run<I, S>(&self, args: I) -> Result<String, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        command::output(Command::new(&self.path).args(args), None)
    }

    /// Runs `prlctl <args>` with `input` piped to stdin.
    pub fn run_with_input<I, S>(&self, args: I, input: &[u8]) -> Result<String, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        command::output(Command::new(&self.path).args(args), Some(input))
    }

    /// Queries the installed guest-control version.
    pub fn version(&self) -> Result<ToolsVersion, TransportError> {
        let out = self.run(["--version"])?;
        ToolsVersion::parse_prlctl_output(&out)
    }

    /// Writes a screenshot of the guest display of `vm_name` to `destination`.
    pub fn capture(&self, vm_name: &str, destination: &Path) -> Result<(), CommandError> {
        self.run([
            OsStr::new("capture"),
            OsStr::new(vm_name),
            OsStr::new("--file"),
            destination.as_os_str(),
        ])
        .map(|_| ())
    }
}

impl Default for Prlctl {
    fn default() -> Self {
        Self::new("prlctl")
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Writes an executable shell script standing in for prlctl.
    fn fake_prlctl(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("prlctl");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_version_parses_fake_output() {
        let dir = tempfile::tempdir().unwrap();
        let prlctl = Prlctl::new(fake_prlctl(dir.path(), "echo 'prlctl version 19.1.0 (54729)'"));
        let version = prlctl.version().unwrap();
        assert_eq!(version, ToolsVersion::new(19, 1, 0));
    }

    #[test]
    fn test_version_unparsable_output() {
        let dir = tempfile::tempdir().unwrap();
        let prlctl = Prlctl::new(fake_prlctl(dir.path(), "echo 'something else'"));
        let err = prlctl.version().unwrap_err();
        assert!(matches!(err, TransportError::VersionUnparsable(_)));
    }

    #[test]
    fn test_capture_passes_vm_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("args.txt");
        let prlctl = Prlctl::new(fake_prlctl(
            dir.path(),
            &format!("echo \"$@\" > {}", log.display()),
        ));
        let dest = dir.path().join("shot.png");
        prlctl.capture("my-vm", &dest).unwrap();
        let args = std::fs::read_to_string(&log).unwrap();
        assert_eq!(
            args.trim(),
            format!("capture my-vm --file {}", dest.display())
        );
    }
}
