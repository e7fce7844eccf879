//! Blocking execution of external programs.

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::CommandError;

/// Runs `command` to completion and returns its trimmed stdout.
///
/// When `input` is given it is written to the child's stdin, which is then
/// closed. A non-zero exit status becomes [`CommandError::Failed`] carrying
/// the trimmed stderr.
pub(crate) fn output(command: &mut Command, input: Option<&[u8]>) -> Result<String, CommandError> {
    let program = command.get_program().to_string_lossy().into_owned();
    debug!(
        "Executing {}: {:?}",
        program,
        command.get_args().collect::<Vec<_>>()
    );

    let spawn_error = |source| CommandError::Spawn {
        program: program.clone(),
        source,
    };

    let output = match input {
        None => command.stdin(Stdio::null()).output().map_err(spawn_error)?,
        Some(bytes) => {
            let mut child = command
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(spawn_error)?;
            // Stdin is closed when the handle drops at the end of the closure.
            let written = child
                .stdin
                .take()
                .map_or(Ok(()), |mut stdin| stdin.write_all(bytes));
            let output = child.wait_with_output().map_err(spawn_error)?;
            if let Err(e) = written {
                debug!("Writing stdin of {} failed: {}", program, e);
                // A child that exited early reports its own failure below.
                if output.status.success() {
                    return Err(spawn_error(e));
                }
            }
            output
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    debug!("stdout: {}", stdout);
    debug!("stderr: {}", stderr);

    if !output.status.success() {
        return Err(CommandError::Failed {
            program,
            status: output.status,
            stderr,
        });
    }

    Ok(stdout)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_output_trims_stdout() {
        let out = output(Command::new("sh").args(["-c", "echo '  hello  '"]), None).unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn test_output_feeds_stdin() {
        let out = output(&mut Command::new("cat"), Some(b"payload\n")).unwrap();
        assert_eq!(out, "payload");
    }

    #[test]
    fn test_output_reports_failure_with_stderr() {
        let err = output(
            Command::new("sh").args(["-c", "echo boom >&2; exit 3"]),
            None,
        )
        .unwrap_err();
        match err {
            CommandError::Failed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_output_keeps_stderr_when_child_ignores_stdin() {
        let payload = vec![b'x'; 1024 * 1024];
        let err = output(
            Command::new("sh").args(["-c", "echo 'VM guest does not exist' >&2; exit 1"]),
            Some(payload.as_slice()),
        )
        .unwrap_err();
        match err {
            CommandError::Failed { stderr, .. } => assert_eq!(stderr, "VM guest does not exist"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_output_reports_missing_program() {
        let err = output(&mut Command::new("/nonexistent/screenboot-test-binary"), None)
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
