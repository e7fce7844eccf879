//! Locating a Tesseract installation.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::OcrError;

#[cfg(windows)]
const TESSERACT_EXE: &str = "tesseract.exe";
#[cfg(not(windows))]
const TESSERACT_EXE: &str = "tesseract";

const COMMON_INSTALL_DIRS: &[&str] = &[
    "/opt/homebrew/bin",
    "/usr/local/bin",
    "/usr/bin",
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];

const COMMON_TESSDATA_DIRS: &[&str] = &[
    "/opt/homebrew/share/tessdata",
    "/usr/local/share/tessdata",
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];

/// Directories searched for a bundled Tesseract, in order:
/// `<exe_dir>/tesseract/` then the per-user data dir.
pub fn local_tesseract_dirs() -> Vec<PathBuf> {
    let mut dirs_found = vec![crate::paths::get_tesseract_dir()];
    if let Some(data) = dirs::data_local_dir() {
        dirs_found.push(data.join("screenboot").join("tesseract"));
    }
    dirs_found
}

/// Finds the Tesseract executable, checking our local dirs first, then system
pub fn find_tesseract_executable() -> Result<PathBuf, OcrError> {
    for dir in local_tesseract_dirs() {
        let local_exe = dir.join(TESSERACT_EXE);
        if local_exe.exists() {
            return Ok(local_exe);
        }
    }

    // Check PATH
    let on_path = Command::new(TESSERACT_EXE)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success());
    if on_path {
        return Ok(PathBuf::from(TESSERACT_EXE));
    }

    for dir in COMMON_INSTALL_DIRS {
        let p = PathBuf::from(dir).join(TESSERACT_EXE);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(OcrError::Unavailable(
        "tesseract not found on PATH or in common install locations; install Tesseract-OCR"
            .to_string(),
    ))
}

/// Finds a tessdata directory holding `eng.traineddata`.
///
/// `None` lets Tesseract use its compiled-in default.
pub fn find_tessdata_dir() -> Option<PathBuf> {
    let has_eng = |p: &PathBuf| p.join("eng.traineddata").exists();

    let local = local_tesseract_dirs()
        .into_iter()
        .map(|d| d.join("tessdata"))
        .find(has_eng);
    if local.is_some() {
        return local;
    }

    // Check TESSDATA_PREFIX environment variable
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(&prefix);
        if has_eng(&p) {
            return Some(p);
        }
        let p = p.join("tessdata");
        if has_eng(&p) {
            return Some(p);
        }
    }

    let system = COMMON_TESSDATA_DIRS
        .iter()
        .map(PathBuf::from)
        .find(has_eng);
    if system.is_none() {
        debug!("No tessdata directory found, relying on Tesseract defaults");
    }
    system
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_dirs_start_next_to_executable() {
        let dirs_found = local_tesseract_dirs();
        assert_eq!(dirs_found[0], crate::paths::get_tesseract_dir());
    }
}
