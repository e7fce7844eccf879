//! macOS Vision framework text recognition.
//!
//! Vision reports results through a completion callback. The embedded Swift
//! helper waits on that callback and prints one JSON result; on the Rust side
//! each call runs on a worker thread and hands back exactly one result over a
//! one-shot channel, so the caller sees a plain blocking call.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::mpsc;
use std::thread;

use serde::Deserialize;
use tempfile::TempDir;
use tracing::{debug, info};

use super::{OcrBackend, Recognition};
use crate::command;
use crate::error::OcrError;

const HELPER_SOURCE: &str = include_str!("vision_helper.swift");

#[derive(Debug, Deserialize)]
struct HelperOutput {
    text: String,
    confidence: f32,
}

pub struct VisionOcr {
    helper: PathBuf,
    // Keeps the compiled helper on disk for the backend's lifetime.
    _build_dir: TempDir,
}

impl VisionOcr {
    /// Compiles the recognition helper. Fails off macOS or without `swiftc`.
    pub fn new() -> Result<Self, OcrError> {
        if !cfg!(target_os = "macos") {
            return Err(OcrError::Unavailable(
                "the Vision framework is only available on macOS".to_string(),
            ));
        }

        let build_dir = tempfile::Builder::new().prefix("screenboot-vision").tempdir()?;
        let source = build_dir.path().join("vision_helper.swift");
        let helper = build_dir.path().join("vision_helper");
        std::fs::write(&source, HELPER_SOURCE)?;

        info!("Compiling Vision helper");
        command::output(
            Command::new("swiftc")
                .arg("-O")
                .arg(&source)
                .arg("-o")
                .arg(&helper),
            None,
        )?;

        Ok(Self {
            helper,
            _build_dir: build_dir,
        })
    }
}

impl OcrBackend for VisionOcr {
    fn name(&self) -> &'static str {
        "vision"
    }

    fn supports_scaling(&self) -> bool {
        true
    }

    fn recognize(&self, image: &Path, scale: f32) -> Result<Recognition, OcrError> {
        let helper = self.helper.clone();
        let image = image.to_path_buf();
        let stdout = complete_once(move || {
            command::output(
                Command::new(&helper).arg(&image).arg(scale.to_string()),
                None,
            )
            .map_err(OcrError::from)
        })?;
        debug!("Vision helper output at scale {:.2}: {}", scale, stdout);
        parse_helper_output(&stdout)
    }
}

/// Runs `work` on a worker thread and waits for its single result.
pub(crate) fn complete_once<T, F>(work: F) -> Result<T, OcrError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, OcrError> + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    thread::spawn(move || {
        let _ = tx.send(work());
    });
    rx.recv().map_err(|_| OcrError::WorkerLost)?
}

fn parse_helper_output(stdout: &str) -> Result<Recognition, OcrError> {
    let out: HelperOutput = serde_json::from_str(stdout)
        .map_err(|e| OcrError::Recognition(format!("unexpected helper output: {}", e)))?;
    Ok(Recognition {
        text: out.text,
        confidence: out.confidence,
    })
}
