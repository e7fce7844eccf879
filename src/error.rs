//! Error taxonomy for screen based boot.
//!
//! Every failure is fatal to a boot run: nothing here is retried, the error is
//! propagated to the caller with enough context for an operator to fix the
//! configuration or the guest.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Invalid boot screen configuration. Raised at setup, before any capture.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("duplicate screen name: {0}")]
    DuplicateScreenName(String),
    #[error(
        "screens '{existing}' and '{added}' both have no matching strings; only one fallback screen is allowed"
    )]
    MultipleEmptyScreens { existing: String, added: String },
    #[error("screen name should not be empty")]
    EmptyScreenName,
    #[error("invalid scale search: {0}")]
    InvalidScaleSearch(String),
    #[error("boot command of screen '{screen}' is invalid: {source}")]
    Macro {
        screen: String,
        #[source]
        source: EncodeError,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Scancode macro compilation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("invalid scancode '{0}'")]
    InvalidScancode(String),
    #[error("extended scancode prefix E0 at position {0} has no follow-up byte")]
    TruncatedExtendedSequence(usize),
}

/// Failure of an external program (prlctl, tesseract, python, swiftc).
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR backend unavailable: {0}")]
    Unavailable(String),
    #[error("failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("recognition failed: {0}")]
    Recognition(String),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("OCR worker exited without delivering a result")]
    WorkerLost,
}

/// Keyboard injection failure against the guest control channel.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("failed to serialize key events: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("key transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not find a guest tools version in: {0}")]
    VersionUnparsable(String),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("capture produced no image at {0}")]
    Missing(PathBuf),
}

/// Reason a boot run stopped without reaching a terminal screen.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("no matching screen found for text on screen: {recognized_text}")]
    NoScreenMatched { recognized_text: String },
    #[error("key injection failed: {0}")]
    Transport(#[from] TransportError),
    #[error("boot command of screen '{screen}' is invalid: {source}")]
    Encode {
        screen: String,
        #[source]
        source: EncodeError,
    },
    #[error("screen capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("failed to create scratch screenshot file: {0}")]
    Scratch(#[source] std::io::Error),
    #[error("screen based boot was cancelled")]
    Cancelled,
}
