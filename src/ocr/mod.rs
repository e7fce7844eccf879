//! OCR backends behind one blocking interface.

pub mod engine;
pub mod preprocess;
pub mod setup;
pub mod vision;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::OcrError;

pub use engine::{OcrLine, OcrWord, TesseractOcr};
pub use vision::VisionOcr;

/// Text recognized in one image at one scale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recognition {
    /// Recognized lines joined by single spaces.
    pub text: String,
    /// Sum of per-observation confidences; higher means more text recognized
    /// with more certainty.
    pub confidence: f32,
}

/// An OCR engine. Calls block until the engine has produced a result.
pub trait OcrBackend {
    fn name(&self) -> &'static str;

    /// Whether `recognize` honors `scale`. Backends that do not are called
    /// once per detection at scale 1.0.
    fn supports_scaling(&self) -> bool;

    fn recognize(&self, image: &Path, scale: f32) -> Result<Recognition, OcrError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OcrLibrary {
    /// Native macOS text recognition.
    Vision,
    Tesseract,
}

impl Default for OcrLibrary {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            OcrLibrary::Vision
        } else {
            OcrLibrary::Tesseract
        }
    }
}

impl fmt::Display for OcrLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcrLibrary::Vision => write!(f, "vision"),
            OcrLibrary::Tesseract => write!(f, "tesseract"),
        }
    }
}

/// Stand-in for hosts without a usable OCR engine. Every call fails.
#[derive(Debug, Clone)]
pub struct UnavailableOcr {
    reason: String,
}

impl UnavailableOcr {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl OcrBackend for UnavailableOcr {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn supports_scaling(&self) -> bool {
        false
    }

    fn recognize(&self, _image: &Path, _scale: f32) -> Result<Recognition, OcrError> {
        Err(OcrError::Unavailable(self.reason.clone()))
    }
}

/// Builds the backend for `library`. Falls back to [`UnavailableOcr`] when the
/// engine cannot be set up on this host, so the failure surfaces on first use.
pub fn select_backend(library: OcrLibrary, tesseract_prescale: bool) -> Box<dyn OcrBackend> {
    let backend: Result<Box<dyn OcrBackend>, OcrError> = match library {
        OcrLibrary::Vision => VisionOcr::new().map(|b| Box::new(b) as Box<dyn OcrBackend>),
        OcrLibrary::Tesseract => {
            TesseractOcr::locate(tesseract_prescale).map(|b| Box::new(b) as Box<dyn OcrBackend>)
        }
    };
    match backend {
        Ok(backend) => backend,
        Err(e) => {
            warn!("OCR library '{}' is not usable: {}", library, e);
            Box::new(UnavailableOcr::new(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_always_fails() {
        let backend = UnavailableOcr::new("no engine");
        assert!(!backend.supports_scaling());
        let err = backend.recognize(Path::new("shot.png"), 1.0).unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(reason) if reason == "no engine"));
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_vision_unavailable_off_macos() {
        let backend = select_backend(OcrLibrary::Vision, false);
        assert_eq!(backend.name(), "unavailable");
    }

    #[test]
    fn test_library_names() {
        let parsed: OcrLibrary = serde_json::from_str("\"tesseract\"").unwrap();
        assert_eq!(parsed, OcrLibrary::Tesseract);
        assert_eq!(OcrLibrary::Vision.to_string(), "vision");
    }
}
