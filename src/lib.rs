//! Screen based boot for virtualized guests.
//!
//! Watches the guest display, recognizes the installer screen with OCR and
//! types the boot macro configured for it, until the last screen is reached.

pub mod automation;
pub mod capture;
mod command;
pub mod config;
pub mod detector;
pub mod error;
pub mod keyboard;
pub mod logging;
pub mod ocr;
pub mod paths;
pub mod prlctl;
pub mod screen;

pub use automation::{run, BootAutomaton, BootState, BootSummary, CancelFlag};
pub use config::BootConfig;
pub use detector::{DetectionResult, DetectorConfig, ScreenDetector};
pub use error::AutomationError;
pub use keyboard::InjectionConfig;
pub use screen::{ScreenDefinition, ScreenRegistry};
