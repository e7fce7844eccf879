//! Boot screens: what a screen looks like to OCR and what to type on it.

pub mod boot_macro;
pub mod definition;
pub mod registry;

pub use boot_macro::{BootMacro, CompiledGroup, KeyGroup};
pub use definition::ScreenDefinition;
pub use registry::ScreenRegistry;
