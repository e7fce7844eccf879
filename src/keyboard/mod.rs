//! Guest keyboard injection: scancode decoding, keycode mapping and the
//! transports that deliver key events to the guest.

pub mod keymap;
pub mod scancode;
pub mod transport;
pub mod version;

pub use scancode::{KeyAction, KeyEncoder, KeyEvent, Scancode, DEFAULT_KEY_DELAY_MS};
pub use transport::{
    select_transport, InjectionConfig, JsonKeyTransport, KeyTransport, LegacyHelperTransport,
};
pub use version::ToolsVersion;
