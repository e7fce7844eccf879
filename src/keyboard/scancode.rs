//! PC (set 1) scancode decoding.
//!
//! A boot macro is a flat list of scancode bytes written as hex strings:
//!
//! | Bytes       | Meaning                                  |
//! |-------------|------------------------------------------|
//! | `1c`        | press of key `0x1c` (Enter)              |
//! | `9c`        | release of key `0x1c` (`0x9c - 0x80`)    |
//! | `e0 48`     | press of extended key `0x48` (Up)        |
//! | `e0 c8`     | release of extended key `0x48`           |

use serde::Serialize;

use super::keymap::keycode_for;
use crate::error::EncodeError;

/// Introduces a two-byte extended key.
pub const EXTENDED_PREFIX: u8 = 0xE0;

/// Set on the second byte of a scancode pair to mark a key release.
pub const RELEASE_BIT: u8 = 0x80;

pub const DEFAULT_KEY_DELAY_MS: u64 = 100;

/// A key identity in scancode form, without press/release information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scancode {
    pub extended: bool,
    /// Always below `0x80`.
    pub base: u8,
}

impl Scancode {
    pub const fn plain(base: u8) -> Self {
        Self {
            extended: false,
            base,
        }
    }

    pub const fn extended(base: u8) -> Self {
        Self {
            extended: true,
            base,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAction {
    Press,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub scancode: Scancode,
    /// Guest keyboard keycode.
    pub keycode: u16,
    pub action: KeyAction,
    pub delay_ms: u64,
}

impl KeyEvent {
    /// The raw bytes this event was decoded from.
    pub fn raw_bytes(&self) -> Vec<u8> {
        let byte = match self.action {
            KeyAction::Press => self.scancode.base,
            KeyAction::Release => self.scancode.base | RELEASE_BIT,
        };
        if self.scancode.extended {
            vec![EXTENDED_PREFIX, byte]
        } else {
            vec![byte]
        }
    }
}

/// Turns hex scancode strings into key events.
#[derive(Debug, Clone, Copy)]
pub struct KeyEncoder {
    delay_ms: u64,
}

impl Default for KeyEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_DELAY_MS)
    }
}

impl KeyEncoder {
    pub fn new(delay_ms: u64) -> Self {
        Self { delay_ms }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn encode<S: AsRef<str>>(&self, scancodes: &[S]) -> Result<Vec<KeyEvent>, EncodeError> {
        let bytes = scancodes
            .iter()
            .map(|s| parse_scancode(s.as_ref()))
            .collect::<Result<Vec<u8>, _>>()?;

        let mut events = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            let (extended, byte) = if bytes[i] == EXTENDED_PREFIX {
                let next = bytes
                    .get(i + 1)
                    .copied()
                    .ok_or(EncodeError::TruncatedExtendedSequence(i))?;
                i += 2;
                (true, next)
            } else {
                i += 1;
                (false, bytes[i - 1])
            };

            let (base, action) = if byte < RELEASE_BIT {
                (byte, KeyAction::Press)
            } else {
                (byte - RELEASE_BIT, KeyAction::Release)
            };
            let scancode = Scancode { extended, base };
            events.push(KeyEvent {
                scancode,
                keycode: keycode_for(scancode),
                action,
                delay_ms: self.delay_ms,
            });
        }
        Ok(events)
    }
}

/// Parses one hex byte, with or without a `0x` prefix.
pub fn parse_scancode(s: &str) -> Result<u8, EncodeError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() || digits.len() > 2 {
        return Err(EncodeError::InvalidScancode(s.to_string()));
    }
    u8::from_str_radix(digits, 16).map_err(|_| EncodeError::InvalidScancode(s.to_string()))
}
