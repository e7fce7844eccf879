//! Scancode to guest keycode translation.
//!
//! The guest keyboard channel takes X11/evdev style keycodes. For plain
//! (single byte) keys the keycode is the scancode offset by 8. Extended keys
//! share their base byte with a plain key, so they need their own table.
//!
//! | Key        | Scancode | Keycode |
//! |------------|----------|---------|
//! | Escape     | `01`     | 9       |
//! | Enter      | `1c`     | 36      |
//! | KP Enter   | `e0 1c`  | 104     |
//! | Up         | `e0 48`  | 111     |

use super::scancode::Scancode;

/// Offset between a plain scancode and its keycode.
pub const KEYCODE_OFFSET: u16 = 8;

pub fn keycode_for(scancode: Scancode) -> u16 {
    if scancode.extended {
        extended_keycode(scancode.base).unwrap_or_else(|| plain_keycode(scancode.base))
    } else {
        plain_keycode(scancode.base)
    }
}

fn plain_keycode(base: u8) -> u16 {
    u16::from(base) + KEYCODE_OFFSET
}

/// Keycode of the extended key `e0 <base>`, if it has a distinct one.
pub fn extended_keycode(base: u8) -> Option<u16> {
    match base {
        0x1C => Some(104), // KP Enter
        0x1D => Some(105), // Right Control
        0x20 => Some(121), // Mute
        0x2E => Some(122), // Volume Down
        0x30 => Some(123), // Volume Up
        0x35 => Some(106), // KP Divide
        0x37 => Some(107), // Print Screen
        0x38 => Some(108), // Right Alt
        0x47 => Some(110), // Home
        0x48 => Some(111), // Up
        0x49 => Some(112), // Page Up
        0x4B => Some(113), // Left
        0x4D => Some(114), // Right
        0x4F => Some(115), // End
        0x50 => Some(116), // Down
        0x51 => Some(117), // Page Down
        0x52 => Some(118), // Insert
        0x53 => Some(119), // Delete
        0x5B => Some(133), // Left Super
        0x5C => Some(134), // Right Super
        0x5D => Some(135), // Menu
        0x5E => Some(124), // Power
        0x5F => Some(150), // Sleep
        0x63 => Some(151), // Wake
        _ => None,
    }
}
