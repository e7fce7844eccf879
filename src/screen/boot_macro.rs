use std::time::Duration;

use crate::error::EncodeError;
use crate::keyboard::{KeyEncoder, KeyEvent};

/// One step of a boot macro, as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyGroup {
    /// Hexadecimal scancodes sent to the guest in a single transport call.
    Keys(Vec<String>),
    Wait(Duration),
}

/// One step of a boot macro, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledGroup {
    Keys(Vec<KeyEvent>),
    Wait(Duration),
}

/// Key input script of a screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootMacro {
    /// Pause before the first group is sent.
    pub boot_wait: Duration,
    /// Pause between two consecutive groups.
    pub group_interval: Duration,
    pub groups: Vec<KeyGroup>,
}

impl BootMacro {
    pub fn new(groups: Vec<KeyGroup>) -> Self {
        Self {
            groups,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Encodes every key group. Waits pass through unchanged.
    pub fn compile(&self, encoder: &KeyEncoder) -> Result<Vec<CompiledGroup>, EncodeError> {
        self.groups
            .iter()
            .map(|group| match group {
                KeyGroup::Keys(codes) => encoder.encode(codes).map(CompiledGroup::Keys),
                KeyGroup::Wait(d) => Ok(CompiledGroup::Wait(*d)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::KeyAction;

    #[test]
    fn test_compile_mixed_groups() {
        let boot_macro = BootMacro::new(vec![
            KeyGroup::Keys(vec!["1c".into(), "9c".into()]),
            KeyGroup::Wait(Duration::from_millis(500)),
        ]);
        let compiled = boot_macro.compile(&KeyEncoder::default()).unwrap();

        assert_eq!(compiled.len(), 2);
        match &compiled[0] {
            CompiledGroup::Keys(events) => {
                assert_eq!(events.len(), 2);
                assert_eq!(events[0].action, KeyAction::Press);
                assert_eq!(events[1].action, KeyAction::Release);
            }
            other => panic!("expected keys, got {:?}", other),
        }
        assert_eq!(compiled[1], CompiledGroup::Wait(Duration::from_millis(500)));
    }

    #[test]
    fn test_compile_reports_bad_scancode() {
        let boot_macro = BootMacro::new(vec![KeyGroup::Keys(vec!["zz".into()])]);
        let err = boot_macro.compile(&KeyEncoder::default()).unwrap_err();
        assert_eq!(err, EncodeError::InvalidScancode("zz".into()));
    }

    #[test]
    fn test_empty_macro_compiles_to_nothing() {
        let boot_macro = BootMacro::default();
        assert!(boot_macro.is_empty());
        assert!(boot_macro.compile(&KeyEncoder::default()).unwrap().is_empty());
    }
}
