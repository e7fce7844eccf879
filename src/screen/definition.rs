use super::BootMacro;

/// A recognizable installer screen.
///
/// A screen matches recognized text when every one of its matching strings is
/// a substring of the lowercased text. A screen with no matching strings is the
/// fallback screen, chosen only when nothing else matches.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenDefinition {
    pub name: String,
    matching_strings: Vec<String>,
    pub boot_macro: BootMacro,
    /// Stops the automaton once this screen's macro has run.
    pub is_terminal: bool,
    /// Removed from the registry after the automaton moves on from it.
    pub execute_once: bool,
}

impl ScreenDefinition {
    pub fn new<I, S>(name: impl Into<String>, matching_strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            matching_strings: matching_strings
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
            boot_macro: BootMacro::default(),
            is_terminal: false,
            execute_once: false,
        }
    }

    pub fn with_macro(mut self, boot_macro: BootMacro) -> Self {
        self.boot_macro = boot_macro;
        self
    }

    pub fn terminal(mut self, is_terminal: bool) -> Self {
        self.is_terminal = is_terminal;
        self
    }

    pub fn once(mut self, execute_once: bool) -> Self {
        self.execute_once = execute_once;
        self
    }

    /// Lowercased matching strings.
    pub fn matching_strings(&self) -> &[String] {
        &self.matching_strings
    }

    pub fn is_empty_screen(&self) -> bool {
        self.matching_strings.is_empty()
    }

    /// `lowered` must already be lowercase.
    pub(crate) fn matches(&self, lowered: &str) -> bool {
        self.matching_strings.iter().all(|s| lowered.contains(s.as_str()))
    }
}
