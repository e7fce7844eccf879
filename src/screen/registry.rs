//! Ordered set of boot screens with unique names and at most one fallback.

use tracing::debug;

use super::ScreenDefinition;
use crate::error::ConfigError;

#[derive(Debug, Clone, Default)]
pub struct ScreenRegistry {
    screens: Vec<ScreenDefinition>,
}

impl ScreenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry, keeping the given order for classification.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = ScreenDefinition>,
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for definition in definitions {
            registry.register(definition)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, definition: ScreenDefinition) -> Result<(), ConfigError> {
        if definition.name.is_empty() {
            return Err(ConfigError::EmptyScreenName);
        }
        if self.get(&definition.name).is_some() {
            return Err(ConfigError::DuplicateScreenName(definition.name));
        }
        if definition.is_empty_screen() {
            if let Some(existing) = self.screens.iter().find(|s| s.is_empty_screen()) {
                return Err(ConfigError::MultipleEmptyScreens {
                    existing: existing.name.clone(),
                    added: definition.name,
                });
            }
        }
        self.screens.push(definition);
        Ok(())
    }

    /// Returns the first screen whose matching strings all occur in `text`,
    /// or the fallback screen when none does.
    pub fn classify(&self, text: &str) -> Option<&ScreenDefinition> {
        let lowered = text.to_lowercase();
        self.screens
            .iter()
            .filter(|s| !s.is_empty_screen())
            .find(|s| s.matches(&lowered))
            .or_else(|| self.fallback())
    }

    pub fn fallback(&self) -> Option<&ScreenDefinition> {
        self.screens.iter().find(|s| s.is_empty_screen())
    }

    pub fn get(&self, name: &str) -> Option<&ScreenDefinition> {
        self.screens.iter().find(|s| s.name == name)
    }

    /// Removes `name` if present. Returns whether anything was removed.
    pub fn remove_if_exists(&mut self, name: &str) -> bool {
        let before = self.screens.len();
        self.screens.retain(|s| s.name != name);
        let removed = self.screens.len() != before;
        if removed {
            debug!("Removed screen '{}' from registry", name);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScreenDefinition> {
        self.screens.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen(name: &str, strings: &[&str]) -> ScreenDefinition {
        ScreenDefinition::new(name, strings.iter().copied())
    }

    #[test]
    fn test_classify_named_then_fallback() {
        let registry =
            ScreenRegistry::from_definitions([screen("A", &["login"]), screen("B", &[])]).unwrap();

        assert_eq!(registry.classify("please login now").unwrap().name, "A");
        assert_eq!(registry.classify("booting...").unwrap().name, "B");
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        let registry = ScreenRegistry::from_definitions([screen("A", &["Login"])]).unwrap();
        assert_eq!(registry.classify("PLEASE LOGIN").unwrap().name, "A");
    }

    #[test]
    fn test_classify_first_match_in_order_wins() {
        let registry = ScreenRegistry::from_definitions([
            screen("specific", &["select", "language"]),
            screen("generic", &["select"]),
        ])
        .unwrap();
        assert_eq!(
            registry.classify("select your language").unwrap().name,
            "specific"
        );
        assert_eq!(registry.classify("select a disk").unwrap().name, "generic");
    }

    #[test]
    fn test_fallback_declared_first_does_not_shadow() {
        let registry =
            ScreenRegistry::from_definitions([screen("B", &[]), screen("A", &["login"])]).unwrap();
        assert_eq!(registry.classify("login").unwrap().name, "A");
    }

    #[test]
    fn test_classify_without_fallback_returns_none() {
        let registry = ScreenRegistry::from_definitions([screen("A", &["login"])]).unwrap();
        assert!(registry.classify("booting").is_none());
        assert!(ScreenRegistry::new().classify("anything").is_none());
    }

    #[test]
    fn test_register_duplicate_name() {
        let err = ScreenRegistry::from_definitions([screen("A", &["x"]), screen("A", &["y"])])
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateScreenName(name) if name == "A"));
    }

    #[test]
    fn test_register_two_empty_screens() {
        let err =
            ScreenRegistry::from_definitions([screen("B", &[]), screen("C", &[])]).unwrap_err();
        match err {
            ConfigError::MultipleEmptyScreens { existing, added } => {
                assert_eq!(existing, "B");
                assert_eq!(added, "C");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_register_empty_name() {
        let err = ScreenRegistry::from_definitions([screen("", &["x"])]).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyScreenName));
    }

    #[test]
    fn test_remove_if_exists_is_idempotent() {
        let mut registry =
            ScreenRegistry::from_definitions([screen("A", &["a"]), screen("B", &["b"])]).unwrap();
        assert!(registry.remove_if_exists("A"));
        assert!(!registry.remove_if_exists("A"));
        assert!(!registry.remove_if_exists("missing"));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("A").is_none());
    }
}
