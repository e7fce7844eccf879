//! Configuration for a screen based boot run.
//!
//! Loaded from config.json (next to the executable unless given explicitly).
//! Provides the guest name, tool paths, OCR settings, timing parameters and the
//! ordered list of boot screens.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::detector::{DetectorConfig, ScaleSearch};
use crate::error::ConfigError;
use crate::keyboard::{InjectionConfig, KeyEncoder, DEFAULT_KEY_DELAY_MS};
use crate::ocr::OcrLibrary;
use crate::screen::{BootMacro, KeyGroup, ScreenDefinition, ScreenRegistry};

/// One step of a screen's boot command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyGroupConfig {
    /// Hexadecimal scancodes, e.g. `{"keys": ["1c", "9c"]}`
    Keys { keys: Vec<String> },
    /// A pause, e.g. `{"wait_ms": 500}`
    Wait { wait_ms: u64 },
}

/// A boot screen as written in config.json.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BootScreenConfig {
    /// Screen name to identify
    pub screen_name: String,
    /// Strings that must all be present on the screen; empty marks the fallback screen
    #[serde(default)]
    pub matching_strings: Vec<String>,
    #[serde(default)]
    pub boot_command: Vec<KeyGroupConfig>,
    /// Delay before typing starts (milliseconds)
    #[serde(default)]
    pub boot_wait_ms: u64,
    /// Delay between key groups (milliseconds)
    #[serde(default)]
    pub group_interval_ms: u64,
    /// Screen based boot stops after this screen
    #[serde(default)]
    pub is_last_screen: bool,
    /// Removed after the automaton moves past it
    #[serde(default)]
    pub execute_only_once: bool,
}

impl BootScreenConfig {
    pub fn to_definition(&self) -> ScreenDefinition {
        let groups = self
            .boot_command
            .iter()
            .map(|group| match group {
                KeyGroupConfig::Keys { keys } => KeyGroup::Keys(keys.clone()),
                KeyGroupConfig::Wait { wait_ms } => KeyGroup::Wait(Duration::from_millis(*wait_ms)),
            })
            .collect();

        ScreenDefinition::new(&self.screen_name, &self.matching_strings)
            .with_macro(BootMacro {
                boot_wait: Duration::from_millis(self.boot_wait_ms),
                group_interval: Duration::from_millis(self.group_interval_ms),
                groups,
            })
            .terminal(self.is_last_screen)
            .once(self.execute_only_once)
    }
}

/// Complete screen based boot configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BootConfig {
    /// Guest to drive
    pub vm_name: String,
    #[serde(default = "default_prlctl_path")]
    pub prlctl_path: PathBuf,
    /// Interpreter for the legacy key helper
    #[serde(default = "default_python_path")]
    pub python_path: PathBuf,
    #[serde(default)]
    pub ocr_library: OcrLibrary,
    /// Minimum delay between two screen captures (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Delay attached to every key event (milliseconds)
    #[serde(default = "default_key_delay_ms")]
    pub key_delay_ms: u64,
    #[serde(default)]
    pub scale_search: ScaleSearch,
    /// Run the scale search with Tesseract too (slow)
    #[serde(default)]
    pub tesseract_prescale: bool,
    #[serde(default)]
    pub boot_screens: Vec<BootScreenConfig>,
}

fn default_prlctl_path() -> PathBuf {
    PathBuf::from("prlctl")
}

fn default_python_path() -> PathBuf {
    PathBuf::from("/usr/bin/python3")
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_key_delay_ms() -> u64 {
    DEFAULT_KEY_DELAY_MS
}

/// Returns `<exe_dir>/config.json`
pub fn default_config_path() -> PathBuf {
    crate::paths::get_exe_dir().join("config.json")
}

impl BootConfig {
    pub fn new(vm_name: impl Into<String>) -> Self {
        Self {
            vm_name: vm_name.into(),
            prlctl_path: default_prlctl_path(),
            python_path: default_python_path(),
            ocr_library: OcrLibrary::default(),
            poll_interval_ms: default_poll_interval_ms(),
            key_delay_ms: default_key_delay_ms(),
            scale_search: ScaleSearch::default(),
            tesseract_prescale: false,
            boot_screens: Vec::new(),
        }
    }

    /// Reads and parses a config file. Does not validate it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading config from: {}", path.display());
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "Config loaded: vm '{}', {} boot screen(s)",
            config.vm_name,
            config.boot_screens.len()
        );
        Ok(config)
    }

    /// Builds the screen registry in configuration order.
    pub fn registry(&self) -> Result<ScreenRegistry, ConfigError> {
        ScreenRegistry::from_definitions(self.boot_screens.iter().map(|s| s.to_definition()))
    }

    /// Checks everything that can be checked before a run and returns the registry.
    ///
    /// Every boot command is compiled so scancode errors surface here rather
    /// than in front of a half-installed guest.
    pub fn validate(&self) -> Result<ScreenRegistry, ConfigError> {
        self.scale_search.validate()?;
        let registry = self.registry()?;
        let encoder = self.encoder();
        for screen in registry.iter() {
            screen
                .boot_macro
                .compile(&encoder)
                .map_err(|source| ConfigError::Macro {
                    screen: screen.name.clone(),
                    source,
                })?;
        }
        Ok(registry)
    }

    pub fn encoder(&self) -> KeyEncoder {
        KeyEncoder::new(self.key_delay_ms)
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            ocr_library: self.ocr_library,
            tesseract_prescale: self.tesseract_prescale,
            scale_search: self.scale_search,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn injection_config(&self) -> InjectionConfig {
        InjectionConfig {
            vm_name: self.vm_name.clone(),
            prlctl_path: self.prlctl_path.clone(),
            python_path: self.python_path.clone(),
            key_delay: Duration::from_millis(self.key_delay_ms),
        }
    }
}
