use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::TransportError;

/// Version of the guest-control tools, used to pick a key transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToolsVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ToolsVersion {
    /// First release whose `send-key-event` accepts a JSON event list.
    pub const JSON_KEY_EVENTS: ToolsVersion = ToolsVersion::new(19, 0, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn supports_json_key_events(&self) -> bool {
        *self >= Self::JSON_KEY_EVENTS
    }

    /// Extracts the version from `prlctl --version` output,
    /// e.g. `prlctl version 19.1.0 (54729)`.
    pub fn parse_prlctl_output(output: &str) -> Result<Self, TransportError> {
        static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
        let pattern = PATTERN
            .get_or_init(|| Regex::new(r"prlctl version (\d+\.\d+\.\d+)").ok())
            .as_ref()
            .ok_or_else(|| TransportError::VersionUnparsable(output.to_string()))?;

        pattern
            .captures(output)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(|| TransportError::VersionUnparsable(output.to_string()))
    }
}

impl FromStr for ToolsVersion {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .trim()
            .split('.')
            .map(str::parse::<u32>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| TransportError::VersionUnparsable(s.to_string()))?;
        match parts.as_slice() {
            [major, minor, patch] => Ok(Self::new(*major, *minor, *patch)),
            _ => Err(TransportError::VersionUnparsable(s.to_string())),
        }
    }
}

impl fmt::Display for ToolsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
