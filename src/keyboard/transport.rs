//! Delivery of key events to the guest.
//!
//! Two strategies exist, chosen from the guest-control tools version:
//! - [`JsonKeyTransport`]: one `prlctl send-key-event <vm> -j` call with the
//!   whole event list on stdin (19.0.0 and newer).
//! - [`LegacyHelperTransport`]: an embedded Python helper that replays the raw
//!   scancode bytes through the virtualization SDK (older releases).

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use super::scancode::{KeyAction, KeyEvent};
use super::version::ToolsVersion;
use crate::command;
use crate::error::TransportError;
use crate::prlctl::Prlctl;

const PRLTYPE_SCRIPT: &str = include_str!("prltype.py");

/// Settings for key injection into one guest.
#[derive(Debug, Clone)]
pub struct InjectionConfig {
    pub vm_name: String,
    pub prlctl_path: PathBuf,
    pub python_path: PathBuf,
    pub key_delay: Duration,
}

/// Capability to deliver a batch of key events to the guest keyboard.
///
/// A call blocks until the guest-control channel has accepted every event.
#[cfg_attr(test, mockall::automock)]
pub trait KeyTransport {
    fn name(&self) -> &'static str;

    fn send(&self, events: &[KeyEvent]) -> Result<(), TransportError>;
}

/// Picks the transport supported by the installed tools.
pub fn select_transport(version: ToolsVersion, config: &InjectionConfig) -> Box<dyn KeyTransport> {
    let transport: Box<dyn KeyTransport> = if version.supports_json_key_events() {
        Box::new(JsonKeyTransport::new(
            Prlctl::new(&config.prlctl_path),
            &config.vm_name,
        ))
    } else {
        Box::new(LegacyHelperTransport::new(
            &config.python_path,
            &config.vm_name,
            config.key_delay,
        ))
    };
    info!(
        "Guest tools version {}, using {} key transport",
        version,
        transport.name()
    );
    transport
}

#[derive(Debug, Serialize)]
struct KeyEventPayload {
    key: u16,
    event: KeyAction,
    delay: u64,
}

/// Serializes events the way `send-key-event -j` expects them.
pub fn json_payload(events: &[KeyEvent]) -> Result<String, TransportError> {
    let payload: Vec<KeyEventPayload> = events
        .iter()
        .map(|e| KeyEventPayload {
            key: e.keycode,
            event: e.action,
            delay: e.delay_ms,
        })
        .collect();

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    payload.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub struct JsonKeyTransport {
    prlctl: Prlctl,
    vm_name: String,
}

impl JsonKeyTransport {
    pub fn new(prlctl: Prlctl, vm_name: impl Into<String>) -> Self {
        Self {
            prlctl,
            vm_name: vm_name.into(),
        }
    }
}

impl KeyTransport for JsonKeyTransport {
    fn name(&self) -> &'static str {
        "json"
    }

    fn send(&self, events: &[KeyEvent]) -> Result<(), TransportError> {
        if events.is_empty() {
            debug!("No key events to send");
            return Ok(());
        }
        let payload = json_payload(events)?;
        debug!("Key event payload: {}", payload);
        self.prlctl.run_with_input(
            ["send-key-event", self.vm_name.as_str(), "-j"],
            payload.as_bytes(),
        )?;
        Ok(())
    }
}

pub struct LegacyHelperTransport {
    python: PathBuf,
    vm_name: String,
    delay: Duration,
}

impl LegacyHelperTransport {
    pub fn new(python: impl Into<PathBuf>, vm_name: impl Into<String>, delay: Duration) -> Self {
        Self {
            python: python.into(),
            vm_name: vm_name.into(),
            delay,
        }
    }

    /// Helper arguments after the script path: the VM name, then raw bytes.
    fn helper_args(&self, events: &[KeyEvent]) -> Vec<String> {
        std::iter::once(self.vm_name.clone())
            .chain(
                events
                    .iter()
                    .flat_map(|e| e.raw_bytes())
                    .map(|b| format!("{:02x}", b)),
            )
            .collect()
    }
}

impl KeyTransport for LegacyHelperTransport {
    fn name(&self) -> &'static str {
        "legacy helper"
    }

    fn send(&self, events: &[KeyEvent]) -> Result<(), TransportError> {
        if events.is_empty() {
            debug!("No key events to send");
            return Ok(());
        }

        let mut script = tempfile::Builder::new()
            .prefix("prltype")
            .suffix(".py")
            .tempfile()?;
        script.write_all(PRLTYPE_SCRIPT.as_bytes())?;
        script.flush()?;

        command::output(
            Command::new(&self.python)
                .arg(script.path())
                .args(self.helper_args(events))
                .env("PRLTYPE_DELAY_MS", self.delay.as_millis().to_string()),
            None,
        )?;
        Ok(())
    }
}
