//! Boot automaton - the capture → detect → type loop.
//!
//! One tick captures the guest display, classifies it, and types the matched
//! screen's boot macro. The loop ends on a terminal screen; any failure halts it.
//! Nothing is retried.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::automation::state::{AutomatonState, BootState, CancelFlag};
use crate::capture::{PrlctlCapture, ScreenCapture};
use crate::detector::{DetectorConfig, ScreenDetector};
use crate::error::AutomationError;
use crate::keyboard::{select_transport, InjectionConfig, KeyEncoder, KeyTransport};
use crate::prlctl::Prlctl;
use crate::screen::{CompiledGroup, ScreenDefinition, ScreenRegistry};

/// Granularity of cancellable sleeps.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct BootSettings {
    /// Minimum delay between the starts of two ticks.
    pub poll_interval: Duration,
    /// Delay attached to every key event.
    pub key_delay: Duration,
}

impl Default for BootSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            key_delay: Duration::from_millis(crate::keyboard::DEFAULT_KEY_DELAY_MS),
        }
    }
}

/// Outcome of a boot run that reached a terminal screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootSummary {
    pub ticks: u64,
    /// Screens whose macro ran, in order.
    pub executed: Vec<String>,
}

enum TickOutcome {
    Continue,
    Finished,
}

pub struct BootAutomaton {
    registry: ScreenRegistry,
    detector: ScreenDetector,
    capture: Box<dyn ScreenCapture>,
    transport: Box<dyn KeyTransport>,
    encoder: KeyEncoder,
    poll_interval: Duration,
    cancel: CancelFlag,
    state: AutomatonState,
    boot_state: BootState,
    executed: Vec<String>,
}

impl BootAutomaton {
    pub fn new(
        registry: ScreenRegistry,
        detector: ScreenDetector,
        capture: Box<dyn ScreenCapture>,
        transport: Box<dyn KeyTransport>,
        settings: BootSettings,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            registry,
            detector,
            capture,
            transport,
            encoder: KeyEncoder::new(settings.key_delay.as_millis() as u64),
            poll_interval: settings.poll_interval,
            cancel,
            state: AutomatonState::default(),
            boot_state: BootState::Idle,
            executed: Vec::new(),
        }
    }

    pub fn boot_state(&self) -> BootState {
        self.boot_state
    }

    pub fn automaton_state(&self) -> &AutomatonState {
        &self.state
    }

    pub fn registry(&self) -> &ScreenRegistry {
        &self.registry
    }

    /// Polls the guest until a terminal screen has been handled.
    ///
    /// Returns immediately when the registry is empty.
    pub fn run(&mut self) -> Result<BootSummary, AutomationError> {
        if self.registry.is_empty() {
            info!("No boot screens configured, skipping screen based boot");
            return Ok(self.summary());
        }

        if let Err(e) = self.preflight() {
            self.transition(BootState::Halted);
            error!("Screen based boot not started: {}", e);
            return Err(e);
        }

        info!(
            "Starting screen based boot: {} screen(s), OCR backend {}",
            self.registry.len(),
            self.detector.backend_name()
        );

        loop {
            match self.tick() {
                Ok(TickOutcome::Continue) => {}
                Ok(TickOutcome::Finished) => {
                    self.transition(BootState::Terminal);
                    return Ok(self.summary());
                }
                Err(e) => {
                    self.transition(BootState::Halted);
                    error!("Screen based boot halted: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Checks the scale search and compiles every boot macro before the
    /// first capture.
    fn preflight(&self) -> Result<(), AutomationError> {
        self.detector.scale_search().validate()?;
        for screen in self.registry.iter() {
            screen
                .boot_macro
                .compile(&self.encoder)
                .map_err(|source| AutomationError::Encode {
                    screen: screen.name.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    fn summary(&self) -> BootSummary {
        BootSummary {
            ticks: self.state.ticks,
            executed: self.executed.clone(),
        }
    }

    fn transition(&mut self, next: BootState) {
        if self.boot_state != next {
            debug!("State: {} -> {}", self.boot_state, next);
            self.boot_state = next;
        }
    }

    fn tick(&mut self) -> Result<TickOutcome, AutomationError> {
        self.check_cancelled()?;
        self.sleep(self.state.remaining_wait(self.poll_interval))?;
        self.check_cancelled()?;

        self.state.last_tick_started = Some(Instant::now());
        self.state.ticks += 1;

        self.transition(BootState::Capturing);
        let detection = {
            // Deleted when dropped at the end of this block, even on error.
            let scratch = tempfile::Builder::new()
                .prefix("screenshot")
                .suffix(".png")
                .tempfile()
                .map_err(AutomationError::Scratch)?;
            self.capture.capture(scratch.path())?;
            self.transition(BootState::Classifying);
            self.detector.detect(scratch.path(), &self.registry)?
        };
        self.state.reference_scale_factor = self.detector.reference_scale();

        let screen = match detection
            .screen_name
            .as_deref()
            .and_then(|name| self.registry.get(name))
        {
            Some(screen) => screen.clone(),
            None => {
                return Err(AutomationError::NoScreenMatched {
                    recognized_text: detection.recognized_text,
                });
            }
        };

        if self.state.last_screen_name.as_deref() == Some(screen.name.as_str())
            && !screen.is_empty_screen()
        {
            debug!("Screen '{}' unchanged, nothing to do", screen.name);
            self.transition(BootState::Idle);
            return Ok(TickOutcome::Continue);
        }

        self.retire_previous_screen();
        self.state.last_screen_name = Some(screen.name.clone());
        self.state.last_match_was_nonempty = !screen.is_empty_screen();

        info!("Detected screen '{}'", screen.name);
        self.transition(BootState::Executing);
        self.execute(&screen)?;
        self.executed.push(screen.name.clone());

        if screen.is_terminal {
            info!("Last screen '{}' handled", screen.name);
            return Ok(TickOutcome::Finished);
        }

        self.transition(BootState::Idle);
        Ok(TickOutcome::Continue)
    }

    /// Drops the previous screen from the registry if it was a one-shot
    /// screen with matching strings.
    fn retire_previous_screen(&mut self) {
        if !self.state.last_match_was_nonempty {
            return;
        }
        let Some(previous) = self.state.last_screen_name.as_deref() else {
            return;
        };
        let once = self.registry.get(previous).is_some_and(|s| s.execute_once);
        if once && self.registry.remove_if_exists(previous) {
            info!("Screen '{}' is executed only once, removed", previous);
        }
    }

    fn execute(&self, screen: &ScreenDefinition) -> Result<(), AutomationError> {
        let boot_macro = &screen.boot_macro;
        let groups =
            boot_macro
                .compile(&self.encoder)
                .map_err(|source| AutomationError::Encode {
                    screen: screen.name.clone(),
                    source,
                })?;
        if groups.is_empty() {
            debug!("Screen '{}' has no boot command", screen.name);
            return Ok(());
        }

        self.sleep(boot_macro.boot_wait)?;
        for (i, group) in groups.iter().enumerate() {
            self.check_cancelled()?;
            if i > 0 {
                self.sleep(boot_macro.group_interval)?;
            }
            match group {
                CompiledGroup::Keys(events) => {
                    debug!("Sending {} key event(s)", events.len());
                    self.transport.send(events)?;
                }
                CompiledGroup::Wait(duration) => {
                    debug!("Waiting {:?}", duration);
                    self.sleep(*duration)?;
                }
            }
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), AutomationError> {
        if self.cancel.is_cancelled() {
            info!("Cancellation requested, stopping screen based boot");
            return Err(AutomationError::Cancelled);
        }
        Ok(())
    }

    /// Sleeps for `duration`, waking early with `Cancelled` if cancellation is requested.
    fn sleep(&self, duration: Duration) -> Result<(), AutomationError> {
        let deadline = Instant::now() + duration;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
            self.check_cancelled()?;
        }
    }
}

/// Runs screen based boot against a guest until its last screen is handled.
///
/// Queries the guest-control tools version to choose a key transport, sets up
/// the OCR backend, then drives a [`BootAutomaton`]. Returns `Ok(())` right
/// away when `registry` is empty.
pub fn run(
    registry: ScreenRegistry,
    detector_config: &DetectorConfig,
    injection_config: &InjectionConfig,
    cancel: CancelFlag,
) -> Result<(), AutomationError> {
    if registry.is_empty() {
        info!("No boot screens configured, skipping screen based boot");
        return Ok(());
    }

    let prlctl = Prlctl::new(&injection_config.prlctl_path);
    let version = prlctl.version()?;
    let transport = select_transport(version, injection_config);
    let detector = ScreenDetector::from_config(detector_config);
    let capture = Box::new(PrlctlCapture::new(prlctl, &injection_config.vm_name));
    let settings = BootSettings {
        poll_interval: detector_config.poll_interval,
        key_delay: injection_config.key_delay,
    };

    let summary =
        BootAutomaton::new(registry, detector, capture, transport, settings, cancel).run()?;
    info!(
        "Screen based boot finished after {} tick(s), screens handled: {}",
        summary.ticks,
        summary.executed.join(", ")
    );
    Ok(())
}
