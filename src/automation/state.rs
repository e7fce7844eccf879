//! Boot automaton states and per-run bookkeeping.
//!
//! The automaton sequences through: Idle → Capturing → Classifying → Executing → Idle,
//! ending in Terminal (last screen handled) or Halted (error or cancellation).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Boot automaton states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootState {
    /// Waiting for the next poll tick
    Idle,
    /// Taking a screenshot of the guest display
    Capturing,
    /// Running OCR and matching the screen
    Classifying,
    /// Typing the boot macro of the matched screen
    Executing,
    /// A terminal screen was handled
    Terminal,
    /// Stopped on error or cancellation
    Halted,
}

impl fmt::Display for BootState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootState::Idle => write!(f, "Idle"),
            BootState::Capturing => write!(f, "Capturing"),
            BootState::Classifying => write!(f, "Classifying"),
            BootState::Executing => write!(f, "Executing"),
            BootState::Terminal => write!(f, "Terminal"),
            BootState::Halted => write!(f, "Halted"),
        }
    }
}

/// What the automaton remembers between ticks of one boot run.
#[derive(Debug, Clone, Default)]
pub struct AutomatonState {
    /// Screen whose macro ran most recently
    pub last_screen_name: Option<String>,
    /// Whether that screen had matching strings (i.e. was not the fallback)
    pub last_match_was_nonempty: bool,
    /// Mirror of the detector's reference scale, for reporting
    pub reference_scale_factor: Option<f32>,
    /// Start of the previous tick
    pub last_tick_started: Option<Instant>,
    pub ticks: u64,
}

impl AutomatonState {
    pub fn elapsed_since_last_capture(&self) -> Option<Duration> {
        self.last_tick_started.map(|t| t.elapsed())
    }

    /// How long to wait before the next tick may start.
    pub fn remaining_wait(&self, poll_interval: Duration) -> Duration {
        self.elapsed_since_last_capture()
            .map(|elapsed| poll_interval.saturating_sub(elapsed))
            .unwrap_or(Duration::ZERO)
    }
}

/// Cooperative cancellation signal shared with e.g. a Ctrl-C handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(BootState::Idle.to_string(), "Idle");
        assert_eq!(BootState::Halted.to_string(), "Halted");
    }

    #[test]
    fn test_first_tick_does_not_wait() {
        let state = AutomatonState::default();
        assert_eq!(state.remaining_wait(Duration::from_secs(1)), Duration::ZERO);
        assert!(state.elapsed_since_last_capture().is_none());
    }

    #[test]
    fn test_remaining_wait_counts_from_last_tick() {
        let state = AutomatonState {
            last_tick_started: Some(Instant::now()),
            ..AutomatonState::default()
        };
        let wait = state.remaining_wait(Duration::from_secs(60));
        assert!(wait > Duration::from_secs(59));
        assert!(wait <= Duration::from_secs(60));
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_cancelled());
        handle.cancel();
        assert!(flag.is_cancelled());
    }
}
