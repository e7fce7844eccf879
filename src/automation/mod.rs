//! Screen based boot automation.

pub mod runner;
pub mod state;

pub use runner::{run, BootAutomaton, BootSettings, BootSummary};
pub use state::{AutomatonState, BootState, CancelFlag};
