//! Installer Run State Machine
//!
//! Defines the valid phases of one installer run and which install status has
//! to be persisted on each transition.

use crate::InstallStatus;

/// Events that can trigger phase transitions
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// Signature or signer check failed
    TrustRejected,
    /// Signature valid and signer allow-listed
    TrustAccepted,
    /// The installer process could not be started
    LaunchFailed,
    /// The installer process was started
    Launched,
    /// The installer process exited
    Exited { code: Option<i32> },
}

/// Phases of a single installer run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Nothing checked yet
    Idle,
    /// Trust checks passed, pending status recorded
    Validated,
    /// Installer process running
    Running,
    /// Installer process exited
    Completed { success: bool },
    /// Trust checks failed; nothing was touched
    Rejected,
    /// Installer process could not be started
    LaunchFailed,
}

impl RunPhase {
    /// Whether no further events are accepted
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunPhase::Completed { .. } | RunPhase::Rejected | RunPhase::LaunchFailed
        )
    }
}

/// Result of a transition attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionResult {
    /// Transition was valid; `persist` is the status to write, if any
    Success {
        phase: RunPhase,
        persist: Option<InstallStatus>,
    },
    /// Transition was invalid from the current phase
    Invalid { from: RunPhase, event: RunEvent },
}

/// State machine for one installer run
#[derive(Debug)]
pub struct InstallRun {
    phase: RunPhase,
}

impl Default for InstallRun {
    fn default() -> Self {
        Self::new()
    }
}

impl InstallRun {
    /// Create a new run in Idle phase
    pub fn new() -> Self {
        Self {
            phase: RunPhase::Idle,
        }
    }

    /// Get current phase
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Whether the run ended with a zero exit code
    pub fn succeeded(&self) -> bool {
        self.phase == RunPhase::Completed { success: true }
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: RunEvent) -> TransitionResult {
        use RunPhase::*;

        let outcome = match (self.phase, &event) {
            (Idle, RunEvent::TrustRejected) => Some((Rejected, None)),
            // Pending goes to disk before anything is spawned
            (Idle, RunEvent::TrustAccepted) => Some((Validated, Some(InstallStatus::Pending))),
            (Validated, RunEvent::LaunchFailed) => {
                Some((LaunchFailed, Some(InstallStatus::Failed)))
            }
            // Provisional: records the launch, not the outcome
            (Validated, RunEvent::Launched) => Some((Running, Some(InstallStatus::Finished))),
            (Running, RunEvent::Exited { code }) => Some((
                Completed {
                    success: *code == Some(0),
                },
                None,
            )),
            _ => None,
        };

        let Some((next, persist)) = outcome else {
            return TransitionResult::Invalid {
                from: self.phase,
                event,
            };
        };

        self.phase = next;
        TransitionResult::Success {
            phase: next,
            persist,
        }
    }
}
