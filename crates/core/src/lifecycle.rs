//! Worker lifecycle state machine.
//!
//! `parsed -> installing -> installed -> activating -> activated`, with
//! `redundant` reachable from installing (failed install), installed
//! (superseded while waiting) and activated (replaced by a newer version).

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Parsed, Installing)
                | (Installing, Installed)
                | (Installing, Redundant)
                | (Installed, Activating)
                | (Installed, Redundant)
                | (Activating, Activated)
                | (Activated, Redundant)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == WorkerState::Redundant
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// Current state of one worker, advanced only along allowed transitions.
#[derive(Debug)]
pub struct Lifecycle {
    state: std::sync::Mutex<WorkerState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self { state: std::sync::Mutex::new(WorkerState::Parsed) }
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WorkerState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn transition(&self, next: WorkerState) -> Result<WorkerState, Error> {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let from = *state;
        if !from.can_transition_to(next) {
            return Err(Error::InvalidTransition { from, to: next });
        }
        *state = next;
        tracing::debug!(%from, to = %next, "worker state changed");
        Ok(from)
    }
}
