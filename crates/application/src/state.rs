//! Application service state machine.

use serde::{Deserialize, Serialize};

/// The state of one operation run by the application service.
///
/// State transitions:
/// ```text
/// Idle ──► Started ──┬──► Finished
///                    └──► Failed
/// ```
/// `Finished` and `Failed` may start again for the next operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ServiceState {
    /// No operation has started yet.
    #[default]
    Idle,

    /// A transaction is open and the callback may run.
    Started,

    /// The operation committed (terminal state).
    Finished,

    /// The operation was rolled back (terminal state).
    Failed,
}

impl ServiceState {
    /// Returns true if a new operation can start.
    pub fn can_start(&self) -> bool {
        !matches!(self, ServiceState::Started)
    }

    /// Returns true if the operation can finish or fail.
    pub fn is_running(&self) -> bool {
        matches!(self, ServiceState::Started)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceState::Finished | ServiceState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Idle => "Idle",
            ServiceState::Started => "Started",
            ServiceState::Finished => "Finished",
            ServiceState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_idle() {
        assert_eq!(ServiceState::default(), ServiceState::Idle);
    }

    #[test]
    fn test_can_start() {
        assert!(ServiceState::Idle.can_start());
        assert!(!ServiceState::Started.can_start());
        assert!(ServiceState::Finished.can_start());
        assert!(ServiceState::Failed.can_start());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ServiceState::Idle.is_terminal());
        assert!(!ServiceState::Started.is_terminal());
        assert!(ServiceState::Finished.is_terminal());
        assert!(ServiceState::Failed.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(ServiceState::Idle.to_string(), "Idle");
        assert_eq!(ServiceState::Started.to_string(), "Started");
        assert_eq!(ServiceState::Finished.to_string(), "Finished");
        assert_eq!(ServiceState::Failed.to_string(), "Failed");
    }

    #[test]
    fn test_serialization() {
        let state = ServiceState::Started;
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: ServiceState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }
}
