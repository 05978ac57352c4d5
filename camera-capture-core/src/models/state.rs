use std::fmt;

use serde::Serialize;

use super::device::CaptureDevice;

/// Capture session controller state machine.
///
/// State transitions:
/// ```text
/// idle → configuring → running { delivering: false } → running { delivering: true }
///   ↑         │                       │                          │
///   └─────────┴── rollback ───────────┴────────── stop ──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Configuring,
    /// Input and output are bound and committed. `delivering` turns on
    /// once frames are flowing to the output.
    Running { delivering: bool },
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    pub fn is_delivering(&self) -> bool {
        matches!(self, Self::Running { delivering: true })
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Configuring => write!(f, "configuring"),
            Self::Running { delivering: false } => write!(f, "running (not delivering)"),
            Self::Running { delivering: true } => write!(f, "running"),
        }
    }
}

/// Counters for debugging capture sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionDiagnostics {
    pub configuration_attempts: u64,
    pub configuration_failures: u64,
    pub frames_delivered: u64,
    pub surfaces_detached: u64,
}

/// Read-only projection of the controller, for presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Option<String>,
    pub state: SessionState,
    pub device: Option<CaptureDevice>,
    pub bound_inputs: usize,
    pub bound_outputs: usize,
    /// RFC 3339 UTC timestamp.
    pub delivery_started_at: Option<String>,
    pub last_error: Option<String>,
    pub diagnostics: SessionDiagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_predicates() {
        assert!(SessionState::Idle.is_idle());
        assert!(!SessionState::Configuring.is_running());
        assert!(SessionState::Running { delivering: false }.is_running());
        assert!(!SessionState::Running { delivering: false }.is_delivering());
        assert!(SessionState::Running { delivering: true }.is_delivering());
    }

    #[test]
    fn state_serializes_as_tagged_object() {
        let json = serde_json::to_value(SessionState::Running { delivering: true }).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "running", "delivering": true }));

        let json = serde_json::to_value(SessionState::Idle).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "idle" }));
    }
}
