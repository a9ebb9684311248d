/// Session state definitions for one bounded invocation
///
/// A logical sync pass may span several invocations; each invocation walks
/// this state machine once and ends in a terminal state.
use std::fmt;

/// Represents where an invocation is in the sync protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    // ===== Initial State =====
    /// No sync job is open for this invocation yet
    NotStarted,

    // ===== Active State =====
    /// A sync job is open (fresh or resumed) and pages are being pulled
    Syncing,

    // ===== Terminal States =====
    /// Time budget ran out; a continuation event carries the pass forward
    Continuing,

    /// The source is exhausted, the watermark is advanced and the job stopped
    Complete,

    /// An unrecoverable error ended the invocation
    Failed,
}

impl SessionState {
    /// Returns true if this invocation is finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Continuing | Self::Complete | Self::Failed)
    }

    /// Returns true if a transition from `self` to `next` is allowed
    ///
    /// Failure is reachable from every non-terminal state.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        match (self, next) {
            (Self::NotStarted, Self::Syncing) => true,
            (Self::Syncing, Self::Continuing | Self::Complete) => true,
            (Self::NotStarted | Self::Syncing, Self::Failed) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Syncing => "syncing",
            Self::Continuing => "continuing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// Returns all session states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::NotStarted,
            Self::Syncing,
            Self::Continuing,
            Self::Complete,
            Self::Failed,
        ]
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!SessionState::NotStarted.is_terminal());
        assert!(!SessionState::Syncing.is_terminal());

        assert!(SessionState::Continuing.is_terminal());
        assert!(SessionState::Complete.is_terminal());
        assert!(SessionState::Failed.is_terminal());
    }

    #[test]
    fn test_allowed_transitions() {
        assert!(SessionState::NotStarted.can_transition_to(SessionState::Syncing));
        assert!(SessionState::Syncing.can_transition_to(SessionState::Continuing));
        assert!(SessionState::Syncing.can_transition_to(SessionState::Complete));
        assert!(SessionState::Syncing.can_transition_to(SessionState::Failed));
        assert!(SessionState::NotStarted.can_transition_to(SessionState::Failed));
    }

    #[test]
    fn test_rejected_transitions() {
        // Work must go through Syncing
        assert!(!SessionState::NotStarted.can_transition_to(SessionState::Complete));
        assert!(!SessionState::NotStarted.can_transition_to(SessionState::Continuing));

        // Terminal states never move
        for terminal in SessionState::all_states()
            .into_iter()
            .filter(SessionState::is_terminal)
        {
            for next in SessionState::all_states() {
                assert!(
                    !terminal.can_transition_to(next),
                    "{} -> {} should be rejected",
                    terminal,
                    next
                );
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionState::NotStarted.to_string(), "not_started");
        assert_eq!(SessionState::Continuing.to_string(), "continuing");
    }
}
