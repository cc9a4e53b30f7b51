//! Connection state machine

use crate::{Error, Result};

/// Supervised connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Supervisor not started yet
    Idle,

    /// Opening the transport and running the handshake
    Connecting,

    /// Connected (the only state in which operations may be issued)
    Ready,

    /// Waiting before the next connect attempt
    Reconnecting,

    /// Retry budget exhausted (terminal)
    Failed,

    /// Shut down (terminal)
    Closed,
}

impl ConnectionState {
    /// Check if transition is valid
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Ready)
                | (Connecting, Reconnecting)
                | (Reconnecting, Connecting)
                | (Reconnecting, Failed)
                | (Ready, Reconnecting)
                | (Idle | Connecting | Ready | Reconnecting | Failed, Closed)
        )
    }

    /// Transition to new state
    pub fn transition(&mut self, next: ConnectionState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidState {
                expected: format!("valid transition from {:?}", self),
                actual: format!("{:?}", next),
            });
        }
        *self = next;
        Ok(())
    }

    /// True once no further transitions (other than close) can happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Ready => write!(f, "ready"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Failed => write!(f, "failed"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let mut state = ConnectionState::Idle;
        assert!(state.transition(ConnectionState::Connecting).is_ok());
        assert!(state.transition(ConnectionState::Reconnecting).is_ok());
        assert!(state.transition(ConnectionState::Connecting).is_ok());
        assert!(state.transition(ConnectionState::Ready).is_ok());
        assert!(state.transition(ConnectionState::Reconnecting).is_ok());
        assert!(state.transition(ConnectionState::Failed).is_ok());
    }

    #[test]
    fn test_invalid_transition() {
        let mut state = ConnectionState::Idle;
        assert!(state.transition(ConnectionState::Ready).is_err());
        assert!(state.transition(ConnectionState::Failed).is_err());
        assert_eq!(state, ConnectionState::Idle);
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_failed_never_reconnects() {
        let mut state = ConnectionState::Failed;
        assert!(state.transition(ConnectionState::Connecting).is_err());
        assert!(state.transition(ConnectionState::Reconnecting).is_err());
        assert!(state.transition(ConnectionState::Ready).is_err());
        assert!(state.is_terminal());
    }

    #[test]
    fn test_close_from_any_live_state() {
        for from in [
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::Ready,
            ConnectionState::Reconnecting,
            ConnectionState::Failed,
        ] {
            let mut state = from;
            assert!(state.transition(ConnectionState::Closed).is_ok());
        }
        let mut closed = ConnectionState::Closed;
        assert!(closed.transition(ConnectionState::Closed).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Reconnecting.to_string(), "reconnecting");
    }
}
