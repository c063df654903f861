//! Connection state and sequence numbering
//!
//! A session tracks:
//! - Connection state (`Disconnected → Connecting → InterfaceClaimed → Ready`)
//! - Sequence counter (increments per request, restarts on every connect)

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No device open
    Disconnected,

    /// Device located, interface not yet claimed
    Connecting,

    /// Interface claimed, endpoints not yet resolved
    InterfaceClaimed,

    /// Endpoints resolved, commands may be sent
    Ready,
}

/// Session state cell
///
/// Readable from any thread without taking the bus lock.
/// Cloned handles share the same state (Arc internally).
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Last sequence id handed out (0 right after connect)
    sequence: AtomicU32,

    /// Current connection state
    state: parking_lot::RwLock<ConnectionState>,
}

impl Session {
    /// Create a new disconnected session
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                sequence: AtomicU32::new(0),
                state: parking_lot::RwLock::new(ConnectionState::Disconnected),
            }),
        }
    }

    /// Get current state
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    /// Check if commands may be sent
    pub fn is_ready(&self) -> bool {
        matches!(self.state(), ConnectionState::Ready)
    }

    /// Start a connection attempt
    ///
    /// Restarts sequence numbering so every connection begins at 1.
    pub fn begin_connect(&self) -> Result<()> {
        self.transition(ConnectionState::Disconnected, ConnectionState::Connecting)?;
        self.inner.sequence.store(0, Ordering::Release);
        Ok(())
    }

    /// Record that the interface has been claimed
    pub fn interface_claimed(&self) -> Result<()> {
        self.transition(ConnectionState::Connecting, ConnectionState::InterfaceClaimed)
    }

    /// Record that the endpoints are resolved
    pub fn mark_ready(&self) -> Result<()> {
        self.transition(ConnectionState::InterfaceClaimed, ConnectionState::Ready)
    }

    /// Close session (valid from any state)
    pub fn close(&self) {
        *self.inner.state.write() = ConnectionState::Disconnected;
    }

    /// Get next sequence id
    ///
    /// Starts at 1 after connect and wraps at `u32::MAX`.
    pub fn next_sequence_id(&self) -> u32 {
        self.inner
            .sequence
            .fetch_add(1, Ordering::AcqRel)
            .wrapping_add(1)
    }

    fn transition(&self, from: ConnectionState, to: ConnectionState) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != from {
            return Err(Error::InvalidSessionState(format!(
                "Cannot move to {:?} from state: {:?}",
                to, *state
            )));
        }

        *state = to;
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_session() -> Session {
        let session = Session::new();
        session.begin_connect().unwrap();
        session.interface_claimed().unwrap();
        session.mark_ready().unwrap();
        session
    }

    #[test]
    fn test_session_new() {
        let session = Session::new();
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert!(!session.is_ready());
    }

    #[test]
    fn test_session_lifecycle() {
        let session = Session::new();

        session.begin_connect().unwrap();
        assert_eq!(session.state(), ConnectionState::Connecting);

        session.interface_claimed().unwrap();
        assert_eq!(session.state(), ConnectionState::InterfaceClaimed);

        session.mark_ready().unwrap();
        assert!(session.is_ready());

        session.close();
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_close_from_any_state() {
        let session = Session::new();
        session.begin_connect().unwrap();
        session.close();
        assert_eq!(session.state(), ConnectionState::Disconnected);

        session.close();
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_sequence_id_generation() {
        let session = ready_session();

        assert_eq!(session.next_sequence_id(), 1);
        assert_eq!(session.next_sequence_id(), 2);
        assert_eq!(session.next_sequence_id(), 3);
    }

    #[test]
    fn test_sequence_restarts_on_connect() {
        let session = ready_session();
        session.next_sequence_id();
        session.next_sequence_id();
        session.close();

        session.begin_connect().unwrap();
        assert_eq!(session.next_sequence_id(), 1);
    }

    #[test]
    fn test_sequence_id_wrap() {
        let session = ready_session();
        session.inner.sequence.store(u32::MAX - 1, Ordering::Release);

        assert_eq!(session.next_sequence_id(), u32::MAX);
        assert_eq!(session.next_sequence_id(), 0);
    }

    #[test]
    fn test_invalid_state_transitions() {
        let session = Session::new();

        // Cannot skip straight to ready
        assert!(session.mark_ready().is_err());
        assert!(session.interface_claimed().is_err());

        // Cannot start twice
        session.begin_connect().unwrap();
        assert!(session.begin_connect().is_err());
    }

    #[test]
    fn test_session_clone() {
        let session1 = Session::new();
        let session2 = session1.clone();

        session1.begin_connect().unwrap();
        session1.interface_claimed().unwrap();
        session1.mark_ready().unwrap();

        assert!(session2.is_ready());
    }
}
