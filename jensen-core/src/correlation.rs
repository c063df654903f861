//! Matching inbound frames to the outstanding request

use tracing::debug;

use crate::{command::Command, packet::Packet};

/// What the receive loop is waiting for
///
/// A frame is accepted if its sequence id equals the request's, or, for
/// streaming commands, if its command id matches regardless of sequence id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectation {
    /// Sequence id of the outstanding request
    pub sequence_id: u32,

    /// Command whose frames are accepted on command id alone
    pub streaming: Option<Command>,
}

impl Expectation {
    /// Expect the reply to one request
    pub fn reply(sequence_id: u32) -> Self {
        Self {
            sequence_id,
            streaming: None,
        }
    }

    /// Expect any frame of a streaming command
    ///
    /// Commands answered with a single frame fall back to [`reply`](Self::reply).
    pub fn stream(sequence_id: u32, command: Command) -> Self {
        Self {
            sequence_id,
            streaming: command.is_streaming().then_some(command),
        }
    }

    /// Check whether `packet` answers this expectation
    pub fn matches(&self, packet: &Packet) -> bool {
        if packet.sequence_id == self.sequence_id {
            return true;
        }

        match self.streaming {
            Some(command) if packet.command_id == u16::from(command) => true,
            _ => {
                debug!(
                    "Ignoring unmatched {} (expected seq={}, stream={:?})",
                    packet, self.sequence_id, self.streaming
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_matches_sequence_only() {
        let expect = Expectation::reply(10);

        assert!(expect.matches(&Packet::new(Command::GetCardInfo, 10)));
        assert!(!expect.matches(&Packet::new(Command::GetCardInfo, 9)));
    }

    #[test]
    fn test_stream_matches_command_id() {
        let expect = Expectation::stream(10, Command::TransferFile);

        assert!(expect.matches(&Packet::new(Command::TransferFile, 10)));
        assert!(expect.matches(&Packet::new(Command::TransferFile, 11)));
        assert!(!expect.matches(&Packet::new(Command::GetFileList, 11)));
    }

    #[test]
    fn test_stream_of_single_frame_command_is_reply() {
        let expect = Expectation::stream(10, Command::GetCardInfo);

        assert_eq!(expect, Expectation::reply(10));
        assert!(!expect.matches(&Packet::new(Command::GetCardInfo, 11)));
    }
}
