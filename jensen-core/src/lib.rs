//! # jensen-core
//!
//! Core protocol implementation for the Jensen USB protocol.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame structure and encoding/decoding
//! - Receive buffer with sync-marker resynchronisation
//! - Request/response correlation
//! - Command definitions
//! - Protocol constants

pub mod command;
pub mod constants;
pub mod correlation;
pub mod error;
pub mod packet;
pub mod reassembly;
pub mod session;

pub use command::Command;
pub use correlation::Expectation;
pub use error::{Error, Result};
pub use packet::{Decode, Packet};
pub use reassembly::ReceiveBuffer;
pub use session::{ConnectionState, Session};

/// Frame header size
pub const HEADER_SIZE: usize = 12;

/// Largest body the 24-bit length field can describe
pub const MAX_BODY_SIZE: usize = 0x00FF_FFFF;
