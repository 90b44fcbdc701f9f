//! Core Minitel driver components.
//!
//! This module contains the serial link engine and everything built on it:
//!
//! - **transport**: serial port wrapper (7E1, speed changes)
//! - **link**: threaded send/receive engine and command/response transactions
//! - **sequence**: canonical byte sequences and their character sets
//! - **protocol**: mode, speed, identification and keyboard negotiation
//! - **display**: cursor, color and screen editing primitives
//!
//! # Architecture
//!
//! ```text
//! Minitel
//! ├── Transport (serial port, shared by three handles)
//! ├── reader pump ──► inbound channel ──► receive / receive_sequence / call
//! ├── writer pump ◄── outbound channel ◄── send
//! └── state (mode, speed, capabilities)
//! ```

pub mod capability;
pub mod charset;
pub mod constants;
pub mod display;
pub mod link;
pub mod protocol;
pub mod sequence;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;
