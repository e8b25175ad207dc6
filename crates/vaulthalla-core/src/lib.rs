//! Core protocol library for Vaulthalla.
//!
//! Contains the wire envelopes exchanged with the backend over the command
//! socket, the statically-typed command catalog, and the domain records that
//! catalog entries carry. This crate knows nothing about transports or
//! connection management; see `vaulthalla-transport` and
//! `vaulthalla-client` for those.

pub mod catalog;
pub mod envelope;
pub mod error;
pub mod model;

pub use catalog::{COMMANDS, Command, is_known_command};
pub use envelope::{CommandEnvelope, InboundFrame, ResponseStatus, is_unauthenticated_command};
pub use error::ProtocolError;
