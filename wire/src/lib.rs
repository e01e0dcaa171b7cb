//! Binary wire codec for the SRP game-authentication protocol.
//!
//! Six message types, all little-endian with a 4-byte header prefix.
//! Decoding never panics: every failure mode is a [`DecodeError`] variant,
//! and trailing bytes after a complete message are ignored so datagram
//! padding never causes a spurious rejection.

mod cursor;
mod error;
mod message;

pub use error::{DecodeError, EncodeError};
pub use message::{
    AuthEphemeral, AuthNegotiate, AuthProof, ErrorSession, ErrorUser, Message, ServerEphemeral,
    ServerNegotiate, ServerProof, HEADER_AUTH_EPHEMERAL, HEADER_AUTH_NEGOTIATE,
    HEADER_AUTH_PROOF, HEADER_ERROR_SESSION, HEADER_ERROR_USER, HEADER_SERVER_EPHEMERAL,
    HEADER_SERVER_NEGOTIATE, HEADER_SERVER_PROOF, PROTOCOL_VERSION,
};
